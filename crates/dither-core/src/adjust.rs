//! Pre-dithering image adjustments.
//!
//! These operate on the RGBA buffer before intensity conversion:
//! brightness/contrast, gamma, levels, hue/saturation/lightness, sharpening
//! and blur. Each step is a pure buffer-to-buffer transform; [`Adjustments`]
//! bundles them in their fixed application order.

use serde::{Deserialize, Serialize};

/// The full set of pre-dithering adjustments.
///
/// Defaults are neutral: applying the default adjustments returns the
/// input unchanged (modulo rounding in no-op fast paths, which are skipped
/// entirely).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adjustments {
    /// Brightness offset, -100..100 (0 = neutral).
    pub brightness: f32,
    /// Contrast, -100..100 (0 = neutral).
    pub contrast: f32,
    /// Gamma exponent, 0.1..5.0 (1.0 = neutral).
    pub gamma: f32,
    /// Hue rotation in degrees, -180..180.
    pub hue: f32,
    /// Saturation, -100..100 (0 = neutral).
    pub saturation: f32,
    /// Lightness, -100..100 (0 = neutral).
    pub lightness: f32,
    /// Sharpening amount, 0..5 (0 = off).
    pub sharpness: f32,
    /// Box blur radius in pixels (0 = off).
    pub blur_radius: f32,
    /// Optional levels remap, applied after gamma.
    pub levels: Option<Levels>,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 0.0,
            gamma: 1.0,
            hue: 0.0,
            saturation: 0.0,
            lightness: 0.0,
            sharpness: 0.0,
            blur_radius: 0.0,
            levels: None,
        }
    }
}

/// Input/output level remapping with a midpoint gamma.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    pub black_point: u8,
    pub mid_point: u8,
    pub white_point: u8,
    pub output_black: u8,
    pub output_white: u8,
}

impl Default for Levels {
    fn default() -> Self {
        Self {
            black_point: 0,
            mid_point: 128,
            white_point: 255,
            output_black: 0,
            output_white: 255,
        }
    }
}

impl Adjustments {
    /// True when every adjustment is at its neutral value.
    pub fn is_neutral(&self) -> bool {
        self == &Adjustments::default()
    }

    /// Apply all adjustments in order, returning a new RGBA buffer.
    ///
    /// Order: brightness/contrast, gamma, levels, HSL, sharpen, blur.
    pub fn apply(&self, rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
        let mut buf = rgba.to_vec();
        if self.brightness != 0.0 || self.contrast != 0.0 {
            brightness_contrast(&mut buf, self.brightness, self.contrast);
        }
        if self.gamma != 1.0 && self.gamma > 0.0 {
            gamma(&mut buf, self.gamma);
        }
        if let Some(levels) = self.levels {
            apply_levels(&mut buf, levels);
        }
        if self.hue != 0.0 || self.saturation != 0.0 || self.lightness != 0.0 {
            hsl(&mut buf, self.hue, self.saturation, self.lightness);
        }
        if self.sharpness > 0.0 {
            buf = sharpen(&buf, width, height, self.sharpness);
        }
        if self.blur_radius >= 1.0 {
            buf = box_blur(&buf, width, height, self.blur_radius as usize);
        }
        buf
    }
}

fn clamp_byte(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Brightness (additive) and contrast (midpoint scaling) in one pass.
fn brightness_contrast(rgba: &mut [u8], brightness: f32, contrast: f32) {
    let c = contrast.clamp(-100.0, 100.0) * 2.55;
    let factor = (259.0 * (c + 255.0)) / (255.0 * (259.0 - c));
    let offset = brightness.clamp(-100.0, 100.0) * 2.55;

    for px in rgba.chunks_exact_mut(4) {
        for channel in &mut px[..3] {
            let v = factor * (f32::from(*channel) - 128.0) + 128.0 + offset;
            *channel = clamp_byte(v);
        }
    }
}

/// Gamma correction through a 256-entry lookup table.
fn gamma(rgba: &mut [u8], gamma: f32) {
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        *entry = clamp_byte((i as f32 / 255.0).powf(1.0 / gamma) * 255.0);
    }
    for px in rgba.chunks_exact_mut(4) {
        for channel in &mut px[..3] {
            *channel = lut[usize::from(*channel)];
        }
    }
}

/// Input/output levels remap with a midpoint power curve.
fn apply_levels(rgba: &mut [u8], levels: Levels) {
    let black = f32::from(levels.black_point.min(254));
    let white = f32::from(levels.white_point).max(black + 1.0);
    let mid = f32::from(levels.mid_point).clamp(black + 1.0, white - 1.0);
    let out_black = f32::from(levels.output_black);
    let out_white = f32::from(levels.output_white);

    let mid_exponent = 0.5f32.ln() / ((mid - black) / (white - black)).ln();

    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        let v = i as f32;
        let mapped = if v <= black {
            out_black
        } else if v >= white {
            out_white
        } else {
            let normalized = (v - black) / (white - black);
            out_black + normalized.powf(mid_exponent) * (out_white - out_black)
        };
        *entry = clamp_byte(mapped);
    }
    for px in rgba.chunks_exact_mut(4) {
        for channel in &mut px[..3] {
            *channel = lut[usize::from(*channel)];
        }
    }
}

/// Hue/saturation/lightness adjustment via an HSL round trip.
fn hsl(rgba: &mut [u8], hue: f32, saturation: f32, lightness: f32) {
    let sat_factor = 1.0 + saturation.clamp(-100.0, 100.0) / 100.0;
    let light_factor = lightness.clamp(-100.0, 100.0) / 100.0;

    for px in rgba.chunks_exact_mut(4) {
        let (h, s, l) = rgb_to_hsl(px[0], px[1], px[2]);

        let new_h = (h + hue / 360.0).rem_euclid(1.0);
        let new_s = (s * sat_factor).clamp(0.0, 1.0);
        let new_l = if light_factor > 0.0 {
            l + (1.0 - l) * light_factor
        } else {
            l + l * light_factor
        }
        .clamp(0.0, 1.0);

        let (r, g, b) = hsl_to_rgb(new_h, new_s, new_l);
        px[0] = r;
        px[1] = g;
        px[2] = b;
    }
}

fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = f32::from(r) / 255.0;
    let g = f32::from(g) / 255.0;
    let b = f32::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return (0.0, 0.0, l);
    }
    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    } / 6.0;
    (h, s, l)
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (u8, u8, u8) {
    if s == 0.0 {
        let v = clamp_byte(l * 255.0);
        return (v, v, v);
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let hue = |t: f32| {
        let t = t.rem_euclid(1.0);
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };
    (
        clamp_byte(hue(h + 1.0 / 3.0) * 255.0),
        clamp_byte(hue(h) * 255.0),
        clamp_byte(hue(h - 1.0 / 3.0) * 255.0),
    )
}

/// Unsharp-style 3x3 sharpening kernel.
fn sharpen(rgba: &[u8], width: usize, height: usize, amount: f32) -> Vec<u8> {
    let mut out = rgba.to_vec();
    let center = 1.0 + 8.0 * amount;

    for y in 0..height {
        for x in 0..width {
            for c in 0..3 {
                let mut acc = 0.0f32;
                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        let nx = (x as i64 + dx).clamp(0, width as i64 - 1) as usize;
                        let ny = (y as i64 + dy).clamp(0, height as i64 - 1) as usize;
                        let v = f32::from(rgba[(ny * width + nx) * 4 + c]);
                        let w = if dx == 0 && dy == 0 { center } else { -amount };
                        acc += v * w;
                    }
                }
                out[(y * width + x) * 4 + c] = clamp_byte(acc);
            }
        }
    }
    out
}

/// Separable box blur.
fn box_blur(rgba: &[u8], width: usize, height: usize, radius: usize) -> Vec<u8> {
    if radius == 0 || width == 0 || height == 0 {
        return rgba.to_vec();
    }
    let r = radius as i64;
    let mut horizontal = rgba.to_vec();

    for y in 0..height {
        for x in 0..width {
            for c in 0..3 {
                let mut sum = 0.0f32;
                let mut count = 0.0f32;
                for dx in -r..=r {
                    let nx = x as i64 + dx;
                    if nx < 0 || nx >= width as i64 {
                        continue;
                    }
                    sum += f32::from(rgba[(y * width + nx as usize) * 4 + c]);
                    count += 1.0;
                }
                horizontal[(y * width + x) * 4 + c] = clamp_byte(sum / count);
            }
        }
    }

    let mut out = horizontal.clone();
    for y in 0..height {
        for x in 0..width {
            for c in 0..3 {
                let mut sum = 0.0f32;
                let mut count = 0.0f32;
                for dy in -r..=r {
                    let ny = y as i64 + dy;
                    if ny < 0 || ny >= height as i64 {
                        continue;
                    }
                    sum += f32::from(horizontal[(ny as usize * width + x) * 4 + c]);
                    count += 1.0;
                }
                out[(y * width + x) * 4 + c] = clamp_byte(sum / count);
            }
        }
    }
    out
}
