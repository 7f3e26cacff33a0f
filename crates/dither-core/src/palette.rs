//! Custom palette support: hex parsing, luminance ordering and palette
//! index mapping with optional error diffusion.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dither::DiffusionKernel;

/// An sRGB palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl PaletteColor {
    pub const BLACK: PaletteColor = PaletteColor { r: 0, g: 0, b: 0 };
    pub const WHITE: PaletteColor = PaletteColor {
        r: 255,
        g: 255,
        b: 255,
    };

    /// Rec.601 luminance of the color.
    pub fn luminance(&self) -> f32 {
        0.299 * f32::from(self.r) + 0.587 * f32::from(self.g) + 0.114 * f32::from(self.b)
    }

    /// Parse a `#RGB` or `#RRGGBB` hex string (leading `#` optional).
    pub fn from_hex(hex: &str) -> Result<Self, ParseColorError> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let expand = |c: u8| (c << 4) | c;
        match hex.len() {
            3 => {
                let digits: Vec<u8> = hex
                    .chars()
                    .map(|c| c.to_digit(16).map(|d| d as u8))
                    .collect::<Option<_>>()
                    .ok_or_else(|| ParseColorError(hex.to_string()))?;
                Ok(PaletteColor {
                    r: expand(digits[0]),
                    g: expand(digits[1]),
                    b: expand(digits[2]),
                })
            }
            6 => {
                let parse = |s: &str| u8::from_str_radix(s, 16);
                Ok(PaletteColor {
                    r: parse(&hex[0..2]).map_err(|_| ParseColorError(hex.to_string()))?,
                    g: parse(&hex[2..4]).map_err(|_| ParseColorError(hex.to_string()))?,
                    b: parse(&hex[4..6]).map_err(|_| ParseColorError(hex.to_string()))?,
                })
            }
            _ => Err(ParseColorError(hex.to_string())),
        }
    }
}

/// Error parsing a hex color string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError(pub String);

impl fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid hex color: {:?}", self.0)
    }
}

impl std::error::Error for ParseColorError {}

/// Map a grayscale buffer onto a custom palette.
///
/// Colors are sorted by luminance, then each pixel's normalized intensity
/// selects a palette index (`floor(v / 255 * len)`, clamped). When a
/// diffusion kernel is given, the luminance error between the pixel and the
/// selected color is distributed to forward neighbors, so banding between
/// palette steps breaks into dither structure.
///
/// Fewer than two colors falls back to black and white.
pub fn palette_dither(
    gray: &[u8],
    width: usize,
    height: usize,
    colors: &[PaletteColor],
    kernel: Option<&DiffusionKernel>,
) -> Vec<u8> {
    let mut palette: Vec<PaletteColor> = if colors.len() >= 2 {
        colors.to_vec()
    } else {
        vec![PaletteColor::BLACK, PaletteColor::WHITE]
    };
    palette.sort_by(|a, b| a.luminance().total_cmp(&b.luminance()));
    let len = palette.len();

    let mut buffer: Vec<f32> = gray.iter().map(|&v| f32::from(v)).collect();
    let mut out = vec![0u8; width * height * 4];

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let value = buffer[idx];

            let slot = ((value / 255.0 * len as f32).floor() as i64).clamp(0, len as i64 - 1);
            let color = palette[slot as usize];

            let base = idx * 4;
            out[base] = color.r;
            out[base + 1] = color.g;
            out[base + 2] = color.b;
            out[base + 3] = 255;

            if let Some(kernel) = kernel {
                let error = value - color.luminance();
                let divisor = f32::from(kernel.divisor);
                for &(dx, dy, weight) in kernel.entries {
                    let nx = x as i64 + i64::from(dx);
                    let ny = y as i64 + i64::from(dy);
                    if nx < 0 || nx >= width as i64 || ny >= height as i64 {
                        continue;
                    }
                    buffer[ny as usize * width + nx as usize] +=
                        error * f32::from(weight) / divisor;
                }
            }
        }
    }
    out
}
