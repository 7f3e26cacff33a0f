//! The full pure processing pipeline: adjustments, color-mode routing and
//! algorithm dispatch.

use serde::{Deserialize, Serialize};

use crate::adjust::Adjustments;
use crate::dither::{dither, Algorithm, ATKINSON, FLOYD_STEINBERG};
use crate::intensity::{extract_channel, merge_rgba_channels, rgba_to_gray};
use crate::output::DitheredImage;
use crate::palette::{palette_dither, PaletteColor};

/// How the quantized output is colored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ColorMode {
    /// Single luma channel; binary or N-tone grayscale output.
    Grayscale,
    /// Each RGB channel dithered independently and recombined. Halftone
    /// screens rotate 0/+30/+60 degrees per channel.
    Rgb,
    /// Simulated CMYK separation: per-channel processing with rotated
    /// screens, identical routing to [`ColorMode::Rgb`].
    Cmyk,
    /// Grayscale intensities mapped onto a custom luminance-ordered
    /// palette.
    Custom { colors: Vec<PaletteColor> },
}

impl ColorMode {
    /// True for the single-channel mode the compiled-module tier accepts.
    pub fn is_monochrome(&self) -> bool {
        matches!(self, ColorMode::Grayscale)
    }
}

/// Everything needed to render one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub algorithm: Algorithm,
    pub color_mode: ColorMode,
    #[serde(default)]
    pub adjustments: Adjustments,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::ordered(),
            color_mode: ColorMode::Grayscale,
            adjustments: Adjustments::default(),
        }
    }
}

impl RenderOptions {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            ..Default::default()
        }
    }
}

/// Dither an (already adjusted) RGBA buffer under a color mode.
///
/// This is the per-chunk workhorse of the reference backend: it has no
/// internal state, so calling it on disjoint row ranges and concatenating
/// the results equals one full-frame call for all non-sequential
/// algorithms.
pub fn dither_rgba(
    rgba: &[u8],
    width: usize,
    height: usize,
    algorithm: &Algorithm,
    color_mode: &ColorMode,
) -> Vec<u8> {
    match color_mode {
        ColorMode::Grayscale => {
            let gray = rgba_to_gray(rgba);
            dither(&gray, width, height, algorithm)
        }
        ColorMode::Rgb | ColorMode::Cmyk => {
            let channels: Vec<Vec<u8>> = (0..3)
                .map(|c| {
                    let channel = extract_channel(rgba, c);
                    let alg = channel_algorithm(algorithm, c);
                    dither(&channel, width, height, &alg)
                })
                .collect();
            merge_rgba_channels(&channels[0], &channels[1], &channels[2])
        }
        ColorMode::Custom { colors } => {
            let gray = rgba_to_gray(rgba);
            let kernel = match algorithm {
                Algorithm::FloydSteinberg { .. } => Some(&FLOYD_STEINBERG),
                Algorithm::Atkinson { .. } => Some(&ATKINSON),
                _ => None,
            };
            palette_dither(&gray, width, height, colors, kernel)
        }
    }
}

/// Per-channel variant of an algorithm: halftone screens rotate by 30
/// degrees per channel so the separations do not moire against each other.
fn channel_algorithm(algorithm: &Algorithm, channel: usize) -> Algorithm {
    match *algorithm {
        Algorithm::Halftone {
            dot_size,
            spacing,
            angle,
        } => Algorithm::Halftone {
            dot_size,
            spacing,
            angle: angle + 30.0 * channel as f32,
        },
        ref other => other.clone(),
    }
}

/// The complete single-shot pipeline: adjustments, then color-mode routed
/// dithering.
pub fn process_image(
    rgba: &[u8],
    width: usize,
    height: usize,
    options: &RenderOptions,
) -> DitheredImage {
    let adjusted;
    let source = if options.adjustments.is_neutral() {
        rgba
    } else {
        adjusted = options.adjustments.apply(rgba, width, height);
        &adjusted
    };
    let pixels = dither_rgba(source, width, height, &options.algorithm, &options.color_mode);
    DitheredImage::new(pixels, width, height)
}
