//! Multi-tone dithering: binary thresholding generalized to N output levels.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::intensity::gray_to_rgba;
use crate::matrix::{bayer_matrix, blue_noise_field, ThresholdMatrix};

use super::kernel::FLOYD_STEINBERG;

/// Level-selection strategy for multi-tone output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiToneVariant {
    /// Bayer-biased level selection.
    Ordered,
    /// Closest-level search with Floyd-Steinberg error propagation.
    ErrorDiffusion,
    /// Blue-noise-biased level selection.
    BlueNoise,
}

fn shared_noise() -> &'static ThresholdMatrix {
    static FIELD: OnceLock<ThresholdMatrix> = OnceLock::new();
    FIELD.get_or_init(|| blue_noise_field(64))
}

/// The output alphabet: `levels + 1` evenly spaced tones from 0 to 255.
fn tone_values(levels: usize) -> Vec<u8> {
    (0..=levels)
        .map(|i| ((i as f32 / levels as f32) * 255.0).round() as u8)
        .collect()
}

/// Midpoint thresholds separating the tones.
fn tone_thresholds(levels: usize) -> Vec<f32> {
    let intervals = (levels + 1) as f32;
    (1..=levels)
        .map(|i| ((i as f32 / intervals) * 255.0).round())
        .collect()
}

/// Index of the tone selected by an adjusted intensity value.
fn select_tone(adjusted: f32, thresholds: &[f32]) -> usize {
    let mut idx = 0;
    for (i, &t) in thresholds.iter().enumerate() {
        if adjusted >= t {
            idx = i + 1;
        } else {
            break;
        }
    }
    idx
}

/// Multi-tone dithering with `levels + 1` output tones.
///
/// `levels` is the number of intervals between tones (clamped to at least
/// 1, so the minimum output alphabet is binary). `dot_size` selects the
/// Bayer matrix size for the ordered variant and is ignored otherwise.
pub fn multi_tone_dither(
    gray: &[u8],
    width: usize,
    height: usize,
    levels: u8,
    variant: MultiToneVariant,
    dot_size: u32,
) -> Vec<u8> {
    let levels = usize::from(levels.max(1));
    let tones = tone_values(levels);
    let thresholds = tone_thresholds(levels);
    // Span of intensities a single tile cell can shift a pixel across
    let bias_range = 255.0 / (levels + 1) as f32;

    let mut out = vec![0u8; width * height];
    match variant {
        MultiToneVariant::Ordered => {
            let matrix = bayer_matrix(dot_size.max(2) as usize);
            for y in 0..height {
                for x in 0..width {
                    let idx = y * width + x;
                    let adjusted = f32::from(gray[idx]) - matrix.value_at(x, y) * bias_range
                        + bias_range / 2.0;
                    out[idx] = tones[select_tone(adjusted, &thresholds)];
                }
            }
        }
        MultiToneVariant::ErrorDiffusion => {
            let mut buffer: Vec<f32> = gray.iter().map(|&v| f32::from(v)).collect();
            let divisor = f32::from(FLOYD_STEINBERG.divisor);
            for y in 0..height {
                for x in 0..width {
                    let idx = y * width + x;
                    let value = buffer[idx];

                    let closest = *tones
                        .iter()
                        .min_by(|&&a, &&b| {
                            (value - f32::from(a))
                                .abs()
                                .total_cmp(&(value - f32::from(b)).abs())
                        })
                        .unwrap_or(&0);
                    let error = value - f32::from(closest);
                    out[idx] = closest;

                    for &(dx, dy, weight) in FLOYD_STEINBERG.entries {
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
        MultiToneVariant::BlueNoise => {
            let field = shared_noise();
            for y in 0..height {
                for x in 0..width {
                    let idx = y * width + x;
                    let adjusted = f32::from(gray[idx]) - field.value_at(x, y) * bias_range
                        + bias_range / 2.0;
                    out[idx] = tones[select_tone(adjusted, &thresholds)];
                }
            }
        }
    }
    gray_to_rgba(&out)
}
