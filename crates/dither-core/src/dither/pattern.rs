//! Pattern dithering: thresholding against a structured tile.

use crate::intensity::gray_to_rgba;
use crate::matrix::{pattern_matrix, PatternKind};

/// Threshold each pixel against a tiled structured pattern matrix.
///
/// The matrix value at the pixel's tile position becomes that pixel's
/// threshold (`matrix * 255`); pixels at or above it go white.
pub fn pattern_dither(
    gray: &[u8],
    width: usize,
    height: usize,
    kind: PatternKind,
    size: u32,
) -> Vec<u8> {
    let matrix = pattern_matrix(kind, size.max(1) as usize);

    let mut out = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let threshold = matrix.value_at(x, y) * 255.0;
            let pixel = f32::from(gray[y * width + x]);
            out[y * width + x] = if pixel < threshold { 0 } else { 255 };
        }
    }
    gray_to_rgba(&out)
}
