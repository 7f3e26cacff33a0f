//! Threshold matrix and pattern generators.
//!
//! A [`ThresholdMatrix`] is a square tile of bias/threshold values
//! normalized to `[0, 1]`, tiled modulo its own size across the image.
//! Generators in this module produce the tiles consumed by the ordered,
//! pattern, blue-noise and void-and-cluster algorithms, plus the Hilbert
//! curve path that drives Riemersma dithering.
//!
//! Matrices are immutable once generated; generating one per
//! `(kind, size)` pair and reusing it is always safe.

mod bayer;
mod blue_noise;
mod hilbert;
mod pattern;
mod void_cluster;

pub use bayer::bayer_matrix;
pub use blue_noise::blue_noise_field;
pub use hilbert::hilbert_path;
pub use pattern::{pattern_matrix, PatternKind};
pub use void_cluster::void_and_cluster_matrix;

/// A square tile of normalized threshold values.
///
/// Values lie in `[0, 1]` and are addressed modulo the tile size, so a
/// matrix can be sampled at any image coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdMatrix {
    size: usize,
    values: Vec<f32>,
}

impl ThresholdMatrix {
    /// Wrap a flat row-major value buffer.
    ///
    /// # Panics (debug only)
    ///
    /// Debug-asserts that `values.len() == size * size`.
    pub fn new(size: usize, values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), size * size, "matrix must be square");
        Self { size, values }
    }

    /// Side length of the tile.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// The flat row-major values.
    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Sample the tile at an image coordinate, wrapping modulo the size.
    #[inline]
    pub fn value_at(&self, x: usize, y: usize) -> f32 {
        self.values[(y % self.size) * self.size + (x % self.size)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_at_wraps() {
        let m = ThresholdMatrix::new(2, vec![0.0, 0.25, 0.5, 0.75]);
        assert_eq!(m.value_at(0, 0), 0.0);
        assert_eq!(m.value_at(2, 0), 0.0, "x wraps modulo size");
        assert_eq!(m.value_at(1, 3), 0.75, "y wraps modulo size");
    }
}
