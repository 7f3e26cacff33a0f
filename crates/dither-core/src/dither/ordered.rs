//! Ordered (Bayer) dithering.

use std::sync::OnceLock;

use crate::intensity::gray_to_rgba;
use crate::matrix::{bayer_matrix, ThresholdMatrix};

/// The shared 4x4 Bayer tile. Generated once per process.
fn bayer4() -> &'static ThresholdMatrix {
    static BAYER4: OnceLock<ThresholdMatrix> = OnceLock::new();
    BAYER4.get_or_init(|| bayer_matrix(4))
}

/// Ordered dithering against the 4x4 Bayer matrix.
///
/// Each matrix cell shifts the effective threshold by a position-dependent
/// bias centered on zero. The cell rank is mapped through the half-step
/// form `(rank + 0.5) / n^2` rather than `rank / (n^2 - 1)`, which keeps
/// every effective threshold strictly inside `(0, 255)` — pure black and
/// pure white survive every cell of the tile.
///
/// `dot_size` scales the tiling: each matrix cell covers a
/// `dot_size x dot_size` pixel block. Output is strictly binary.
pub fn ordered_dither(
    gray: &[u8],
    width: usize,
    height: usize,
    dot_size: u32,
    threshold: u8,
) -> Vec<u8> {
    let matrix = bayer4();
    let dot = dot_size.max(1) as usize;
    let threshold = f32::from(threshold);
    let cells = (matrix.size() * matrix.size()) as f32;

    let mut out = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let rank = matrix.value_at(x / dot, y / dot) * (cells - 1.0);
            let bias = ((rank + 0.5) / cells - 0.5) * 255.0;
            let pixel = f32::from(gray[y * width + x]);
            out[y * width + x] = if pixel >= threshold + bias { 255 } else { 0 };
        }
    }
    gray_to_rgba(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_gradient_regression() {
        // 3x3 gradient: darkest corner goes black, brightest goes white.
        let gray = [0u8, 100, 200, 50, 150, 250, 25, 125, 255];
        let rgba = ordered_dither(&gray, 3, 3, 1, 128);

        assert_eq!(rgba[0], 0, "intensity 0 at the matrix origin stays black");
        assert_eq!(rgba[8 * 4], 255, "intensity 255 thresholds to white");
    }

    #[test]
    fn test_extremes_preserved_every_cell() {
        // The half-step bias keeps effective thresholds inside (0, 255),
        // so extremes survive all 16 matrix cells.
        let black = vec![0u8; 64];
        let white = vec![255u8; 64];

        let rgba = ordered_dither(&black, 8, 8, 1, 128);
        assert!(rgba.chunks_exact(4).all(|px| px[0] == 0));

        let rgba = ordered_dither(&white, 8, 8, 1, 128);
        assert!(rgba.chunks_exact(4).all(|px| px[0] == 255));
    }

    #[test]
    fn test_mid_gray_mixes() {
        let gray = vec![128u8; 64];
        let rgba = ordered_dither(&gray, 8, 8, 1, 128);
        let white = rgba.chunks_exact(4).filter(|px| px[0] == 255).count();
        assert!(white > 0 && white < 64, "mid gray must produce a mix");
    }

    #[test]
    fn test_density_tracks_intensity() {
        // More intensity, more white pixels: the matrix is a permutation,
        // so density steps monotonically with the input level.
        let mut last = 0;
        for v in [40u8, 120, 220] {
            let gray = vec![v; 16 * 16];
            let rgba = ordered_dither(&gray, 16, 16, 1, 128);
            let white = rgba.chunks_exact(4).filter(|px| px[0] == 255).count();
            assert!(white >= last, "density must not decrease with intensity");
            last = white;
        }
    }

    #[test]
    fn test_dot_size_scales_tiling() {
        // With dot_size 2 the 4x4 tile covers 8x8 pixels, so adjacent pixel
        // pairs share a matrix cell.
        let gray = vec![128u8; 64];
        let rgba = ordered_dither(&gray, 8, 8, 2, 128);
        for y in 0..8 {
            for x in (0..8).step_by(2) {
                let a = rgba[(y * 8 + x) * 4];
                let b = rgba[(y * 8 + x + 1) * 4];
                assert_eq!(a, b, "pixels in one dot block must agree");
            }
        }
    }

    #[test]
    fn test_zero_dot_size_clamped() {
        let rgba = ordered_dither(&[128, 128], 2, 1, 0, 128);
        assert_eq!(rgba.len(), 8);
    }
}
