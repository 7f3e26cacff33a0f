//! Riemersma dithering: error diffusion along a Hilbert curve.

use crate::intensity::gray_to_rgba;
use crate::matrix::hilbert_path;

/// Decay weights of the 3-tap error register. The register shifts one slot
/// per visited pixel, so correction influence fades with curve distance
/// rather than raster distance.
const DECAY: [f32; 3] = [0.4, 0.3, 0.3];

/// Riemersma dithering.
///
/// Walks the smallest Hilbert curve covering the image (order
/// `ceil(log2(max(width, height)))`), carrying a short decaying error
/// register instead of a 2-D neighborhood. Because consecutive curve
/// positions are spatially adjacent, error correction follows image
/// locality instead of scanline order.
pub fn riemersma_dither(gray: &[u8], width: usize, height: usize, threshold: u8) -> Vec<u8> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let buffer: Vec<f32> = gray.iter().map(|&v| f32::from(v)).collect();
    let mut out = vec![0u8; width * height];

    let max_dim = width.max(height);
    let order = (max_dim as f32).log2().ceil() as u32;
    let threshold = f32::from(threshold);

    let mut register = [0.0f32; 3];
    for (x, y) in hilbert_path(order) {
        // The curve covers a power-of-two square; skip cells outside the image
        if x >= width || y >= height {
            continue;
        }
        let idx = y * width + x;

        let value = buffer[idx] + register[0];
        let new = if value < threshold { 0.0 } else { 255.0 };
        let error = value - new;

        register[0] = register[1] + error * DECAY[0];
        register[1] = register[2] + error * DECAY[1];
        register[2] = error * DECAY[2];

        out[idx] = new as u8;
    }
    gray_to_rgba(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_output() {
        let gray: Vec<u8> = (0..100).map(|i| (i * 2) as u8).collect();
        let rgba = riemersma_dither(&gray, 10, 10, 128);
        assert_eq!(rgba.len(), 400);
        assert!(rgba.chunks_exact(4).all(|px| px[0] == 0 || px[0] == 255));
    }

    #[test]
    fn test_every_pixel_written_non_square() {
        // 5x3 image needs an order-3 curve (8x8); all 15 pixels must still
        // be visited exactly once.
        let gray = vec![255u8; 15];
        let rgba = riemersma_dither(&gray, 5, 3, 128);
        assert!(
            rgba.chunks_exact(4).all(|px| px[0] == 255 && px[3] == 255),
            "uniform white input must light every pixel"
        );
    }

    #[test]
    fn test_density_tracks_input() {
        let gray = vec![128u8; 64 * 64];
        let rgba = riemersma_dither(&gray, 64, 64, 128);
        let white = rgba.chunks_exact(4).filter(|px| px[0] == 255).count();
        let ratio = white as f32 / (64.0 * 64.0);
        assert!(
            (ratio - 0.5).abs() < 0.1,
            "mid gray should stay near 50%, got {}",
            ratio
        );
    }

    #[test]
    fn test_empty_image() {
        assert!(riemersma_dither(&[], 0, 0, 128).is_empty());
    }
}
