//! Stochastic thresholding algorithms: random noise, blue noise and
//! void-and-cluster.

use std::sync::OnceLock;

use rand::Rng;

use crate::intensity::gray_to_rgba;
use crate::matrix::{blue_noise_field, void_and_cluster_matrix, ThresholdMatrix};

/// Tile size for the generated blue noise field.
const BLUE_NOISE_SIZE: usize = 64;

/// Tile size for the void-and-cluster rank matrix.
const VOID_CLUSTER_SIZE: usize = 32;

fn shared_blue_noise() -> &'static ThresholdMatrix {
    static FIELD: OnceLock<ThresholdMatrix> = OnceLock::new();
    FIELD.get_or_init(|| blue_noise_field(BLUE_NOISE_SIZE))
}

fn shared_void_cluster() -> &'static ThresholdMatrix {
    static MATRIX: OnceLock<ThresholdMatrix> = OnceLock::new();
    MATRIX.get_or_init(|| void_and_cluster_matrix(VOID_CLUSTER_SIZE))
}

/// Random dithering: uniform noise added before thresholding.
///
/// Noise is drawn per pixel from `[-amplitude/2, amplitude/2)`.
/// Non-deterministic by design.
pub fn random_dither(
    gray: &[u8],
    width: usize,
    height: usize,
    threshold: u8,
    noise_amplitude: f32,
) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let threshold = f32::from(threshold);

    let mut out = vec![0u8; width * height];
    for (i, &pixel) in gray.iter().enumerate() {
        let noise = (rng.gen::<f32>() - 0.5) * noise_amplitude;
        let value = f32::from(pixel) + noise;
        out[i] = if value < threshold { 0 } else { 255 };
    }
    gray_to_rgba(&out)
}

/// Blue noise dithering: thresholding against a dispersed-dot field.
///
/// The field perturbs each pixel by `(field * 255 - 128) * 0.5` before the
/// fixed threshold, so the high-frequency structure of the field carries
/// into the output without low-frequency clumping.
pub fn blue_noise_dither(gray: &[u8], width: usize, height: usize, threshold: u8) -> Vec<u8> {
    let field = shared_blue_noise();
    let threshold = f32::from(threshold);

    let mut out = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let noise = (field.value_at(x, y) * 255.0 - 128.0) * 0.5;
            let value = (f32::from(gray[y * width + x]) + noise).clamp(0.0, 255.0);
            out[y * width + x] = if value < threshold { 0 } else { 255 };
        }
    }
    gray_to_rgba(&out)
}

/// Void-and-cluster dithering: the rank matrix supplies every threshold.
///
/// Unlike [`blue_noise_dither`] there is no fixed threshold parameter; the
/// tiled rank value at each position *is* the threshold.
pub fn void_and_cluster_dither(gray: &[u8], width: usize, height: usize) -> Vec<u8> {
    let matrix = shared_void_cluster();

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_extremes_with_zero_noise() {
        // Zero amplitude reduces to plain thresholding
        let gray = [0u8, 255, 100, 200];
        let rgba = random_dither(&gray, 2, 2, 128, 0.0);
        let values: Vec<u8> = rgba.chunks_exact(4).map(|px| px[0]).collect();
        assert_eq!(values, vec![0, 255, 0, 255]);
    }

    #[test]
    fn test_random_density_tracks_input() {
        let gray = vec![128u8; 64 * 64];
        let rgba = random_dither(&gray, 64, 64, 128, 128.0);
        let white = rgba.chunks_exact(4).filter(|px| px[0] == 255).count();
        let ratio = white as f32 / (64.0 * 64.0);
        assert!(
            (ratio - 0.5).abs() < 0.15,
            "mid gray should stay near 50% white, got {}",
            ratio
        );
    }

    #[test]
    fn test_blue_noise_binary_and_mixed() {
        let gray = vec![128u8; 64 * 64];
        let rgba = blue_noise_dither(&gray, 64, 64, 128);
        let white = rgba.chunks_exact(4).filter(|px| px[0] == 255).count();
        assert!(white > 0 && white < 64 * 64, "mid gray must mix");
        assert!(rgba.chunks_exact(4).all(|px| px[0] == 0 || px[0] == 255));
    }

    #[test]
    fn test_void_cluster_density_tracks_input() {
        // The rank matrix is a permutation of thresholds, so a constant
        // input of intensity v lights approximately v/255 of each tile.
        for v in [64u8, 128, 192] {
            let gray = vec![v; 64 * 64];
            let rgba = void_and_cluster_dither(&gray, 64, 64);
            let white = rgba.chunks_exact(4).filter(|px| px[0] == 255).count();
            let ratio = white as f32 / (64.0 * 64.0);
            let expected = f32::from(v) / 255.0;
            assert!(
                (ratio - expected).abs() < 0.1,
                "intensity {} should light ~{:.0}% of pixels, got {:.0}%",
                v,
                expected * 100.0,
                ratio * 100.0
            );
        }
    }
}
