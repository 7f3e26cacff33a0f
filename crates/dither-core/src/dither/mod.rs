//! The dithering algorithm library.
//!
//! [`Algorithm`] is a closed enum: every variant carries its own parameter
//! payload and [`dither`] dispatches with an exhaustive match, so adding an
//! algorithm is a compile-time checked change rather than a stringly-typed
//! switch with a silent default arm.
//!
//! Every function here maps `(intensity, width, height, params)` to an RGBA
//! buffer and is total for any `width x height >= 0` and any parameter value
//! reachable through the public types. Validation of out-of-range values
//! (e.g. a zero-color palette) is the caller's concern.

mod dbs;
mod halftone;
mod kernel;
mod multi_tone;
mod ordered;
mod pattern;
mod riemersma;
mod stochastic;

pub use dbs::direct_binary_search_dither;
pub use halftone::halftone_dither;
pub use kernel::{
    DiffusionKernel, ATKINSON, BURKES, FLOYD_STEINBERG, JARVIS_JUDICE_NINKE, SIERRA_LITE, STUCKI,
};
pub use multi_tone::{multi_tone_dither, MultiToneVariant};
pub use ordered::ordered_dither;
pub use pattern::pattern_dither;
pub use riemersma::riemersma_dither;
pub use stochastic::{blue_noise_dither, random_dither, void_and_cluster_dither};

use serde::{Deserialize, Serialize};

use crate::matrix::PatternKind;

/// A dithering algorithm together with its parameters.
///
/// Monochrome variants produce strictly binary output (every byte 0 or
/// 255); `MultiTone` produces N grayscale levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum Algorithm {
    /// Bayer-matrix biased thresholding.
    Ordered { dot_size: u32, threshold: u8 },
    /// Classic error diffusion, 4 neighbors, full propagation.
    FloydSteinberg { threshold: u8 },
    /// Error diffusion dropping a quarter of the error (6/8 distributed).
    Atkinson { threshold: u8 },
    /// Wide 3-row error diffusion kernel.
    JarvisJudiceNinke { threshold: u8 },
    /// 3-row kernel with sharper center weights than JJN.
    Stucki { threshold: u8 },
    /// Two-row simplification of Stucki.
    Burkes { threshold: u8 },
    /// Minimal 3-neighbor error diffusion.
    SierraLite { threshold: u8 },
    /// Uniform noise added before thresholding. Non-deterministic.
    Random { threshold: u8, noise_amplitude: f32 },
    /// Thresholding against a generated blue noise field.
    BlueNoise { threshold: u8 },
    /// Thresholding against a void-and-cluster rank matrix.
    VoidAndCluster,
    /// Error diffusion along a Hilbert curve with a decaying register.
    Riemersma { threshold: u8 },
    /// Iterative toggle optimization against an HVS-weighted error metric.
    DirectBinarySearch { threshold: u8 },
    /// Rotated dot grid with radius proportional to darkness.
    Halftone { dot_size: u32, spacing: u32, angle: f32 },
    /// Thresholding against a tiled structured pattern matrix.
    Pattern { kind: PatternKind, size: u32 },
    /// N-level quantization with ordered, diffused or noise-biased level
    /// selection.
    MultiTone {
        levels: u8,
        variant: MultiToneVariant,
        dot_size: u32,
    },
}

impl Algorithm {
    /// Ordered dithering with the default 1-pixel matrix tiling and
    /// threshold 128.
    pub fn ordered() -> Self {
        Algorithm::Ordered {
            dot_size: 1,
            threshold: 128,
        }
    }

    /// Floyd-Steinberg with the default threshold.
    pub fn floyd_steinberg() -> Self {
        Algorithm::FloydSteinberg { threshold: 128 }
    }

    /// Atkinson with the default threshold.
    pub fn atkinson() -> Self {
        Algorithm::Atkinson { threshold: 128 }
    }

    /// Halftone with the default 4px dots, 8px spacing, 45 degree screen.
    pub fn halftone() -> Self {
        Algorithm::Halftone {
            dot_size: 4,
            spacing: 8,
            angle: 45.0,
        }
    }

    /// Pattern dithering with the default 4px dot tile.
    pub fn pattern(kind: PatternKind) -> Self {
        Algorithm::Pattern { kind, size: 4 }
    }

    /// True for algorithms with a sequential data dependency between
    /// pixels. These can never run on the GPU tier, and the scheduler
    /// shrinks their chunks on low-end devices.
    pub fn is_sequential(&self) -> bool {
        matches!(
            self,
            Algorithm::FloydSteinberg { .. }
                | Algorithm::Atkinson { .. }
                | Algorithm::JarvisJudiceNinke { .. }
                | Algorithm::Stucki { .. }
                | Algorithm::Burkes { .. }
                | Algorithm::SierraLite { .. }
                | Algorithm::Riemersma { .. }
                | Algorithm::DirectBinarySearch { .. }
                | Algorithm::MultiTone {
                    variant: MultiToneVariant::ErrorDiffusion,
                    ..
                }
        )
    }

    /// Short name for logs and CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            Algorithm::Ordered { .. } => "ordered",
            Algorithm::FloydSteinberg { .. } => "floyd-steinberg",
            Algorithm::Atkinson { .. } => "atkinson",
            Algorithm::JarvisJudiceNinke { .. } => "jarvis-judice-ninke",
            Algorithm::Stucki { .. } => "stucki",
            Algorithm::Burkes { .. } => "burkes",
            Algorithm::SierraLite { .. } => "sierra-lite",
            Algorithm::Random { .. } => "random",
            Algorithm::BlueNoise { .. } => "blue-noise",
            Algorithm::VoidAndCluster => "void-and-cluster",
            Algorithm::Riemersma { .. } => "riemersma",
            Algorithm::DirectBinarySearch { .. } => "direct-binary-search",
            Algorithm::Halftone { .. } => "halftone",
            Algorithm::Pattern { .. } => "pattern",
            Algorithm::MultiTone { .. } => "multi-tone",
        }
    }
}

/// Dither an intensity buffer with the given algorithm.
///
/// Returns an RGBA buffer of `width * height * 4` bytes with opaque alpha.
pub fn dither(gray: &[u8], width: usize, height: usize, algorithm: &Algorithm) -> Vec<u8> {
    match *algorithm {
        Algorithm::Ordered {
            dot_size,
            threshold,
        } => ordered_dither(gray, width, height, dot_size, threshold),
        Algorithm::FloydSteinberg { threshold } => {
            kernel::diffuse(gray, width, height, threshold, &FLOYD_STEINBERG)
        }
        Algorithm::Atkinson { threshold } => {
            kernel::diffuse(gray, width, height, threshold, &ATKINSON)
        }
        Algorithm::JarvisJudiceNinke { threshold } => {
            kernel::diffuse(gray, width, height, threshold, &JARVIS_JUDICE_NINKE)
        }
        Algorithm::Stucki { threshold } => kernel::diffuse(gray, width, height, threshold, &STUCKI),
        Algorithm::Burkes { threshold } => kernel::diffuse(gray, width, height, threshold, &BURKES),
        Algorithm::SierraLite { threshold } => {
            kernel::diffuse(gray, width, height, threshold, &SIERRA_LITE)
        }
        Algorithm::Random {
            threshold,
            noise_amplitude,
        } => random_dither(gray, width, height, threshold, noise_amplitude),
        Algorithm::BlueNoise { threshold } => blue_noise_dither(gray, width, height, threshold),
        Algorithm::VoidAndCluster => void_and_cluster_dither(gray, width, height),
        Algorithm::Riemersma { threshold } => riemersma_dither(gray, width, height, threshold),
        Algorithm::DirectBinarySearch { threshold } => {
            direct_binary_search_dither(gray, width, height, threshold)
        }
        Algorithm::Halftone {
            dot_size,
            spacing,
            angle,
        } => halftone_dither(gray, width, height, dot_size, spacing, angle),
        Algorithm::Pattern { kind, size } => pattern_dither(gray, width, height, kind, size),
        Algorithm::MultiTone {
            levels,
            variant,
            dot_size,
        } => multi_tone_dither(gray, width, height, levels, variant, dot_size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// All monochrome algorithms (multi-tone excluded by definition).
    fn monochrome_algorithms() -> Vec<Algorithm> {
        vec![
            Algorithm::ordered(),
            Algorithm::floyd_steinberg(),
            Algorithm::atkinson(),
            Algorithm::JarvisJudiceNinke { threshold: 128 },
            Algorithm::Stucki { threshold: 128 },
            Algorithm::Burkes { threshold: 128 },
            Algorithm::SierraLite { threshold: 128 },
            Algorithm::Random {
                threshold: 128,
                noise_amplitude: 128.0,
            },
            Algorithm::BlueNoise { threshold: 128 },
            Algorithm::VoidAndCluster,
            Algorithm::Riemersma { threshold: 128 },
            Algorithm::DirectBinarySearch { threshold: 128 },
            Algorithm::halftone(),
            Algorithm::pattern(crate::matrix::PatternKind::Dots),
        ]
    }

    #[test]
    fn test_every_monochrome_output_is_binary() {
        let gray: Vec<u8> = (0..16 * 16).map(|i| (i % 256) as u8).collect();
        for alg in monochrome_algorithms() {
            let rgba = dither(&gray, 16, 16, &alg);
            assert_eq!(rgba.len(), 16 * 16 * 4, "{}: wrong output size", alg.label());
            for (i, px) in rgba.chunks_exact(4).enumerate() {
                assert!(
                    px[0] == 0 || px[0] == 255,
                    "{}: pixel {} has non-binary value {}",
                    alg.label(),
                    i,
                    px[0]
                );
                assert_eq!(px[0], px[1]);
                assert_eq!(px[1], px[2]);
                assert_eq!(px[3], 255, "{}: alpha must be opaque", alg.label());
            }
        }
    }

    #[test]
    fn test_empty_image_is_total() {
        for alg in monochrome_algorithms() {
            assert!(dither(&[], 0, 0, &alg).is_empty(), "{}", alg.label());
        }
    }

    #[test]
    fn test_single_pixel_is_total() {
        for alg in monochrome_algorithms() {
            let rgba = dither(&[200], 1, 1, &alg);
            assert_eq!(rgba.len(), 4, "{}", alg.label());
        }
    }

    #[test]
    fn test_sequential_classification() {
        assert!(Algorithm::floyd_steinberg().is_sequential());
        assert!(Algorithm::Riemersma { threshold: 128 }.is_sequential());
        assert!(!Algorithm::ordered().is_sequential());
        assert!(!Algorithm::halftone().is_sequential());
        assert!(!Algorithm::BlueNoise { threshold: 128 }.is_sequential());
    }

    #[test]
    fn test_algorithm_serde_round_trip() {
        let alg = Algorithm::Halftone {
            dot_size: 6,
            spacing: 3,
            angle: 15.0,
        };
        let json = serde_json::to_string(&alg).unwrap();
        let back: Algorithm = serde_json::from_str(&json).unwrap();
        assert_eq!(alg, back);
    }
}
