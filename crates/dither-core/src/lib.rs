//! dither-core: dithering algorithms for binary and reduced-palette output
//!
//! This library renders a grayscale (or per-channel) intensity buffer into a
//! quantized RGBA buffer using one of roughly sixteen dithering algorithms:
//!
//! - **Ordered**: Bayer-matrix biased thresholding
//! - **Error diffusion**: Floyd-Steinberg, Atkinson, Jarvis-Judice-Ninke,
//!   Stucki, Burkes, Sierra Lite
//! - **Stochastic**: random noise, blue noise, void-and-cluster
//! - **Space-filling**: Riemersma (Hilbert curve walk)
//! - **Optimization**: direct binary search
//! - **Structured**: halftone, pattern, multi-tone
//!
//! All algorithms are pure functions from `(intensity, width, height,
//! parameters)` to an RGBA buffer. Nothing in this crate performs I/O or
//! mutates shared state, which is what makes the chunked scheduling in the
//! engine crate safe: two calls over disjoint row ranges can never observe
//! each other.
//!
//! # Quick Start
//!
//! ```
//! use dither_core::{dither, Algorithm};
//!
//! let gray = vec![0u8, 100, 200, 50, 150, 250, 25, 125, 255];
//! let rgba = dither(&gray, 3, 3, &Algorithm::ordered());
//!
//! assert_eq!(rgba.len(), 3 * 3 * 4);
//! assert_eq!(rgba[0], 0);        // darkest corner quantizes to black
//! assert_eq!(rgba[8 * 4], 255);  // brightest corner quantizes to white
//! ```
//!
//! # Selective dithering
//!
//! [`selective_dither`] applies distinct algorithms to masked regions of a
//! single image and fills uncovered pixels with a default algorithm. Masks
//! are plain per-pixel coverage buffers produced by [`MaskShape`] or by the
//! caller.
//!
//! # Color modes
//!
//! [`process_image`] is the full pipeline: pre-adjustments (brightness,
//! contrast, gamma, levels, HSL, sharpen, blur) followed by color-mode
//! routing — monochrome, per-channel RGB/CMYK separation, or a custom
//! luminance-ordered palette.

pub mod adjust;
pub mod dither;
pub mod intensity;
pub mod matrix;
pub mod output;
pub mod palette;
pub mod pipeline;
pub mod selective;

pub use adjust::Adjustments;
pub use dither::{dither, Algorithm, MultiToneVariant};
pub use matrix::{PatternKind, ThresholdMatrix};
pub use output::DitheredImage;
pub use palette::{PaletteColor, ParseColorError};
pub use pipeline::{process_image, ColorMode, RenderOptions};
pub use selective::{selective_dither, MaskRegion, MaskShape};
