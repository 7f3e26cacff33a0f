//! The reference scalar tier: the full algorithm library, executed on the
//! CPU. Supports every algorithm and color mode, which makes it the
//! universal fallback for the other tiers.

use dither_core::{dither, pipeline, Algorithm, ColorMode};

use crate::error::BackendError;

use super::{ChunkBackend, ChunkInput, Tier};

/// The always-available CPU tier.
pub struct ScalarBackend;

impl ChunkBackend for ScalarBackend {
    fn tier(&self) -> Tier {
        Tier::Scalar
    }

    fn supports(&self, _algorithm: &Algorithm, _color_mode: &ColorMode) -> bool {
        true
    }

    fn process_chunk(&self, input: &ChunkInput<'_>) -> Result<Vec<u8>, BackendError> {
        let options = input.options;
        // The grayscale rendition is already computed once per job; reuse
        // it instead of re-deriving it from the RGBA rows.
        let pixels = if options.color_mode.is_monochrome() {
            dither(input.gray, input.width, input.height, &options.algorithm)
        } else {
            pipeline::dither_rgba(
                input.rgba,
                input.width,
                input.height,
                &options.algorithm,
                &options.color_mode,
            )
        };
        Ok(pixels)
    }
}
