//! Chunk sizing heuristics.
//!
//! The scheduler splits an image into horizontal row slices. The base size
//! comes from the requested step count; the device profile then adjusts it:
//! sequential algorithms shrink their chunks on low-end machines (each
//! chunk restarts diffusion state, so more chunks also means more yields on
//! hardware that needs them), high-end machines take bigger chunks, the GPU
//! tier is capped by its texture limit, and small images collapse to at
//! most four chunks so progress reporting does not dominate the work.

use crate::capabilities::Capabilities;

/// Default smallest chunk height in rows.
pub const DEFAULT_MIN_CHUNK_ROWS: usize = 50;

/// Default largest chunk height in rows.
pub const DEFAULT_MAX_CHUNK_ROWS: usize = 512;

/// Default number of progress steps a job aims for.
pub const DEFAULT_PROGRESS_STEPS: usize = 10;

/// Pixel count under which an image counts as small.
const SMALL_IMAGE_PIXELS: usize = 500_000;

/// Maximum chunk count for small images.
const SMALL_IMAGE_MAX_CHUNKS: usize = 4;

/// Inputs to the chunk sizing decision.
pub(crate) struct ChunkPlanInputs<'a> {
    pub width: usize,
    pub height: usize,
    pub progress_steps: usize,
    pub min_chunk_rows: usize,
    pub max_chunk_rows: usize,
    /// The algorithm has a sequential pixel dependency.
    pub sequential: bool,
    /// The job starts on the GPU tier.
    pub gpu: bool,
    pub capabilities: &'a dyn Capabilities,
}

/// The chunking decision for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChunkPlan {
    pub chunk_rows: usize,
    pub total_rows: usize,
}

impl ChunkPlan {
    pub fn new(inputs: &ChunkPlanInputs<'_>) -> Self {
        let height = inputs.height;
        let mut chunk = height
            .div_ceil(inputs.progress_steps.max(1))
            .clamp(inputs.min_chunk_rows.max(1), inputs.max_chunk_rows.max(1));

        if inputs.capabilities.is_high_end() {
            chunk = (chunk * 2).min(inputs.max_chunk_rows.max(1));
        } else if inputs.sequential {
            chunk = (chunk / 2).max(inputs.min_chunk_rows.max(1));
        }

        if inputs.gpu {
            chunk = chunk.min(inputs.capabilities.max_texture_dim() as usize);
        }

        if inputs.width * height < SMALL_IMAGE_PIXELS {
            chunk = chunk.max(height.div_ceil(SMALL_IMAGE_MAX_CHUNKS));
        }

        Self {
            chunk_rows: chunk.max(1),
            total_rows: height,
        }
    }

    /// Number of chunks the plan produces.
    pub fn count(&self) -> usize {
        self.total_rows.div_ceil(self.chunk_rows)
    }

    /// Iterate `(start_row, rows)` pairs covering every row exactly once,
    /// in increasing `start_row` order.
    pub fn chunks(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let chunk_rows = self.chunk_rows;
        let total = self.total_rows;
        (0..self.count()).map(move |i| {
            let start = i * chunk_rows;
            (start, chunk_rows.min(total - start))
        })
    }
}
