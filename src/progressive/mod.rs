//! The progressive scheduler and the engine's two entry points.
//!
//! A job renders one image through whichever backend tier the
//! [`BackendSet`] selects, split into horizontal chunks so a host UI
//! thread stays responsive. Consumers observe a lazy event sequence —
//! [`RenderEvent::Progress`] items followed by exactly one
//! [`RenderEvent::Complete`], or an error value — instead of wiring
//! nested callbacks.
//!
//! Output rows are written in strictly increasing order, chunk by chunk:
//! any partial buffer observed at progress step *k* is a byte-for-byte
//! row prefix of the final image below the processed height.
//!
//! # Chunk boundaries and error diffusion
//!
//! Error-diffusing algorithms reinitialize their working state per chunk,
//! so diffused error does not carry across chunk boundaries in progressive
//! mode — a faint horizontal seam can appear at chunk edges. Single-shot
//! rendering ([`dither_once`]) has no such seams. Jobs that hit this
//! combination log it at debug level.

mod chunking;

pub use chunking::{DEFAULT_MAX_CHUNK_ROWS, DEFAULT_MIN_CHUNK_ROWS, DEFAULT_PROGRESS_STEPS};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dither_core::{intensity, DitheredImage, RenderOptions};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::backend::{BackendSet, ChunkBackend, ChunkInput, Tier};
use crate::capabilities::{Capabilities, DeviceProfile};
use crate::error::EngineError;

use self::chunking::{ChunkPlan, ChunkPlanInputs};

/// Row count at or under which a job runs in batch mode (no suspension
/// points) by default.
const BATCH_MAX_ROWS: usize = 1000;

/// How a job's chunk loop is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Synchronous loop over all chunks; progress events still fire per
    /// chunk, but control never yields. Default for small images.
    Batch,
    /// Yield to the async runtime between chunks — the only suspension
    /// point in the system. Default for larger images.
    Cooperative,
}

/// One item of a job's event sequence.
#[derive(Debug, Clone)]
pub enum RenderEvent {
    /// A chunk finished. `percent` is capped at 99 until the job is done;
    /// `partial` (when enabled) is the composited buffer so far.
    Progress {
        percent: u8,
        partial: Option<DitheredImage>,
    },
    /// The terminal success event; emitted exactly once.
    Complete(DitheredImage),
}

/// Options for a progressive job.
#[derive(Debug, Clone)]
pub struct ProgressiveOptions {
    /// Decoded RGBA source, `width * height * 4` bytes.
    pub source: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub render: RenderOptions,
    /// Target number of progress steps (chunk count before clamping).
    pub progress_steps: usize,
    pub min_chunk_rows: usize,
    pub max_chunk_rows: usize,
    /// Attach the composited partial buffer to every progress event.
    pub emit_partials: bool,
    /// Force an execution mode instead of the height-based default.
    pub mode: Option<ExecutionMode>,
}

impl ProgressiveOptions {
    pub fn new(source: Vec<u8>, width: usize, height: usize, render: RenderOptions) -> Self {
        Self {
            source,
            width,
            height,
            render,
            progress_steps: DEFAULT_PROGRESS_STEPS,
            min_chunk_rows: DEFAULT_MIN_CHUNK_ROWS,
            max_chunk_rows: DEFAULT_MAX_CHUNK_ROWS,
            emit_partials: true,
            mode: None,
        }
    }
}

/// Handle to a running job.
///
/// Dropping the event stream also stops the job at the next chunk
/// boundary; `cancel` does the same explicitly and surfaces
/// [`EngineError::Cancelled`] on the stream.
#[derive(Debug, Clone)]
pub struct JobHandle {
    cancelled: Arc<AtomicBool>,
}

impl JobHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Checked at the top of every chunk
    /// continuation; the chunk in flight still completes.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// The stream of job events.
pub type EventStream = UnboundedReceiverStream<Result<RenderEvent, EngineError>>;

/// Start a progressive job using the process-wide device profile.
///
/// Must be called within a tokio runtime; the job runs as a spawned task.
pub fn dither_progressively(
    backends: Arc<BackendSet>,
    options: ProgressiveOptions,
) -> (JobHandle, EventStream) {
    dither_progressively_with(backends, DeviceProfile::detect(), options)
}

/// Start a progressive job with explicit capabilities (tests, embedders).
pub fn dither_progressively_with(
    backends: Arc<BackendSet>,
    capabilities: &'static (dyn Capabilities + Send + Sync),
    options: ProgressiveOptions,
) -> (JobHandle, EventStream) {
    let handle = JobHandle::new();
    let (tx, rx) = mpsc::unbounded_channel();

    let job_handle = handle.clone();
    tokio::spawn(async move {
        run_job(backends, capabilities, options, job_handle, tx).await;
    });

    (handle, UnboundedReceiverStream::new(rx))
}

/// Synchronous single-shot entry point.
///
/// Renders the whole image as one chunk through the same tier selection
/// and monotonic fallback walk as the progressive path. The module tier is
/// only used when its artifact is already loaded (loading is async); an
/// unloaded module simply falls through to the scalar tier.
pub fn dither_once(
    backends: &BackendSet,
    source: &[u8],
    width: usize,
    height: usize,
    render: &RenderOptions,
) -> Result<DitheredImage, EngineError> {
    validate_source(source, width, height)?;

    let adjusted;
    let rgba = if render.adjustments.is_neutral() {
        source
    } else {
        adjusted = render.adjustments.apply(source, width, height);
        &adjusted
    };
    let gray = intensity::rgba_to_gray(rgba);

    let mut tier_idx = backends
        .select(&render.algorithm, &render.color_mode, width * height)
        .ok_or(EngineError::NoSupportingBackend {
            algorithm: render.algorithm.label(),
        })?;

    let input = ChunkInput {
        rgba,
        gray: &gray,
        width,
        height,
        options: render,
    };
    loop {
        let backend = &backends.backends()[tier_idx];
        match backend.process_chunk(&input) {
            Ok(pixels) => return Ok(DitheredImage::new(pixels, width, height)),
            Err(err) => {
                warn!(tier = %backend.tier(), error = %err, "single-shot tier failed");
                match backends.next_supporting(
                    tier_idx + 1,
                    &render.algorithm,
                    &render.color_mode,
                ) {
                    Some(next) => tier_idx = next,
                    None => return Err(EngineError::AllBackendsFailed(err)),
                }
            }
        }
    }
}

/// One image of a batch job.
#[derive(Debug, Clone)]
pub struct BatchEvent {
    /// Index of the image within the batch.
    pub index: usize,
    pub event: RenderEvent,
}

/// Render a set of images sequentially through the progressive path.
///
/// Per-image events are forwarded with their batch index; cancellation
/// applies to the whole batch.
pub fn dither_batch(
    backends: Arc<BackendSet>,
    jobs: Vec<ProgressiveOptions>,
) -> (JobHandle, UnboundedReceiverStream<Result<BatchEvent, EngineError>>) {
    let handle = JobHandle::new();
    let (tx, rx) = mpsc::unbounded_channel();

    let batch_handle = handle.clone();
    tokio::spawn(async move {
        for (index, job) in jobs.into_iter().enumerate() {
            if batch_handle.is_cancelled() {
                let _ = tx.send(Err(EngineError::Cancelled));
                return;
            }
            let (job_handle, mut events) =
                dither_progressively(Arc::clone(&backends), job);
            while let Some(event) = events.next().await {
                if batch_handle.is_cancelled() {
                    job_handle.cancel();
                }
                let failed = event.is_err();
                if tx.send(event.map(|event| BatchEvent { index, event })).is_err() {
                    job_handle.cancel();
                    return;
                }
                if failed {
                    return;
                }
            }
        }
    });

    (handle, UnboundedReceiverStream::new(rx))
}

fn validate_source(source: &[u8], width: usize, height: usize) -> Result<(), EngineError> {
    let expected = width * height * 4;
    if source.len() != expected {
        return Err(EngineError::SourceSizeMismatch {
            width,
            height,
            expected,
            actual: source.len(),
        });
    }
    Ok(())
}

/// The job body: prepare, plan, then drive the chunk loop.
async fn run_job(
    backends: Arc<BackendSet>,
    capabilities: &(dyn Capabilities + Send + Sync),
    options: ProgressiveOptions,
    handle: JobHandle,
    tx: mpsc::UnboundedSender<Result<RenderEvent, EngineError>>,
) {
    if let Err(err) = validate_source(&options.source, options.width, options.height) {
        let _ = tx.send(Err(err));
        return;
    }
    let width = options.width;
    let height = options.height;
    let render = &options.render;

    // Adjustments and intensity conversion happen once per job; chunks
    // borrow row ranges of these buffers.
    let rgba = if render.adjustments.is_neutral() {
        options.source.clone()
    } else {
        render.adjustments.apply(&options.source, width, height)
    };
    let gray = intensity::rgba_to_gray(&rgba);

    let Some(mut tier_idx) =
        backends.select(&render.algorithm, &render.color_mode, width * height)
    else {
        let _ = tx.send(Err(EngineError::NoSupportingBackend {
            algorithm: render.algorithm.label(),
        }));
        return;
    };

    // A job routed to the module tier triggers the (at most once per
    // session) artifact load up front; a failed load downgrades before any
    // chunk runs.
    if backends.backends()[tier_idx].tier() == Tier::Module {
        if let Some(module) = backends.module_backend() {
            if let Err(err) = module.ensure_loaded().await {
                warn!(error = %err, "module load failed; downgrading before start");
                match backends.next_supporting(
                    tier_idx + 1,
                    &render.algorithm,
                    &render.color_mode,
                ) {
                    Some(next) => tier_idx = next,
                    None => {
                        let _ = tx.send(Err(EngineError::AllBackendsFailed(err.into())));
                        return;
                    }
                }
            }
        }
    }

    let plan = ChunkPlan::new(&ChunkPlanInputs {
        width,
        height,
        progress_steps: options.progress_steps,
        min_chunk_rows: options.min_chunk_rows,
        max_chunk_rows: options.max_chunk_rows,
        sequential: render.algorithm.is_sequential(),
        gpu: backends.backends()[tier_idx].tier() == Tier::Gpu,
        capabilities,
    });
    if render.algorithm.is_sequential() && plan.count() > 1 {
        debug!(
            algorithm = render.algorithm.label(),
            chunks = plan.count(),
            "diffusion state resets at chunk boundaries; output may seam"
        );
    }

    let mode = options.mode.unwrap_or(if height <= BATCH_MAX_ROWS {
        ExecutionMode::Batch
    } else {
        ExecutionMode::Cooperative
    });
    debug!(
        tier = %backends.backends()[tier_idx].tier(),
        ?mode,
        chunk_rows = plan.chunk_rows,
        chunks = plan.count(),
        "job starting"
    );

    if tx
        .send(Ok(RenderEvent::Progress {
            percent: 0,
            partial: None,
        }))
        .is_err()
    {
        return;
    }

    let mut out = vec![0u8; width * height * 4];
    let mut processed_rows = 0usize;

    for (start_row, rows) in plan.chunks() {
        // Explicit cancellation point at the top of every continuation
        if handle.is_cancelled() {
            let _ = tx.send(Err(EngineError::Cancelled));
            return;
        }

        let chunk = ChunkInput {
            rgba: &rgba[start_row * width * 4..(start_row + rows) * width * 4],
            gray: &gray[start_row * width..(start_row + rows) * width],
            width,
            height: rows,
            options: render,
        };

        // Monotonic fallback walk: a failing tier re-runs the chunk on the
        // next supporting tier and is never revisited within this job.
        let pixels = loop {
            let backend = &backends.backends()[tier_idx];
            match backend.process_chunk(&chunk) {
                Ok(pixels) => break pixels,
                Err(err) => {
                    warn!(
                        tier = %backend.tier(),
                        start_row,
                        error = %err,
                        "chunk failed; downgrading for the rest of the job"
                    );
                    match backends.next_supporting(
                        tier_idx + 1,
                        &render.algorithm,
                        &render.color_mode,
                    ) {
                        Some(next) => tier_idx = next,
                        None => {
                            let _ = tx.send(Err(EngineError::AllBackendsFailed(err)));
                            return;
                        }
                    }
                }
            }
        };

        out[start_row * width * 4..(start_row + rows) * width * 4].copy_from_slice(&pixels);
        processed_rows += rows;

        let percent = ((processed_rows * 100 / height.max(1)) as u8).min(99);
        let partial = options
            .emit_partials
            .then(|| DitheredImage::new(out.clone(), width, height));
        if tx
            .send(Ok(RenderEvent::Progress { percent, partial }))
            .is_err()
        {
            // The consumer dropped the stream; stop writing on its behalf.
            return;
        }

        if mode == ExecutionMode::Cooperative && processed_rows < height {
            tokio::task::yield_now().await;
        }
    }

    let final_image = DitheredImage::new(out, width, height);
    let final_partial = options.emit_partials.then(|| final_image.clone());
    if tx
        .send(Ok(RenderEvent::Progress {
            percent: 100,
            partial: final_partial,
        }))
        .is_err()
    {
        return;
    }
    let _ = tx.send(Ok(RenderEvent::Complete(final_image)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use dither_core::Algorithm;

    #[test]
    fn test_validate_source() {
        assert!(validate_source(&[0u8; 16], 2, 2).is_ok());
        assert!(matches!(
            validate_source(&[0u8; 15], 2, 2),
            Err(EngineError::SourceSizeMismatch { expected: 16, .. })
        ));
    }

    #[test]
    fn test_dither_once_scalar() {
        let backends = BackendSet::scalar_only();
        let source: Vec<u8> = (0..64).flat_map(|i| [i as u8 * 4, i as u8 * 4, i as u8 * 4, 255]).collect();
        let image = dither_once(
            &backends,
            &source,
            8,
            8,
            &RenderOptions::new(Algorithm::ordered()),
        )
        .expect("scalar render succeeds");
        assert_eq!(image.width(), 8);
        assert!(image
            .pixels()
            .chunks_exact(4)
            .all(|px| px[0] == 0 || px[0] == 255));
    }

    #[test]
    fn test_dither_once_rejects_bad_buffer() {
        let backends = BackendSet::scalar_only();
        let err = dither_once(&backends, &[0u8; 5], 8, 8, &RenderOptions::default());
        assert!(matches!(err, Err(EngineError::SourceSizeMismatch { .. })));
    }

    #[test]
    fn test_job_handle_cancel_flag() {
        let handle = JobHandle::new();
        assert!(!handle.is_cancelled());
        handle.cancel();
        assert!(handle.is_cancelled());
    }
}
