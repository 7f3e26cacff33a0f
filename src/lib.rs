//! ditherlab - progressive dithering engine
//!
//! Renders decoded RGBA buffers into binary or reduced-palette output
//! using the [`dither_core`] algorithm library, scheduling the work across
//! whichever execution backend is available:
//!
//! - a GPU compute tier for the position-dependent algorithm families,
//! - a compiled numeric module tier loaded at runtime,
//! - the reference scalar tier, always present.
//!
//! Work is split into horizontal chunks and driven either as one
//! synchronous batch (small images) or cooperatively, yielding to the
//! async runtime between chunks so a host UI stays responsive. Backends
//! that fail mid-job downgrade monotonically toward the scalar tier; a
//! failure is visible to the caller only when the last tier fails too.
//!
//! # Entry points
//!
//! [`dither_once`] renders synchronously in one shot; [`dither_progressively`]
//! returns a [`JobHandle`] plus a stream of [`RenderEvent`]s.
//!
//! ```no_run
//! use std::sync::Arc;
//! use ditherlab::{dither_progressively, BackendSet, ProgressiveOptions, RenderEvent};
//! use dither_core::{Algorithm, RenderOptions};
//! use tokio_stream::StreamExt;
//!
//! # async fn demo(source: Vec<u8>) {
//! let backends = Arc::new(BackendSet::detect(None));
//! let options = ProgressiveOptions::new(
//!     source,
//!     1920,
//!     1080,
//!     RenderOptions::new(Algorithm::floyd_steinberg()),
//! );
//! let (_handle, mut events) = dither_progressively(backends, options);
//! while let Some(event) = events.next().await {
//!     match event {
//!         Ok(RenderEvent::Progress { percent, .. }) => eprintln!("{percent}%"),
//!         Ok(RenderEvent::Complete(image)) => eprintln!("done: {}x{}", image.width(), image.height()),
//!         Err(err) => eprintln!("failed: {err}"),
//!     }
//! }
//! # }
//! ```

pub mod backend;
pub mod capabilities;
pub mod error;
pub mod progressive;

pub use backend::{BackendSet, ChunkBackend, ChunkInput, GpuBackend, ModuleBackend, ModuleConfig, ScalarBackend, Tier};
pub use capabilities::{Capabilities, DeviceProfile};
pub use error::{BackendError, EngineError, ModuleError};
pub use progressive::{
    dither_batch, dither_once, dither_progressively, dither_progressively_with, BatchEvent,
    EventStream, ExecutionMode, JobHandle, ProgressiveOptions, RenderEvent,
};

// Re-export the algorithm library types callers configure jobs with.
pub use dither_core::{
    Adjustments, Algorithm, ColorMode, DitheredImage, MaskRegion, MaskShape, MultiToneVariant,
    PaletteColor, PatternKind, RenderOptions,
};
