//! Execution backends.
//!
//! Three interchangeable tiers implement [`ChunkBackend`]:
//!
//! - [`GpuBackend`]: compute-shader execution of the position-dependent
//!   algorithm families (ordered, halftone, pattern).
//! - [`ModuleBackend`]: a compiled numeric module loaded at runtime,
//!   exposing one entry point per supported algorithm behind a strict
//!   allocate/invoke/free contract.
//! - [`ScalarBackend`]: the full reference algorithm library; supports
//!   everything and is the universal fallback.
//!
//! A [`BackendSet`] holds the tiers in preference order. The scheduler asks
//! it which tier should start a job and walks downward on failure — never
//! upward, so a failed tier is not retried within a job.

mod gpu;
mod module;
mod scalar;

pub use gpu::GpuBackend;
pub use module::{ModuleBackend, ModuleConfig};
pub use scalar::ScalarBackend;

use std::fmt;
use std::sync::Arc;

use dither_core::{Algorithm, ColorMode, RenderOptions};
use tracing::info;

use crate::error::BackendError;

/// Pixel count above which the GPU tier is preferred for its algorithms.
const GPU_PREFERRED_PIXELS: usize = 1_000_000;

/// Identity of an execution tier, ordered from most to least capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Gpu,
    Module,
    Scalar,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Gpu => write!(f, "gpu"),
            Tier::Module => write!(f, "module"),
            Tier::Scalar => write!(f, "scalar"),
        }
    }
}

/// One horizontal slice of work handed to a backend.
///
/// `rgba` and `gray` cover the same rows of the (already adjusted) source;
/// backends pick whichever representation they consume. Both are read-only:
/// a backend returns a fresh RGBA buffer for its rows.
pub struct ChunkInput<'a> {
    /// Adjusted RGBA source rows.
    pub rgba: &'a [u8],
    /// Grayscale rendition of the same rows.
    pub gray: &'a [u8],
    /// Image width.
    pub width: usize,
    /// Rows in this chunk.
    pub height: usize,
    /// The render options for the whole job.
    pub options: &'a RenderOptions,
}

/// An execution tier able to process chunks.
pub trait ChunkBackend: Send + Sync {
    /// Which tier this backend represents.
    fn tier(&self) -> Tier;

    /// Whether this backend can run the algorithm/color-mode combination.
    /// Unsupported combinations are a routing signal, not an error.
    fn supports(&self, algorithm: &Algorithm, color_mode: &ColorMode) -> bool;

    /// Process one chunk, returning RGBA bytes for exactly
    /// `width * height * 4`.
    fn process_chunk(&self, input: &ChunkInput<'_>) -> Result<Vec<u8>, BackendError>;
}

/// The ordered collection of available tiers.
#[derive(Clone)]
pub struct BackendSet {
    backends: Vec<Arc<dyn ChunkBackend>>,
    module: Option<Arc<ModuleBackend>>,
}

impl BackendSet {
    /// Build a set from explicitly ordered backends (highest preference
    /// first). Intended for tests and embedders with custom tiers; most
    /// callers want [`BackendSet::detect`].
    pub fn new(backends: Vec<Arc<dyn ChunkBackend>>) -> Self {
        Self {
            backends,
            module: None,
        }
    }

    /// Probe the machine and assemble every available tier.
    ///
    /// The GPU tier joins the set only when an adapter is found; the module
    /// tier joins whenever a configuration is supplied (its artifact loads
    /// lazily); the scalar tier is always present.
    pub fn detect(module_config: Option<ModuleConfig>) -> Self {
        let mut backends: Vec<Arc<dyn ChunkBackend>> = Vec::new();

        match GpuBackend::probe() {
            Ok(gpu) => {
                info!("gpu backend available");
                backends.push(Arc::new(gpu));
            }
            Err(err) => {
                info!("gpu backend unavailable: {err}");
            }
        }

        let module = module_config.map(|config| Arc::new(ModuleBackend::new(config)));
        if let Some(module) = &module {
            backends.push(Arc::clone(module) as Arc<dyn ChunkBackend>);
        }

        backends.push(Arc::new(ScalarBackend));
        Self { backends, module }
    }

    /// A set containing only the reference tier.
    pub fn scalar_only() -> Self {
        Self {
            backends: vec![Arc::new(ScalarBackend)],
            module: None,
        }
    }

    /// The backends in preference order.
    pub fn backends(&self) -> &[Arc<dyn ChunkBackend>] {
        &self.backends
    }

    /// The module backend, if one is configured. The scheduler uses this to
    /// trigger the lazy artifact load before a job that would route to it.
    pub(crate) fn module_backend(&self) -> Option<&Arc<ModuleBackend>> {
        self.module.as_ref()
    }

    /// Index of the tier a new job should start on.
    ///
    /// GPU is preferred only for large images (its upload/readback overhead
    /// dominates small ones); every tier must also claim support for the
    /// algorithm/color-mode pair.
    pub(crate) fn select(
        &self,
        algorithm: &Algorithm,
        color_mode: &ColorMode,
        pixel_count: usize,
    ) -> Option<usize> {
        self.backends.iter().position(|backend| {
            if backend.tier() == Tier::Gpu && pixel_count <= GPU_PREFERRED_PIXELS {
                return false;
            }
            backend.supports(algorithm, color_mode)
        })
    }

    /// The next index at or after `from` that supports the work. Downgrades
    /// are monotonic: the scheduler only ever moves forward through the
    /// preference list.
    pub(crate) fn next_supporting(
        &self,
        from: usize,
        algorithm: &Algorithm,
        color_mode: &ColorMode,
    ) -> Option<usize> {
        (from..self.backends.len())
            .find(|&i| self.backends[i].supports(algorithm, color_mode))
    }
}
