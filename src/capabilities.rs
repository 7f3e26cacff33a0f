//! Device capability detection.
//!
//! The scheduler never inspects the platform directly; it depends on the
//! [`Capabilities`] trait, and [`DeviceProfile`] is the real implementation
//! probed once per process. Tests substitute fixed profiles to exercise
//! the sizing heuristics deterministically.

use std::sync::OnceLock;

use tracing::debug;

/// Logical core count at or above which a device counts as high-end.
const HIGH_END_CORES: usize = 8;

/// Conservative texture limit used when no GPU adapter is present.
const FALLBACK_MAX_TEXTURE_DIM: u32 = 4096;

/// What the scheduler is allowed to know about the machine.
pub trait Capabilities {
    /// Logical core count.
    fn logical_cores(&self) -> usize;

    /// Whether the device classifies as high-end (many cores).
    fn is_high_end(&self) -> bool;

    /// Whether a usable GPU adapter was found.
    fn gpu_available(&self) -> bool;

    /// Largest 2D texture dimension the GPU accepts. Meaningful only when
    /// [`gpu_available`](Capabilities::gpu_available) is true.
    fn max_texture_dim(&self) -> u32;
}

/// The probed capabilities of this machine.
///
/// Computed once per process by [`DeviceProfile::detect`] and never
/// mutated afterwards, so it is safe to share freely.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    pub logical_cores: usize,
    pub high_end: bool,
    pub gpu_available: bool,
    pub max_texture_dim: u32,
}

impl DeviceProfile {
    /// The process-wide profile, probed on first use.
    pub fn detect() -> &'static DeviceProfile {
        static PROFILE: OnceLock<DeviceProfile> = OnceLock::new();
        PROFILE.get_or_init(|| {
            let profile = Self::probe();
            debug!(
                cores = profile.logical_cores,
                high_end = profile.high_end,
                gpu = profile.gpu_available,
                max_texture = profile.max_texture_dim,
                "device capabilities probed"
            );
            profile
        })
    }

    /// Probe the machine. Exposed separately so callers that want a fresh
    /// (non-cached) reading can take one.
    pub fn probe() -> DeviceProfile {
        let logical_cores = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1);

        let (gpu_available, max_texture_dim) = probe_gpu();

        DeviceProfile {
            logical_cores,
            high_end: logical_cores >= HIGH_END_CORES,
            gpu_available,
            max_texture_dim,
        }
    }

    /// A fixed profile for tests and forced configurations.
    pub fn fixed(logical_cores: usize, gpu_available: bool, max_texture_dim: u32) -> Self {
        DeviceProfile {
            logical_cores,
            high_end: logical_cores >= HIGH_END_CORES,
            gpu_available,
            max_texture_dim,
        }
    }
}

/// Ask wgpu for an adapter; absence routes GPU work to lower tiers
/// without ever surfacing an error.
fn probe_gpu() -> (bool, u32) {
    let instance = wgpu::Instance::default();
    match pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default())) {
        Some(adapter) => {
            let limits = adapter.limits();
            (true, limits.max_texture_dimension_2d)
        }
        None => (false, FALLBACK_MAX_TEXTURE_DIM),
    }
}

impl Capabilities for DeviceProfile {
    fn logical_cores(&self) -> usize {
        self.logical_cores
    }

    fn is_high_end(&self) -> bool {
        self.high_end
    }

    fn gpu_available(&self) -> bool {
        self.gpu_available
    }

    fn max_texture_dim(&self) -> u32 {
        self.max_texture_dim
    }
}
