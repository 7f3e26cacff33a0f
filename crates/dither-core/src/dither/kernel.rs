//! Error diffusion kernel definitions and the shared diffusion loop.
//!
//! Each kernel specifies how the quantization error of a pixel is
//! distributed to neighbors that have not been processed yet. Every
//! algorithm in the error-diffusion family is the same loop parameterized
//! by one of these tables.

use crate::intensity::gray_to_rgba;

/// An error diffusion kernel.
///
/// Entries are `(dx, dy, weight)` where `dy >= 0` (error only flows to the
/// current and following rows) and each neighbor receives
/// `error * weight / divisor`.
///
/// Most kernels distribute the full error (`sum(weights) == divisor`);
/// Atkinson distributes 6/8 — the remaining quarter is dropped, which is
/// the defining characteristic of that algorithm.
#[derive(Debug, Clone, Copy)]
pub struct DiffusionKernel {
    /// `(dx, dy, weight)` neighbor entries.
    pub entries: &'static [(i32, i32, u8)],
    /// Divisor normalizing the weights.
    pub divisor: u8,
}

impl DiffusionKernel {
    /// Sum of the weight numerators.
    pub fn weight_sum(&self) -> u32 {
        self.entries.iter().map(|&(_, _, w)| u32::from(w)).sum()
    }
}

/// Floyd-Steinberg: 4 neighbors, full propagation.
///
/// ```text
///        X   7
///    3   5   1      (/16)
/// ```
pub const FLOYD_STEINBERG: DiffusionKernel = DiffusionKernel {
    entries: &[(1, 0, 7), (-1, 1, 3), (0, 1, 5), (1, 1, 1)],
    divisor: 16,
};

/// Atkinson: 6 neighbors, 75% propagation.
///
/// ```text
///        X   1   1
///    1   1   1
///        1          (/8)
/// ```
pub const ATKINSON: DiffusionKernel = DiffusionKernel {
    entries: &[(1, 0, 1), (2, 0, 1), (-1, 1, 1), (0, 1, 1), (1, 1, 1), (0, 2, 1)],
    divisor: 8,
};

/// Jarvis-Judice-Ninke: 12 neighbors over 3 rows, full propagation.
///
/// ```text
///            X   7   5
///    3   5   7   5   3
///    1   3   5   3   1      (/48)
/// ```
pub const JARVIS_JUDICE_NINKE: DiffusionKernel = DiffusionKernel {
    entries: &[
        (1, 0, 7),
        (2, 0, 5),
        (-2, 1, 3),
        (-1, 1, 5),
        (0, 1, 7),
        (1, 1, 5),
        (2, 1, 3),
        (-2, 2, 1),
        (-1, 2, 3),
        (0, 2, 5),
        (1, 2, 3),
        (2, 2, 1),
    ],
    divisor: 48,
};

/// Stucki: 12 neighbors over 3 rows, full propagation. Sharper center
/// weights than JJN.
///
/// ```text
///            X   8   4
///    2   4   8   4   2
///    1   2   4   2   1      (/42)
/// ```
pub const STUCKI: DiffusionKernel = DiffusionKernel {
    entries: &[
        (1, 0, 8),
        (2, 0, 4),
        (-2, 1, 2),
        (-1, 1, 4),
        (0, 1, 8),
        (1, 1, 4),
        (2, 1, 2),
        (-2, 2, 1),
        (-1, 2, 2),
        (0, 2, 4),
        (1, 2, 2),
        (2, 2, 1),
    ],
    divisor: 42,
};

/// Burkes: 7 neighbors over 2 rows, full propagation. A two-row Stucki.
///
/// ```text
///            X   8   4
///    2   4   8   4   2      (/32)
/// ```
pub const BURKES: DiffusionKernel = DiffusionKernel {
    entries: &[
        (1, 0, 8),
        (2, 0, 4),
        (-2, 1, 2),
        (-1, 1, 4),
        (0, 1, 8),
        (1, 1, 4),
        (2, 1, 2),
    ],
    divisor: 32,
};

/// Sierra Lite: 3 neighbors, full propagation. The minimal kernel.
///
/// ```text
///    X   2
///  1   1            (/4)
/// ```
pub const SIERRA_LITE: DiffusionKernel = DiffusionKernel {
    entries: &[(1, 0, 2), (-1, 1, 1), (0, 1, 1)],
    divisor: 4,
};

/// The shared error diffusion loop.
///
/// Scans row-major (left-to-right, top-to-bottom) over a private `f32`
/// working copy of the intensity buffer; the caller's buffer is never
/// touched. Each pixel thresholds its *current* (already perturbed) value
/// to 0/255, and the kernel distributes `old - new` to in-bounds neighbors.
/// Out-of-bounds targets are skipped, never wrapped.
pub(crate) fn diffuse(
    gray: &[u8],
    width: usize,
    height: usize,
    threshold: u8,
    kernel: &DiffusionKernel,
) -> Vec<u8> {
    let mut buffer: Vec<f32> = gray.iter().map(|&v| f32::from(v)).collect();
    let mut out = vec![0u8; width * height];
    let threshold = f32::from(threshold);
    let divisor = f32::from(kernel.divisor);

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let old = buffer[idx];
            let new = if old < threshold { 0.0 } else { 255.0 };
            let error = old - new;
            out[idx] = new as u8;

            for &(dx, dy, weight) in kernel.entries {
                let nx = x as i64 + i64::from(dx);
                let ny = y as i64 + i64::from(dy);
                if nx < 0 || nx >= width as i64 || ny >= height as i64 {
                    continue;
                }
                buffer[ny as usize * width + nx as usize] +=
                    error * f32::from(weight) / divisor;
            }
        }
    }

    gray_to_rgba(&out)
}
