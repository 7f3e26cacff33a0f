//! Direct binary search: iterative halftone optimization.

use rand::Rng;

use crate::intensity::gray_to_rgba;

/// Side length of the Gaussian HVS filter window.
const FILTER_SIZE: usize = 7;

/// Maximum optimization sweeps.
const MAX_ITERATIONS: usize = 15;

/// Stop when the relative error improvement of a sweep drops below this.
const MIN_IMPROVEMENT: f64 = 0.01;

/// Toggle candidates evaluated per sweep, capped for large images.
const MAX_CANDIDATES: usize = 10_000;

/// Direct binary search dithering.
///
/// Starts from a plain threshold pattern and iteratively proposes random
/// single-pixel toggles, accepting a toggle only if it strictly reduces the
/// total squared error between the Gaussian-filtered binary pattern and the
/// continuous target. The filter models the human visual system's low-pass
/// response, so accepted toggles trade pixel-level error for perceived
/// smoothness.
///
/// Each toggle only perturbs the filtered output inside the filter window
/// around the toggled pixel, so both the error delta and the state update
/// touch at most `FILTER_SIZE^2` cells. Total error never increases across
/// an accepted toggle.
pub fn direct_binary_search_dither(
    gray: &[u8],
    width: usize,
    height: usize,
    threshold: u8,
) -> Vec<u8> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let n = width * height;

    let target: Vec<f32> = gray.iter().map(|&v| f32::from(v)).collect();
    let mut binary: Vec<u8> = gray
        .iter()
        .map(|&v| u8::from(v >= threshold))
        .collect();

    let (filter, radius) = hvs_filter();

    // Filtered rendition of the initial pattern
    let mut filtered = vec![0.0f32; n];
    for y in 0..height {
        for x in 0..width {
            if binary[y * width + x] == 1 {
                apply_footprint(&mut filtered, width, height, x, y, &filter, radius, 255.0);
            }
        }
    }

    let mut total_error: f64 = target
        .iter()
        .zip(&filtered)
        .map(|(&t, &f)| f64::from((t - f) * (t - f)))
        .sum();

    let candidates = n.min(MAX_CANDIDATES);
    let mut rng = rand::thread_rng();

    for _ in 0..MAX_ITERATIONS {
        let error_before = total_error;
        let mut changes = 0usize;

        for _ in 0..candidates {
            let x = rng.gen_range(0..width);
            let y = rng.gen_range(0..height);
            let idx = y * width + x;
            let value_diff = if binary[idx] == 0 { 255.0 } else { -255.0 };

            let change = toggle_error_change(
                &target, &filtered, width, height, x, y, &filter, radius, value_diff,
            );
            if change < 0.0 {
                binary[idx] = 1 - binary[idx];
                apply_footprint(&mut filtered, width, height, x, y, &filter, radius, value_diff);
                total_error += change;
                changes += 1;
            }
        }

        if changes == 0 {
            break;
        }
        let improvement = (error_before - total_error) / error_before.max(f64::MIN_POSITIVE);
        if improvement < MIN_IMPROVEMENT {
            break;
        }
    }

    let out: Vec<u8> = binary.iter().map(|&b| b * 255).collect();
    gray_to_rgba(&out)
}

/// Normalized Gaussian filter window and its radius.
fn hvs_filter() -> (Vec<f32>, usize) {
    let radius = FILTER_SIZE / 2;
    let sigma = radius as f32 / 2.5;
    let mut filter = vec![0.0f32; FILTER_SIZE * FILTER_SIZE];
    let mut sum = 0.0;

    for y in 0..FILTER_SIZE {
        for x in 0..FILTER_SIZE {
            let dx = x as f32 - radius as f32;
            let dy = y as f32 - radius as f32;
            let w = (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
            filter[y * FILTER_SIZE + x] = w;
            sum += w;
        }
    }
    for w in &mut filter {
        *w /= sum;
    }
    (filter, radius)
}

/// Add `value_diff` scaled by the filter into the footprint around `(x, y)`.
#[allow(clippy::too_many_arguments)]
fn apply_footprint(
    filtered: &mut [f32],
    width: usize,
    height: usize,
    x: usize,
    y: usize,
    filter: &[f32],
    radius: usize,
    value_diff: f32,
) {
    for fy in 0..FILTER_SIZE {
        for fx in 0..FILTER_SIZE {
            let nx = x as i64 + fx as i64 - radius as i64;
            let ny = y as i64 + fy as i64 - radius as i64;
            if nx < 0 || nx >= width as i64 || ny < 0 || ny >= height as i64 {
                continue;
            }
            filtered[ny as usize * width + nx as usize] +=
                filter[fy * FILTER_SIZE + fx] * value_diff;
        }
    }
}

/// Change in total squared error if the pixel at `(x, y)` is toggled.
///
/// Expanding `(old_err - delta)^2 - old_err^2` gives
/// `-2 * old_err * delta + delta^2` per affected pixel, where `delta` is
/// the filter weight times the value change.
#[allow(clippy::too_many_arguments)]
fn toggle_error_change(
    target: &[f32],
    filtered: &[f32],
    width: usize,
    height: usize,
    x: usize,
    y: usize,
    filter: &[f32],
    radius: usize,
    value_diff: f32,
) -> f64 {
    let mut change = 0.0f64;
    for fy in 0..FILTER_SIZE {
        for fx in 0..FILTER_SIZE {
            let nx = x as i64 + fx as i64 - radius as i64;
            let ny = y as i64 + fy as i64 - radius as i64;
            if nx < 0 || nx >= width as i64 || ny < 0 || ny >= height as i64 {
                continue;
            }
            let idx = ny as usize * width + nx as usize;
            let delta = filter[fy * FILTER_SIZE + fx] * value_diff;
            let old_err = target[idx] - filtered[idx];
            change += f64::from(-2.0 * old_err * delta + delta * delta);
        }
    }
    change
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_output() {
        let gray: Vec<u8> = (0..256).map(|i| i as u8).collect();
        let rgba = direct_binary_search_dither(&gray, 16, 16, 128);
        assert_eq!(rgba.len(), 16 * 16 * 4);
        assert!(rgba.chunks_exact(4).all(|px| px[0] == 0 || px[0] == 255));
    }

    #[test]
    fn test_uniform_black_is_stable() {
        // A black target is already optimal: any toggle adds filtered
        // energy and increases the error, so none can be accepted.
        let gray = vec![0u8; 16 * 16];
        let rgba = direct_binary_search_dither(&gray, 16, 16, 128);
        assert!(rgba.chunks_exact(4).all(|px| px[0] == 0));
    }

    #[test]
    fn test_uniform_white_is_stable() {
        let gray = vec![255u8; 16 * 16];
        let rgba = direct_binary_search_dither(&gray, 16, 16, 128);
        assert!(rgba.chunks_exact(4).all(|px| px[0] == 255));
    }

    #[test]
    fn test_density_near_input_level() {
        let gray = vec![128u8; 32 * 32];
        let rgba = direct_binary_search_dither(&gray, 32, 32, 128);
        let white = rgba.chunks_exact(4).filter(|px| px[0] == 255).count();
        let ratio = white as f32 / (32.0 * 32.0);
        assert!(
            (ratio - 0.5).abs() < 0.2,
            "optimized mid gray should stay near 50% density, got {}",
            ratio
        );
    }

    #[test]
    fn test_filter_normalized() {
        let (filter, radius) = hvs_filter();
        assert_eq!(radius, 3);
        let sum: f32 = filter.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5, "filter must be normalized");
    }
}
