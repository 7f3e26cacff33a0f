//! Void-and-cluster rank matrix construction.

use rand::Rng;

use super::ThresholdMatrix;

/// Gaussian neighborhood radius used for density estimation.
const DENSITY_RADIUS: i32 = 2;

/// Generate a void-and-cluster threshold matrix.
///
/// Construction (Ulichney's formulation):
///
/// 1. Seed a roughly 50%-filled random binary pattern.
/// 2. Rank the seed's 1-cells downward: repeatedly remove the *tightest
///    cluster* (the 1-cell with maximal Gaussian-weighted neighbor density),
///    assigning ranks `ones-1` down to `0`.
/// 3. Restore the seed and rank upward: repeatedly fill the *largest void*
///    (the 0-cell with minimal density), assigning ranks `ones` up to
///    `size^2 - 1`.
///
/// Every cell receives exactly one unique rank; ranks normalize to `[0, 1]`.
/// The seed is random, so the matrix differs between calls — determinism is
/// not required, only rank uniqueness.
pub fn void_and_cluster_matrix(size: usize) -> ThresholdMatrix {
    let size = size.max(2);
    let total = size * size;
    let weights = gaussian_weights(DENSITY_RADIUS);

    // ~50% random seed
    let mut rng = rand::thread_rng();
    let target_ones = total / 2;
    let mut seed = vec![0u8; total];
    let mut ones_placed = 0;
    while ones_placed < target_ones {
        let idx = rng.gen_range(0..total);
        if seed[idx] == 0 {
            seed[idx] = 1;
            ones_placed += 1;
        }
    }

    let mut ranks = vec![0usize; total];

    // Phase 1: remove tightest clusters from a copy of the seed,
    // ranking ones-1 down to 0.
    let mut pattern = seed.clone();
    let mut remaining = ones_placed;
    while remaining > 0 {
        let idx = extreme_density_cell(&pattern, size, &weights, 1);
        remaining -= 1;
        ranks[idx] = remaining;
        pattern[idx] = 0;
    }

    // Phase 2: fill largest voids in the original seed,
    // ranking ones up to total-1.
    let mut pattern = seed;
    let mut next_rank = ones_placed;
    while next_rank < total {
        let idx = extreme_density_cell(&pattern, size, &weights, 0);
        ranks[idx] = next_rank;
        pattern[idx] = 1;
        next_rank += 1;
    }

    let max = (total - 1).max(1) as f32;
    ThresholdMatrix::new(size, ranks.into_iter().map(|r| r as f32 / max).collect())
}

/// Find the cell of the given state with extreme density: maximal for
/// 1-cells (tightest cluster), minimal for 0-cells (largest void).
fn extreme_density_cell(pattern: &[u8], size: usize, weights: &[f32], state: u8) -> usize {
    let mut best_idx = 0;
    let mut best_density = if state == 1 { f32::MIN } else { f32::MAX };

    for y in 0..size {
        for x in 0..size {
            let idx = y * size + x;
            if pattern[idx] != state {
                continue;
            }
            let d = density_at(pattern, size, x, y, weights);
            let better = if state == 1 {
                d > best_density
            } else {
                d < best_density
            };
            if better {
                best_density = d;
                best_idx = idx;
            }
        }
    }
    best_idx
}

/// Gaussian-weighted density of 1-cells around `(x, y)`, toroidal wrap.
fn density_at(pattern: &[u8], size: usize, x: usize, y: usize, weights: &[f32]) -> f32 {
    let diameter = (DENSITY_RADIUS * 2 + 1) as usize;
    let mut sum = 0.0;
    for dy in -DENSITY_RADIUS..=DENSITY_RADIUS {
        for dx in -DENSITY_RADIUS..=DENSITY_RADIUS {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = (x as i32 + dx).rem_euclid(size as i32) as usize;
            let ny = (y as i32 + dy).rem_euclid(size as i32) as usize;
            let w = weights
                [(dy + DENSITY_RADIUS) as usize * diameter + (dx + DENSITY_RADIUS) as usize];
            sum += f32::from(pattern[ny * size + nx]) * w;
        }
    }
    sum
}

/// Precompute the Gaussian weight window (center excluded).
fn gaussian_weights(radius: i32) -> Vec<f32> {
    let diameter = (radius * 2 + 1) as usize;
    let variance = (radius * radius) as f32;
    let mut weights = vec![0.0f32; diameter * diameter];

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx == 0 && dy == 0 {
                continue;
            }
            let dist_sq = (dx * dx + dy * dy) as f32;
            weights[(dy + radius) as usize * diameter + (dx + radius) as usize] =
                (-dist_sq / (2.0 * variance)).exp();
        }
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_rank_unique() {
        let size = 16;
        let m = void_and_cluster_matrix(size);
        let max = (size * size - 1) as f32;

        // Recover integer ranks and verify the permutation property
        let mut ranks: Vec<usize> = m
            .values()
            .iter()
            .map(|&v| (v * max).round() as usize)
            .collect();
        ranks.sort_unstable();
        let expected: Vec<usize> = (0..size * size).collect();
        assert_eq!(ranks, expected, "every cell must receive a unique rank");
    }

    #[test]
    fn test_values_normalized() {
        let m = void_and_cluster_matrix(8);
        for &v in m.values() {
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
