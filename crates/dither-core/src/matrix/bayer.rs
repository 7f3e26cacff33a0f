//! Recursive Bayer matrix construction.

use super::ThresholdMatrix;

/// The unnormalized Bayer ranks for a power-of-two side length.
///
/// Base case is the canonical 2x2 tile:
///
/// ```text
///    0  2
///    3  1
/// ```
///
/// Each doubling step quadruples the matrix with the standard
/// `4 * sub + offset` rule, where the quadrant offsets are the base tile
/// itself (top-left +0, top-right +2, bottom-left +3, bottom-right +1).
/// The result is a permutation: every integer in `[0, n^2)` appears exactly
/// once, which is what guarantees maximal dispersion.
pub(crate) fn bayer_ranks(n: usize) -> Vec<u32> {
    debug_assert!(n.is_power_of_two() && n >= 2, "side must be a power of two >= 2");

    let mut size = 2usize;
    let mut ranks: Vec<u32> = vec![0, 2, 3, 1];

    while size < n {
        let next = size * 2;
        let mut grown = vec![0u32; next * next];
        for y in 0..size {
            for x in 0..size {
                let v = 4 * ranks[y * size + x];
                grown[y * next + x] = v;
                grown[y * next + x + size] = v + 2;
                grown[(y + size) * next + x] = v + 3;
                grown[(y + size) * next + x + size] = v + 1;
            }
        }
        ranks = grown;
        size = next;
    }
    ranks
}

/// Generate a normalized Bayer threshold matrix.
///
/// `n` is rounded up to the next power of two (minimum 2). Rank values are
/// normalized by `n^2 - 1` so the tile spans `[0, 1]` inclusive.
pub fn bayer_matrix(n: usize) -> ThresholdMatrix {
    let n = n.max(2).next_power_of_two();
    let ranks = bayer_ranks(n);
    let max = (n * n - 1) as f32;
    ThresholdMatrix::new(n, ranks.into_iter().map(|r| r as f32 / max).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_case() {
        assert_eq!(bayer_ranks(2), vec![0, 2, 3, 1]);
    }

    #[test]
    fn test_canonical_4x4() {
        // The textbook 4x4 dispersed-dot matrix
        #[rustfmt::skip]
        let expected = vec![
             0,  8,  2, 10,
            12,  4, 14,  6,
             3, 11,  1,  9,
            15,  7, 13,  5,
        ];
        assert_eq!(bayer_ranks(4), expected);
    }

    #[test]
    fn test_permutation_invariant() {
        // Every integer in [0, n^2) appears exactly once before normalization
        for n in [2usize, 4, 8, 16] {
            let mut ranks = bayer_ranks(n);
            ranks.sort_unstable();
            let expected: Vec<u32> = (0..(n * n) as u32).collect();
            assert_eq!(ranks, expected, "bayer({}) must be a permutation", n);
        }
    }

    #[test]
    fn test_normalization_range() {
        let m = bayer_matrix(8);
        assert_eq!(m.size(), 8);
        let min = m.values().iter().cloned().fold(f32::MAX, f32::min);
        let max = m.values().iter().cloned().fold(f32::MIN, f32::max);
        assert_eq!(min, 0.0);
        assert_eq!(max, 1.0);
    }

    #[test]
    fn test_non_power_of_two_rounds_up() {
        assert_eq!(bayer_matrix(3).size(), 4);
        assert_eq!(bayer_matrix(1).size(), 2);
    }
}
