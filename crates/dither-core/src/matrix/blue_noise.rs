//! Blue noise threshold field via best-candidate point placement.

use rand::Rng;

use super::ThresholdMatrix;

/// Candidates sampled per placed point. More candidates give a more even
/// distribution at the cost of generation time.
const CANDIDATES_PER_POINT: usize = 20;

/// Generate a tileable blue noise threshold field.
///
/// Mitchell's best-candidate algorithm places roughly `size^2 / 10` points,
/// each chosen as the candidate farthest (toroidally) from all existing
/// points. The field is the normalized distance to the nearest point, which
/// yields a dispersed-dot threshold tile without low-frequency clumping.
///
/// Generation is randomized; the field is intended to be generated once and
/// reused.
pub fn blue_noise_field(size: usize) -> ThresholdMatrix {
    let size = size.max(2);
    let size_f = size as f32;
    let mut rng = rand::thread_rng();

    let num_points = (size * size / 10).max(1);
    let mut points: Vec<(usize, usize)> = Vec::with_capacity(num_points);
    let mut occupied = vec![false; size * size];

    let first = (rng.gen_range(0..size), rng.gen_range(0..size));
    points.push(first);
    occupied[first.1 * size + first.0] = true;

    for _ in 1..num_points {
        let mut best: Option<(usize, usize)> = None;
        let mut best_dist_sq = 0.0f32;

        for _ in 0..CANDIDATES_PER_POINT {
            let cand = (rng.gen_range(0..size), rng.gen_range(0..size));
            if occupied[cand.1 * size + cand.0] {
                continue;
            }
            let dist_sq = nearest_point_dist_sq(cand, &points, size_f);
            if dist_sq > best_dist_sq {
                best_dist_sq = dist_sq;
                best = Some(cand);
            }
        }

        if let Some((bx, by)) = best {
            points.push((bx, by));
            occupied[by * size + bx] = true;
        }
    }

    // Distance field to the nearest point, then normalize to [0, 1].
    let mut field = vec![0.0f32; size * size];
    let mut max_dist = 0.0f32;
    for y in 0..size {
        for x in 0..size {
            let d = nearest_point_dist_sq((x, y), &points, size_f).sqrt();
            field[y * size + x] = d;
            max_dist = max_dist.max(d);
        }
    }
    if max_dist > 0.0 {
        for v in &mut field {
            *v /= max_dist;
        }
    }

    ThresholdMatrix::new(size, field)
}

/// Squared toroidal distance to the nearest placed point.
fn nearest_point_dist_sq(p: (usize, usize), points: &[(usize, usize)], size_f: f32) -> f32 {
    let mut min = f32::MAX;
    for &(px, py) in points {
        let dx = (p.0 as f32 - px as f32).abs();
        let dy = (p.1 as f32 - py as f32).abs();
        let tdx = dx.min(size_f - dx);
        let tdy = dy.min(size_f - dy);
        min = min.min(tdx * tdx + tdy * tdy);
    }
    min
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_normalized() {
        let field = blue_noise_field(16);
        assert_eq!(field.size(), 16);
        for &v in field.values() {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_field_reaches_extremes() {
        let field = blue_noise_field(32);
        let min = field.values().iter().cloned().fold(f32::MAX, f32::min);
        let max = field.values().iter().cloned().fold(f32::MIN, f32::max);
        assert_eq!(min, 0.0, "placed points sit at distance zero");
        assert_eq!(max, 1.0, "the farthest void normalizes to one");
    }

    #[test]
    fn test_tiny_size_clamped() {
        let field = blue_noise_field(0);
        assert_eq!(field.size(), 2);
    }
}
