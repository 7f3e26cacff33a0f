//! Structured pattern matrices: dots, lines, crosses, diamonds, waves,
//! bricks and a checkerboard fallback.
//!
//! Each pattern is a pure geometric function of `(x, y, size)` returning a
//! normalized distance-like scalar. No iteration, O(size^2) per tile.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use super::ThresholdMatrix;

/// The available structured pattern shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Radial distance from the cell center.
    Dots,
    /// Horizontal line ramp.
    Lines,
    /// Minimum distance to the cell's center axes.
    Crosses,
    /// Manhattan distance from the cell center.
    Diamonds,
    /// Diagonal sine wave.
    Waves,
    /// Running-bond brick edges.
    Bricks,
    /// Two-level checkerboard.
    Checker,
}

/// Generate a structured pattern threshold matrix.
///
/// `size` is clamped to at least 1.
pub fn pattern_matrix(kind: PatternKind, size: usize) -> ThresholdMatrix {
    let size = size.max(1);
    match kind {
        PatternKind::Dots => dots(size),
        PatternKind::Lines => lines(size),
        PatternKind::Crosses => crosses(size),
        PatternKind::Diamonds => diamonds(size),
        PatternKind::Waves => waves(size),
        PatternKind::Bricks => bricks(size),
        PatternKind::Checker => checker(size),
    }
}

fn generate(size: usize, f: impl Fn(usize, usize) -> f32) -> ThresholdMatrix {
    let mut values = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            values.push(f(x, y).clamp(0.0, 1.0));
        }
    }
    ThresholdMatrix::new(size, values)
}

fn dots(size: usize) -> ThresholdMatrix {
    let size_f = size as f32;
    generate(size, |x, y| {
        let dx = (x as f32 + 0.5) / size_f - 0.5;
        let dy = (y as f32 + 0.5) / size_f - 0.5;
        (dx * dx + dy * dy).sqrt() * 2.0
    })
}

fn lines(size: usize) -> ThresholdMatrix {
    let size_f = size as f32;
    generate(size, |_, y| y as f32 / size_f)
}

fn crosses(size: usize) -> ThresholdMatrix {
    let size_f = size as f32;
    generate(size, |x, y| {
        let dist_h = ((y as f32 + 0.5) / size_f - 0.5).abs() * 2.0;
        let dist_v = ((x as f32 + 0.5) / size_f - 0.5).abs() * 2.0;
        dist_h.min(dist_v)
    })
}

fn diamonds(size: usize) -> ThresholdMatrix {
    let size_f = size as f32;
    generate(size, |x, y| {
        let dx = ((x as f32 + 0.5) / size_f - 0.5).abs();
        let dy = ((y as f32 + 0.5) / size_f - 0.5).abs();
        (dx + dy) * 2.0
    })
}

fn waves(size: usize) -> ThresholdMatrix {
    let size_f = size as f32;
    generate(size, |x, y| {
        let t = (x as f32 + y as f32) / size_f;
        (t * PI * 2.0).sin() * 0.5 + 0.5
    })
}

fn bricks(size: usize) -> ThresholdMatrix {
    let size_f = size as f32;
    let brick_height = ((size_f / 3.0).floor().max(2.0)) as usize;
    let brick_height_f = brick_height as f32;
    let half_width = (size_f / 2.0).floor().max(1.0) as usize;
    let half_width_f = half_width as f32;
    // Edge sensitivity scale: higher values near mortar lines
    let edge_scale = (size_f / 10.0).max(1.0);

    generate(size, |x, y| {
        let row = y / brick_height;
        let offset = (row % 2) * half_width;
        let adjusted_x = (x + offset) % size;
        let brick_x_start = (adjusted_x as f32 / half_width_f).floor() * half_width_f;

        let dist_x1 = (adjusted_x as f32 - brick_x_start).abs();
        let dist_x2 = (adjusted_x as f32 - (brick_x_start + half_width_f - 1.0)).abs();
        let edge_dist_x = dist_x1.min(dist_x2);

        let brick_y_start = (y as f32 / brick_height_f).floor() * brick_height_f;
        let dist_y1 = (y as f32 - brick_y_start).abs();
        let dist_y2 = (y as f32 - (brick_y_start + brick_height_f - 1.0)).abs();
        let edge_dist_y = dist_y1.min(dist_y2);

        1.0 - edge_dist_x.min(edge_dist_y) / edge_scale
    })
}

fn checker(size: usize) -> ThresholdMatrix {
    generate(size, |x, y| if (x + y) % 2 == 0 { 0.25 } else { 0.75 })
}
