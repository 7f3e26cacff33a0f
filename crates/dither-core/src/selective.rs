//! Selective dithering: per-region algorithms composited through masks.
//!
//! A [`MaskRegion`] pairs a per-pixel coverage mask with an algorithm. The
//! compositor renders each region's algorithm over the full frame and
//! copies it wherever the mask is nonzero, in list order — the last region
//! wins on overlap. Pixels covered by no region receive the default
//! algorithm's result.
//!
//! Masks come from the geometric [`MaskShape`] generators (circle,
//! rectangle, polygon, each with optional feathered falloff), from
//! [`sobel_edges`], or from the caller directly. A malformed mask (wrong
//! length) contributes zero coverage instead of failing.

use serde::{Deserialize, Serialize};

use crate::dither::{dither, Algorithm};

/// One masked region and the algorithm applied inside it.
#[derive(Debug, Clone)]
pub struct MaskRegion {
    /// Per-pixel coverage, 0 = untouched, nonzero = covered. Length must be
    /// `width * height`; any other length is treated as zero coverage.
    pub mask: Vec<u8>,
    /// The algorithm rendered inside this region.
    pub algorithm: Algorithm,
}

impl MaskRegion {
    pub fn new(mask: Vec<u8>, algorithm: Algorithm) -> Self {
        Self { mask, algorithm }
    }

    /// Build a region by rasterizing a shape.
    pub fn from_shape(
        shape: &MaskShape,
        width: usize,
        height: usize,
        algorithm: Algorithm,
    ) -> Self {
        Self {
            mask: shape.rasterize(width, height),
            algorithm,
        }
    }
}

/// Geometric mask generators.
///
/// Coordinates and radii no greater than 1.0 are interpreted as normalized
/// fractions of the image dimensions; larger values are absolute pixels.
/// `feather` widens the edge into a linear falloff band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum MaskShape {
    Circle {
        center_x: f32,
        center_y: f32,
        radius: f32,
        feather: f32,
    },
    Rectangle {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        feather: f32,
    },
    Polygon {
        vertices: Vec<(f32, f32)>,
        feather: f32,
    },
}

/// Resolve a possibly-normalized coordinate against an absolute extent.
fn resolve(value: f32, extent: f32) -> f32 {
    if value <= 1.0 {
        (value * extent).floor()
    } else {
        value
    }
}

impl MaskShape {
    /// Rasterize the shape to a coverage mask.
    ///
    /// A polygon with fewer than three vertices has no interior and yields
    /// an all-zero mask.
    pub fn rasterize(&self, width: usize, height: usize) -> Vec<u8> {
        let mut mask = vec![0u8; width * height];
        let w = width as f32;
        let h = height as f32;

        match self {
            MaskShape::Circle {
                center_x,
                center_y,
                radius,
                feather,
            } => {
                let cx = resolve(*center_x, w);
                let cy = resolve(*center_y, h);
                let radius = resolve(*radius, w.min(h));
                let feather = resolve(*feather, radius).clamp(0.0, radius);

                for y in 0..height {
                    for x in 0..width {
                        let dx = x as f32 - cx;
                        let dy = y as f32 - cy;
                        let dist = (dx * dx + dy * dy).sqrt();
                        mask[y * width + x] = if dist <= radius - feather {
                            255
                        } else if dist <= radius && feather > 0.0 {
                            let falloff = 1.0 - (dist - (radius - feather)) / feather;
                            (falloff * 255.0) as u8
                        } else {
                            0
                        };
                    }
                }
            }
            MaskShape::Rectangle {
                x1,
                y1,
                x2,
                y2,
                feather,
            } => {
                let ax = resolve(*x1, w);
                let ay = resolve(*y1, h);
                let bx = resolve(*x2, w);
                let by = resolve(*y2, h);
                let (min_x, max_x) = (ax.min(bx), ax.max(bx));
                let (min_y, max_y) = (ay.min(by), ay.max(by));
                let feather = resolve(*feather, w.min(h)).max(0.0);

                for y in 0..height {
                    for x in 0..width {
                        let xf = x as f32;
                        let yf = y as f32;
                        // Distance to the rectangle (negative inside)
                        let dx = (min_x - xf).max(xf - max_x);
                        let dy = (min_y - yf).max(yf - max_y);
                        let dist = if dx > 0.0 && dy > 0.0 {
                            (dx * dx + dy * dy).sqrt()
                        } else {
                            dx.max(dy)
                        };
                        mask[y * width + x] = if dist <= 0.0 {
                            255
                        } else if dist <= feather {
                            ((1.0 - dist / feather) * 255.0) as u8
                        } else {
                            0
                        };
                    }
                }
            }
            MaskShape::Polygon { vertices, feather } => {
                if vertices.len() < 3 {
                    return mask;
                }
                let pixel_vertices: Vec<(f32, f32)> = vertices
                    .iter()
                    .map(|&(x, y)| (resolve(x, w), resolve(y, h)))
                    .collect();
                let feather = resolve(*feather, w.min(h)).max(0.0);

                for y in 0..height {
                    for x in 0..width {
                        let p = (x as f32, y as f32);
                        let inside = point_in_polygon(p, &pixel_vertices);
                        mask[y * width + x] = if feather == 0.0 {
                            if inside {
                                255
                            } else {
                                0
                            }
                        } else {
                            let signed = if inside {
                                edge_distance(p, &pixel_vertices)
                            } else {
                                -edge_distance(p, &pixel_vertices)
                            };
                            if signed >= feather {
                                255
                            } else if signed <= -feather {
                                0
                            } else {
                                let falloff = 0.5 + signed / (2.0 * feather);
                                (falloff.clamp(0.0, 1.0) * 255.0) as u8
                            }
                        };
                    }
                }
            }
        }
        mask
    }
}

/// Ray-casting point-in-polygon test.
fn point_in_polygon(p: (f32, f32), vertices: &[(f32, f32)]) -> bool {
    let (x, y) = p;
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = vertices[i];
        let (xj, yj) = vertices[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Distance from a point to the nearest polygon edge segment.
fn edge_distance(p: (f32, f32), vertices: &[(f32, f32)]) -> f32 {
    let (x, y) = p;
    let mut min_dist = f32::MAX;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (x1, y1) = vertices[i];
        let (x2, y2) = vertices[j];
        let seg_len_sq = (x2 - x1).powi(2) + (y2 - y1).powi(2);
        let dist = if seg_len_sq == 0.0 {
            ((x - x1).powi(2) + (y - y1).powi(2)).sqrt()
        } else {
            let t = (((x - x1) * (x2 - x1) + (y - y1) * (y2 - y1)) / seg_len_sq).clamp(0.0, 1.0);
            let px = x1 + t * (x2 - x1);
            let py = y1 + t * (y2 - y1);
            ((x - px).powi(2) + (y - py).powi(2)).sqrt()
        };
        min_dist = min_dist.min(dist);
        j = i;
    }
    min_dist
}

/// Apply distinct algorithms to masked regions of one intensity buffer.
///
/// Regions composite in list order with the last region winning overlaps;
/// uncovered pixels fall through to `default_algorithm`. Each region's
/// algorithm renders the full frame, so error-diffusing algorithms see the
/// complete image and masking only selects which result reaches the output.
pub fn selective_dither(
    gray: &[u8],
    width: usize,
    height: usize,
    regions: &[MaskRegion],
    default_algorithm: &Algorithm,
) -> Vec<u8> {
    let size = width * height;
    let mut out = vec![0u8; size * 4];
    let mut covered = vec![false; size];

    for region in regions {
        // Malformed masks contribute nothing
        if region.mask.len() != size {
            continue;
        }
        let rendered = dither(gray, width, height, &region.algorithm);
        for (i, &coverage) in region.mask.iter().enumerate() {
            if coverage > 0 {
                out[i * 4..i * 4 + 4].copy_from_slice(&rendered[i * 4..i * 4 + 4]);
                covered[i] = true;
            }
        }
    }

    let default_rendered = dither(gray, width, height, default_algorithm);
    for (i, &done) in covered.iter().enumerate() {
        if !done {
            out[i * 4..i * 4 + 4].copy_from_slice(&default_rendered[i * 4..i * 4 + 4]);
        }
    }
    out
}

/// Sobel edge detection.
///
/// Returns a per-pixel edge mask: 255 where the gradient magnitude meets
/// `threshold`, 0 elsewhere. Useful for suggesting selective regions
/// around image structure.
pub fn sobel_edges(gray: &[u8], width: usize, height: usize, threshold: u8) -> Vec<u8> {
    let mut edges = vec![0u8; width * height];
    if width < 3 || height < 3 {
        return edges;
    }

    let threshold = f32::from(threshold);
    let at = |x: usize, y: usize| f32::from(gray[y * width + x]);

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let gx = -at(x - 1, y - 1) + at(x + 1, y - 1) - 2.0 * at(x - 1, y)
                + 2.0 * at(x + 1, y)
                - at(x - 1, y + 1)
                + at(x + 1, y + 1);
            let gy = -at(x - 1, y - 1) - 2.0 * at(x, y - 1) - at(x + 1, y - 1)
                + at(x - 1, y + 1)
                + 2.0 * at(x, y + 1)
                + at(x + 1, y + 1);
            let magnitude = (gx * gx + gy * gy).sqrt();
            if magnitude >= threshold {
                edges[y * width + x] = 255;
            }
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::PatternKind;

    #[test]
    fn test_last_region_wins_on_overlap() {
        // Two full-coverage regions: every pixel must equal the second
        // region's standalone result, not the first's.
        let gray: Vec<u8> = (0..64).map(|i| (i * 4) as u8).collect();
        let full = vec![255u8; 64];

        let r1 = MaskRegion::new(full.clone(), Algorithm::ordered());
        let r2 = MaskRegion::new(full, Algorithm::pattern(PatternKind::Lines));

        let out = selective_dither(&gray, 8, 8, &[r1, r2], &Algorithm::ordered());
        let standalone = dither(&gray, 8, 8, &Algorithm::pattern(PatternKind::Lines));
        assert_eq!(out, standalone, "the later region must win everywhere");
    }

    #[test]
    fn test_uncovered_pixels_use_default() {
        let gray = vec![128u8; 64];
        // Region covering only the top half
        let mut mask = vec![0u8; 64];
        mask[..32].fill(255);

        let region = MaskRegion::new(mask, Algorithm::pattern(PatternKind::Lines));
        let out = selective_dither(&gray, 8, 8, &[region], &Algorithm::ordered());

        let region_result = dither(&gray, 8, 8, &Algorithm::pattern(PatternKind::Lines));
        let default_result = dither(&gray, 8, 8, &Algorithm::ordered());
        assert_eq!(&out[..32 * 4], &region_result[..32 * 4]);
        assert_eq!(&out[32 * 4..], &default_result[32 * 4..]);
    }

    #[test]
    fn test_malformed_mask_is_empty() {
        let gray = vec![128u8; 64];
        let bad = MaskRegion::new(vec![255u8; 10], Algorithm::pattern(PatternKind::Lines));
        let out = selective_dither(&gray, 8, 8, &[bad], &Algorithm::ordered());
        let default_result = dither(&gray, 8, 8, &Algorithm::ordered());
        assert_eq!(out, default_result, "a bad mask falls through entirely");
    }

    #[test]
    fn test_region_from_shape() {
        let gray = vec![128u8; 16 * 16];
        let region = MaskRegion::from_shape(
            &MaskShape::Circle {
                center_x: 8.0,
                center_y: 8.0,
                radius: 5.0,
                feather: 0.0,
            },
            16,
            16,
            Algorithm::pattern(PatternKind::Lines),
        );
        assert_eq!(region.mask.len(), 16 * 16);

        let out = selective_dither(&gray, 16, 16, &[region], &Algorithm::ordered());
        let inside = dither(&gray, 16, 16, &Algorithm::pattern(PatternKind::Lines));
        let center = (8 * 16 + 8) * 4;
        assert_eq!(out[center], inside[center], "covered pixels take the region");
    }

    #[test]
    fn test_circle_mask_coverage() {
        let shape = MaskShape::Circle {
            center_x: 8.0,
            center_y: 8.0,
            radius: 4.0,
            feather: 0.0,
        };
        let mask = shape.rasterize(16, 16);
        assert_eq!(mask[8 * 16 + 8], 255, "center covered");
        assert_eq!(mask[0], 0, "corner uncovered");
    }

    #[test]
    fn test_circle_feather_falls_off() {
        let shape = MaskShape::Circle {
            center_x: 16.0,
            center_y: 16.0,
            radius: 10.0,
            feather: 5.0,
        };
        let mask = shape.rasterize(32, 32);
        let solid = mask[16 * 32 + 16];
        let edge = mask[16 * 32 + 24]; // 8 px out: inside the feather band
        let outside = mask[16 * 32 + 29]; // 13 px out
        assert_eq!(solid, 255);
        assert!(edge > 0 && edge < 255, "feather band is partial: {}", edge);
        assert_eq!(outside, 0);
    }

    #[test]
    fn test_rectangle_mask_normalized_coords() {
        let shape = MaskShape::Rectangle {
            x1: 0.25,
            y1: 0.25,
            x2: 0.75,
            y2: 0.75,
            feather: 0.0,
        };
        let mask = shape.rasterize(16, 16);
        assert_eq!(mask[8 * 16 + 8], 255, "center of the image covered");
        assert_eq!(mask[0], 0, "outside the rectangle");
        assert_eq!(mask[4 * 16 + 4], 255, "the corner itself is covered");
    }

    #[test]
    fn test_polygon_triangle() {
        let shape = MaskShape::Polygon {
            vertices: vec![(2.0, 2.0), (13.0, 2.0), (2.0, 13.0)],
            feather: 0.0,
        };
        let mask = shape.rasterize(16, 16);
        assert_eq!(mask[4 * 16 + 4], 255, "inside the triangle");
        assert_eq!(mask[14 * 16 + 14], 0, "opposite corner outside");
    }

    #[test]
    fn test_degenerate_polygon_is_empty() {
        let shape = MaskShape::Polygon {
            vertices: vec![(2.0, 2.0), (13.0, 2.0)],
            feather: 0.0,
        };
        assert!(shape.rasterize(16, 16).iter().all(|&v| v == 0));
    }

    #[test]
    fn test_sobel_finds_vertical_edge() {
        // Left half black, right half white
        let mut gray = vec![0u8; 16 * 16];
        for y in 0..16 {
            for x in 8..16 {
                gray[y * 16 + x] = 255;
            }
        }
        let edges = sobel_edges(&gray, 16, 16, 128);
        assert_eq!(edges[8 * 16 + 8], 255, "edge column detected");
        assert_eq!(edges[8 * 16 + 2], 0, "flat region is quiet");
        assert_eq!(edges[8 * 16 + 13], 0, "flat region is quiet");
    }
}
