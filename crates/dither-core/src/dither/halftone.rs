//! Halftone dithering: a rotated grid of variable-size dots.

/// Halftone dithering.
///
/// The image plane is divided into a square grid of cells (side
/// `dot_size + spacing`) rotated by `angle` degrees. Each cell draws a
/// filled circle at its center whose radius is proportional to the local
/// darkness, up to `dot_size / 2`; the rest of the cell stays white.
///
/// Rasterization works per pixel in rotated coordinates: the pixel is
/// rotated into grid space, snapped to its cell center, and compared
/// against the radius derived from the intensity sampled at that center.
pub fn halftone_dither(
    gray: &[u8],
    width: usize,
    height: usize,
    dot_size: u32,
    spacing: u32,
    angle: f32,
) -> Vec<u8> {
    let cell = (dot_size + spacing).max(1) as f32;
    let max_radius = dot_size as f32 / 2.0;
    let rad = angle.to_radians();
    let (sin, cos) = rad.sin_cos();

    let mut out = vec![255u8; width * height * 4];
    for y in 0..height {
        for x in 0..width {
            // Rotate into grid space
            let xf = x as f32;
            let yf = y as f32;
            let u = xf * cos + yf * sin;
            let v = -xf * sin + yf * cos;

            // Cell center in grid space
            let cu = (u / cell).floor() * cell + cell / 2.0;
            let cv = (v / cell).floor() * cell + cell / 2.0;

            // Rotate the center back to sample the source intensity there
            let cx = cu * cos - cv * sin;
            let cy = cu * sin + cv * cos;
            let sx = (cx.round() as i64).clamp(0, width as i64 - 1) as usize;
            let sy = (cy.round() as i64).clamp(0, height as i64 - 1) as usize;

            let darkness = 1.0 - f32::from(gray[sy * width + sx]) / 255.0;
            let radius = max_radius * darkness;

            let du = u - cu;
            let dv = v - cv;
            if du * du + dv * dv <= radius * radius {
                let idx = (y * width + x) * 4;
                out[idx] = 0;
                out[idx + 1] = 0;
                out[idx + 2] = 0;
            }
        }
    }
    out
}
