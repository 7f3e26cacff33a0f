//! Intensity conversion: RGBA to grayscale and single-channel extraction.
//!
//! Every algorithm in this crate consumes a one-byte-per-pixel intensity
//! buffer. These helpers produce that buffer from a decoded RGBA image,
//! either as Rec.601 luma or as a single color channel (for the per-channel
//! RGB/CMYK modes), and expand results back to RGBA.

/// Convert an RGBA buffer to grayscale using Rec.601 luma weights.
///
/// `gray = round(0.299 R + 0.587 G + 0.114 B)`. Alpha is ignored.
pub fn rgba_to_gray(rgba: &[u8]) -> Vec<u8> {
    let mut gray = Vec::with_capacity(rgba.len() / 4);
    for px in rgba.chunks_exact(4) {
        let luma = 0.299 * f32::from(px[0]) + 0.587 * f32::from(px[1]) + 0.114 * f32::from(px[2]);
        gray.push(luma.round() as u8);
    }
    gray
}

/// Extract one color channel (0 = R, 1 = G, 2 = B, 3 = A) as an intensity
/// buffer.
pub fn extract_channel(rgba: &[u8], channel: usize) -> Vec<u8> {
    debug_assert!(channel < 4, "channel index must be 0..4");
    rgba.chunks_exact(4).map(|px| px[channel]).collect()
}

/// Expand a grayscale buffer to opaque RGBA (`[g, g, g, 255]` per pixel).
pub fn gray_to_rgba(gray: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(gray.len() * 4);
    for &g in gray {
        rgba.extend_from_slice(&[g, g, g, 255]);
    }
    rgba
}

/// Recombine three per-channel RGBA results into one RGBA buffer.
///
/// Takes the red channel from `red`, green from `green`, blue from `blue`.
/// Used by the RGB/CMYK color modes, where each channel is dithered
/// independently.
pub fn merge_rgba_channels(red: &[u8], green: &[u8], blue: &[u8]) -> Vec<u8> {
    debug_assert_eq!(red.len(), green.len());
    debug_assert_eq!(red.len(), blue.len());

    let mut out = vec![0u8; red.len()];
    for i in (0..out.len()).step_by(4) {
        out[i] = red[i];
        out[i + 1] = green[i + 1];
        out[i + 2] = blue[i + 2];
        out[i + 3] = 255;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_to_gray_pure_colors() {
        // One red, one green, one blue pixel
        let rgba = [255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255];
        let gray = rgba_to_gray(&rgba);

        assert_eq!(gray, vec![76, 150, 29], "Rec.601 weights for R, G, B");
    }

    #[test]
    fn test_rgba_to_gray_white_and_black() {
        let rgba = [255, 255, 255, 255, 0, 0, 0, 255];
        assert_eq!(rgba_to_gray(&rgba), vec![255, 0]);
    }

    #[test]
    fn test_extract_channel() {
        let rgba = [10, 20, 30, 255, 40, 50, 60, 255];
        assert_eq!(extract_channel(&rgba, 0), vec![10, 40]);
        assert_eq!(extract_channel(&rgba, 1), vec![20, 50]);
        assert_eq!(extract_channel(&rgba, 2), vec![30, 60]);
    }

    #[test]
    fn test_gray_round_trip() {
        let gray = [0u8, 128, 255];
        let rgba = gray_to_rgba(&gray);
        assert_eq!(rgba.len(), 12);
        assert_eq!(&rgba[4..8], &[128, 128, 128, 255]);
        assert_eq!(rgba_to_gray(&rgba), gray.to_vec());
    }

    #[test]
    fn test_merge_rgba_channels() {
        let red = [11, 0, 0, 255, 12, 0, 0, 255];
        let green = [0, 21, 0, 255, 0, 22, 0, 255];
        let blue = [0, 0, 31, 255, 0, 0, 32, 255];

        let merged = merge_rgba_channels(&red, &green, &blue);
        assert_eq!(merged, vec![11, 21, 31, 255, 12, 22, 32, 255]);
    }
}
