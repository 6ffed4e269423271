// HSV閾値による赤ペン検出: PixelBuffer + TuningProfile -> DetectionMask

use rayon::prelude::*;

use super::DetectionMask;
use crate::render::PixelBuffer;
use crate::tuning::TuningProfile;

/// Pixels with alpha at or below this are treated as empty paper.
pub const ALPHA_THRESHOLD: u8 = 8;

/// Convert 8-bit RGB to HSV (h in degrees `[0, 360)`, s and v in `[0, 1]`).
///
/// Computed in `f64`; thresholds sitting exactly on a hue or saturation bound
/// depend on it.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let rf = f64::from(r) / 255.0;
    let gf = f64::from(g) / 255.0;
    let bf = f64::from(b) / 255.0;

    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let v = max;
    let d = max - min;
    let s = if max == 0.0 { 0.0 } else { d / max };

    let h = if d == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (((gf - bf) / d) % 6.0)
    } else if max == gf {
        60.0 * (((bf - rf) / d) + 2.0)
    } else {
        60.0 * (((rf - gf) / d) + 4.0)
    };

    let h = if h < 0.0 { h + 360.0 } else { h };
    let h = if h >= 360.0 { h - 360.0 } else { h };
    (h, s, v)
}

/// Classify every pixel of `buffer` as ink or not.
///
/// The returned mask always has the buffer's dimensions.
pub fn detect(buffer: &PixelBuffer, profile: &TuningProfile) -> DetectionMask {
    let width = buffer.width as usize;
    let height = buffer.height as usize;
    let mut bits = vec![false; width * height];

    if width == 0 || height == 0 {
        return DetectionMask::from_bits(buffer.width, buffer.height, bits);
    }

    bits.par_chunks_mut(width)
        .zip(buffer.data.par_chunks(width * 4))
        .for_each(|(mask_row, pixel_row)| {
            for (flag, px) in mask_row.iter_mut().zip(pixel_row.chunks_exact(4)) {
                *flag = is_ink(px, profile);
            }
        });

    DetectionMask::from_bits(buffer.width, buffer.height, bits)
}

#[inline]
fn is_ink(px: &[u8], profile: &TuningProfile) -> bool {
    if px[3] <= ALPHA_THRESHOLD {
        return false;
    }
    let (h, s, v) = rgb_to_hsv(px[0], px[1], px[2]);
    profile.matches(h, s, v)
}
