// マスク領域の再構成: 近傍の非マスク画素の平均で埋める

use rayon::prelude::*;

use super::DetectionMask;
use crate::error::InkScrubError;
use crate::render::PixelBuffer;

/// Colour used when a masked pixel has no unmasked neighbour.
pub const FALLBACK_RGBA: [u8; 4] = [255, 255, 255, 255];

/// Fill every masked pixel from its unmasked neighbours.
///
/// For each masked pixel the R, G and B channels are the rounded means of all
/// unmasked pixels in the `(2r+1)x(2r+1)` square around it, with alpha 255.
/// With no unmasked neighbour the pixel becomes opaque white. Unmasked pixels
/// are copied through untouched. Neighbours are always read from the input
/// buffer, so the result does not depend on visiting order.
///
/// # Errors
/// Returns `InkScrubError::ReconstructionError` if the mask and buffer sizes
/// differ or the buffer's byte length does not match its dimensions.
pub fn reconstruct(
    buffer: &PixelBuffer,
    mask: &DetectionMask,
    radius: u32,
) -> crate::error::Result<PixelBuffer> {
    if !buffer.is_well_formed() {
        return Err(InkScrubError::reconstruct(format!(
            "pixel surface holds {} bytes, expected {}x{}x4",
            buffer.data.len(),
            buffer.width,
            buffer.height
        )));
    }
    if !mask.same_size_as(buffer.width, buffer.height) {
        return Err(InkScrubError::reconstruct(format!(
            "mask is {}x{} but pixel surface is {}x{}",
            mask.width(),
            mask.height(),
            buffer.width,
            buffer.height
        )));
    }

    let mut out = buffer.clone();
    if mask.is_empty() {
        return Ok(out);
    }

    let width = buffer.width as usize;
    let height = buffer.height as usize;
    let r = radius as usize;
    let src = &buffer.data;
    let bits = mask.bits();

    out.data
        .par_chunks_mut(width * 4)
        .enumerate()
        .for_each(|(y, out_row)| {
            let row_bits = &bits[y * width..(y + 1) * width];
            for x in (0..width).filter(|x| row_bits[*x]) {
                let rgba = neighbour_mean(src, bits, width, height, x, y, r)
                    .unwrap_or(FALLBACK_RGBA);
                out_row[x * 4..x * 4 + 4].copy_from_slice(&rgba);
            }
        });

    Ok(out)
}

fn neighbour_mean(
    src: &[u8],
    bits: &[bool],
    width: usize,
    height: usize,
    x: usize,
    y: usize,
    r: usize,
) -> Option<[u8; 4]> {
    let (x0, x1) = (x.saturating_sub(r), (x + r).min(width - 1));
    let (y0, y1) = (y.saturating_sub(r), (y + r).min(height - 1));

    let mut sum = [0u64; 3];
    let mut count = 0u64;
    for ny in y0..=y1 {
        for nx in x0..=x1 {
            let idx = ny * width + nx;
            if bits[idx] {
                continue;
            }
            let p = &src[idx * 4..idx * 4 + 3];
            sum[0] += p[0] as u64;
            sum[1] += p[1] as u64;
            sum[2] += p[2] as u64;
            count += 1;
        }
    }

    if count == 0 {
        return None;
    }
    let mean = |s: u64| ((s + count / 2) / count) as u8;
    Some([mean(sum[0]), mean(sum[1]), mean(sum[2]), 255])
}
