// マスク膨張（正方形の構造要素, チェビシェフ距離）

use rayon::prelude::*;

use super::DetectionMask;

/// Set every pixel within Chebyshev distance `radius` of a set pixel.
///
/// The square element is applied once, as two separable passes (rows, then
/// columns), which is exactly equivalent to scanning the full
/// `(2r+1)x(2r+1)` neighbourhood. Offsets past the edges are skipped.
pub fn dilate(mask: &DetectionMask, radius: u32) -> DetectionMask {
    if radius == 0 || mask.is_empty() {
        return mask.clone();
    }

    let width = mask.width() as usize;
    let height = mask.height() as usize;
    let r = radius as usize;
    let src = mask.bits();

    let mut horizontal = vec![false; width * height];
    horizontal
        .par_chunks_mut(width)
        .zip(src.par_chunks(width))
        .for_each(|(out_row, in_row)| {
            for (x, out) in out_row.iter_mut().enumerate() {
                let lo = x.saturating_sub(r);
                let hi = (x + r).min(width - 1);
                *out = in_row[lo..=hi].iter().any(|b| *b);
            }
        });

    let mut bits = vec![false; width * height];
    bits.par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, out_row)| {
            let lo = y.saturating_sub(r);
            let hi = (y + r).min(height - 1);
            for src_row in horizontal[lo * width..(hi + 1) * width].chunks_exact(width) {
                for (out, set) in out_row.iter_mut().zip(src_row) {
                    *out |= *set;
                }
            }
        });

    DetectionMask::from_bits(mask.width(), mask.height(), bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Brute-force reference: scan the square around every pixel.
    fn dilate_reference(mask: &DetectionMask, radius: u32) -> DetectionMask {
        let r = radius as i64;
        let mut out = DetectionMask::new(mask.width(), mask.height());
        for y in 0..mask.height() as i64 {
            for x in 0..mask.width() as i64 {
                let mut hit = false;
                for dy in -r..=r {
                    for dx in -r..=r {
                        let (nx, ny) = (x + dx, y + dy);
                        if nx >= 0
                            && ny >= 0
                            && nx < mask.width() as i64
                            && ny < mask.height() as i64
                            && mask.get(nx as u32, ny as u32)
                        {
                            hit = true;
                        }
                    }
                }
                out.set(x as u32, y as u32, hit);
            }
        }
        out
    }

    #[test]
    fn test_separable_passes_match_reference() {
        let mut mask = DetectionMask::new(13, 9);
        for (x, y) in [(0, 0), (6, 4), (12, 8), (3, 7), (10, 1)] {
            mask.set(x, y, true);
        }
        for radius in 0..=3 {
            assert_eq!(
                dilate(&mask, radius),
                dilate_reference(&mask, radius),
                "radius {radius}"
            );
        }
    }
}
