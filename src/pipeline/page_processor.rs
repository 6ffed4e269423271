// ページ単位処理: ラスタ化 → プロファイル決定 → 検出 → 膨張 → 再構成

use tracing::debug;

use crate::ink::{detect, dilate, reconstruct};
use crate::render::rasterizer::Rasterizer;
use crate::render::{PageSource, PixelBuffer};
use crate::tuning::TuningProfile;
use crate::tuning::resolver::TuningResolver;

/// Single page processing result.
pub struct ProcessedPage {
    pub page_index: u32,
    /// Cleaned raster.
    pub raster: PixelBuffer,
    pub profile: TuningProfile,
    /// 膨張後マスクの画素数（再構成された画素数）
    pub removed_pixels: usize,
}

/// Run one page through the full cleaning chain.
///
/// The rendered raster doubles as the tuning sample when the resolver has a
/// source configured.
///
/// # Errors
/// Propagates `RasterizationError` from rendering and `ReconstructionError`
/// from reconstruction. Tuning never fails.
pub fn process_page(
    rasterizer: &mut Rasterizer,
    source: &dyn PageSource,
    resolver: &TuningResolver,
    page_index: u32,
    scale: f32,
) -> crate::error::Result<ProcessedPage> {
    let raster = rasterizer.render(source, page_index, scale)?;

    let sample = resolver.has_source().then_some(&raster);
    let profile = resolver.resolve(sample);
    debug!(
        page = page_index,
        s_min = profile.s_min(),
        v_min = profile.v_min(),
        dilate = profile.dilate_radius(),
        inpaint = profile.inpaint_radius(),
        "tuning profile resolved"
    );

    let mask = detect(&raster, &profile);
    let mask = dilate(&mask, profile.dilate_radius() as u32);
    let cleaned = reconstruct(&raster, &mask, profile.inpaint_radius() as u32)?;

    Ok(ProcessedPage {
        page_index,
        raster: cleaned,
        profile,
        removed_pixels: mask.count(),
    })
}
