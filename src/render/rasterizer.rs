// ページ → PixelBuffer（キャッシュ・キャンセル対応）

use tracing::{debug, warn};

use super::cache::RenderCache;
use super::{PageSource, PixelBuffer};
use crate::cancel::{CancellationSource, CancellationToken};
use crate::error::InkScrubError;

/// Renders pages for one output target (a viewing surface or the batch
/// pipeline), owning that target's render cache.
#[derive(Debug, Default)]
pub struct Rasterizer {
    cache: RenderCache,
    cancellation: CancellationSource,
}

impl Rasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that can cancel whatever render is currently in flight.
    pub fn cancellation(&self) -> CancellationSource {
        self.cancellation.clone()
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    /// Drop every cached page.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    /// Render a 0-indexed page at `scale`.
    ///
    /// Issuing the request supersedes any earlier render on this rasterizer.
    /// A cached page for the same document and scale is replayed instead of
    /// rendered. The cache is only written when the request is still current
    /// and the document was not replaced while rendering.
    ///
    /// # Errors
    /// Returns `InkScrubError::RasterizationError` if:
    /// - `scale` is not a positive finite number
    /// - The page index is out of range
    /// - The document changed identity during the render
    /// - The render was cancelled
    /// - The underlying renderer fails
    pub fn render(
        &mut self,
        source: &dyn PageSource,
        page_index: u32,
        scale: f32,
    ) -> crate::error::Result<PixelBuffer> {
        let token = self.cancellation.issue();
        self.render_with_token(source, page_index, scale, &token)
    }

    fn render_with_token(
        &mut self,
        source: &dyn PageSource,
        page_index: u32,
        scale: f32,
        token: &CancellationToken,
    ) -> crate::error::Result<PixelBuffer> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(InkScrubError::render(format!(
                "render scale must be positive, got {scale}"
            )));
        }

        let identity = source.identity().to_string();
        if self.cache.prepare(&identity, scale) {
            debug!(document = %identity, scale, "render cache invalidated");
        }

        let page_count = source.page_count()?;
        if page_index >= page_count {
            return Err(InkScrubError::render(format!(
                "page index {} out of range (document has {} pages)",
                page_index, page_count
            )));
        }

        if let Some(cached) = self.cache.replay(page_index, scale) {
            debug!(page = page_index, "render cache hit");
            return Ok(cached);
        }

        let buffer = source.render_page(page_index, scale)?;

        if token.is_cancelled() {
            return Err(InkScrubError::render(format!(
                "render of page {} was cancelled",
                page_index
            )));
        }
        if source.identity() != identity {
            return Err(InkScrubError::render(
                "document was replaced while the page was rendering",
            ));
        }
        if !buffer.is_well_formed() {
            return Err(InkScrubError::render(format!(
                "renderer returned {} bytes for a {}x{} page",
                buffer.data.len(),
                buffer.width,
                buffer.height
            )));
        }

        if let Err(e) = self.cache.insert(page_index, &buffer) {
            warn!(page = page_index, error = %e, "failed to cache rendered page");
        }

        Ok(buffer)
    }
}
