// pdfium-render wrapper: page -> PixelBuffer (in-memory only)

use std::path::{Path, PathBuf};

use pdfium_render::prelude::*;

use super::{PageSource, PixelBuffer};
use crate::error::InkScrubError;
use crate::pdf::fingerprint;
use crate::pdf::reader::PdfReader;

/// Resolves the path to the pdfium shared library.
///
/// Search order:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH` environment variable
/// 2. `vendor/pdfium/lib/` relative to the project root (for development)
fn resolve_pdfium_lib_path() -> crate::error::Result<PathBuf> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        let p = PathBuf::from(&path);
        if p.exists() {
            return Ok(p);
        }
        return Err(InkScrubError::render(format!(
            "PDFIUM_DYNAMIC_LIB_PATH is set to '{}' but the path does not exist",
            path
        )));
    }

    if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
        let vendor_path = PathBuf::from(&manifest_dir).join("vendor/pdfium/lib");
        if vendor_path.exists() {
            return Ok(vendor_path);
        }
    }

    Err(InkScrubError::render(
        "pdfium library not found: set PDFIUM_DYNAMIC_LIB_PATH or place libpdfium.so in vendor/pdfium/lib/",
    ))
}

/// Creates a new Pdfium instance by dynamically loading the shared library.
fn create_pdfium() -> crate::error::Result<Pdfium> {
    let lib_path = resolve_pdfium_lib_path()?;
    let lib_path_str = lib_path.to_str().ok_or_else(|| {
        InkScrubError::render("pdfium library path contains non-UTF-8 characters")
    })?;
    let bindings =
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(lib_path_str))
            .map_err(|e| InkScrubError::render(e.to_string()))?;
    Ok(Pdfium::new(bindings))
}

/// A PDF held in memory and rendered through pdfium.
///
/// The identity is the SHA-256 of the file bytes, so two loads of the same
/// file share render cache entries and session keys.
pub struct PdfiumSource {
    bytes: Vec<u8>,
    identity: String,
    page_count: u32,
}

impl PdfiumSource {
    pub fn open(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes)
    }

    /// Page count is read once with lopdf; pdfium is only bound on render.
    pub fn from_bytes(bytes: Vec<u8>) -> crate::error::Result<Self> {
        let reader = PdfReader::from_bytes(&bytes)?;
        let page_count = reader.page_count();
        let identity = fingerprint(&bytes);
        Ok(Self {
            bytes,
            identity,
            page_count,
        })
    }
}

impl PageSource for PdfiumSource {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn page_count(&self) -> crate::error::Result<u32> {
        Ok(self.page_count)
    }

    /// Renders a page so that one PDF point maps to `scale` pixels.
    ///
    /// # Errors
    /// Returns `InkScrubError::RasterizationError` if:
    /// - The pdfium library cannot be initialized
    /// - The PDF cannot be parsed by pdfium
    /// - The page index is out of range
    /// - Rendering fails
    fn render_page(&self, page_index: u32, scale: f32) -> crate::error::Result<PixelBuffer> {
        let pdfium = create_pdfium()?;

        let document = pdfium
            .load_pdf_from_byte_slice(&self.bytes, None)
            .map_err(|e| InkScrubError::render(e.to_string()))?;

        let page_index_u16 = u16::try_from(page_index)
            .map_err(|_| InkScrubError::render("page index exceeds u16 range"))?;

        let page = document
            .pages()
            .get(page_index_u16)
            .map_err(|e| InkScrubError::render(e.to_string()))?;

        let width_px = (page.width().value * scale).round().max(1.0) as i32;
        let height_px = (page.height().value * scale).round().max(1.0) as i32;

        let config = PdfRenderConfig::new()
            .set_target_width(width_px)
            .set_target_height(height_px);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| InkScrubError::render(e.to_string()))?;

        Ok(PixelBuffer::from_image(bitmap.as_image(), scale))
    }

    fn source_bytes(&self) -> Option<&[u8]> {
        Some(&self.bytes)
    }
}
