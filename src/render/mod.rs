pub mod cache;
pub mod encode;
#[cfg(feature = "pdfium")]
pub mod pdfium;
pub mod rasterizer;

use image::{DynamicImage, RgbaImage};

use crate::error::InkScrubError;

/// A rendered page: RGBA, row-major, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Device scale factor the page was rendered at (1.0 = 72 dpi).
    pub scale: f32,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes, checking that the length matches the dimensions.
    pub fn from_rgba(
        width: u32,
        height: u32,
        data: Vec<u8>,
        scale: f32,
    ) -> crate::error::Result<Self> {
        let expected = rgba_len(width, height).ok_or_else(|| {
            InkScrubError::render(format!(
                "overflow computing buffer size for {}x{} RGBA image",
                width, height
            ))
        })?;
        if data.len() != expected {
            return Err(InkScrubError::render(format!(
                "RGBA data size mismatch: expected {} bytes, got {}",
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            scale,
        })
    }

    /// A buffer filled with one RGBA colour.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4], scale: f32) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * 4);
        for _ in 0..count {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
            scale,
        }
    }

    pub fn from_image(image: DynamicImage, scale: f32) -> Self {
        let rgba = image.into_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            data: rgba.into_raw(),
            scale,
        }
    }

    pub fn to_rgba_image(&self) -> crate::error::Result<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| InkScrubError::encode("pixel buffer does not match its dimensions"))
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    /// Byte length is consistent with width and height.
    pub fn is_well_formed(&self) -> bool {
        rgba_len(self.width, self.height) == Some(self.data.len())
    }
}

pub(crate) fn rgba_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|wh| wh.checked_mul(4))
}

/// A decoded document whose pages can be rasterized.
///
/// `identity` must change whenever the underlying document changes; the
/// render cache is keyed on it.
pub trait PageSource {
    fn identity(&self) -> &str;

    fn page_count(&self) -> crate::error::Result<u32>;

    /// Render a 0-indexed page at `scale` (1.0 = 72 dpi).
    fn render_page(&self, page_index: u32, scale: f32) -> crate::error::Result<PixelBuffer>;

    /// Raw document bytes, when the source keeps them. Used to persist the
    /// document for session resumption.
    fn source_bytes(&self) -> Option<&[u8]> {
        None
    }
}
