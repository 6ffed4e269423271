// PixelBuffer -> PNG / JPEG バイト列

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};

use super::PixelBuffer;
use crate::error::InkScrubError;

/// Encoding used for cleaned pages embedded in the output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

/// Encode a pixel buffer as PNG (RGBA, lossless).
pub fn encode_png(buffer: &PixelBuffer) -> crate::error::Result<Vec<u8>> {
    let img = buffer.to_rgba_image()?;
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// Decode PNG bytes back into a pixel buffer.
pub fn decode_png(bytes: &[u8], scale: f32) -> crate::error::Result<PixelBuffer> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
    Ok(PixelBuffer::from_image(img, scale))
}

/// Encode a pixel buffer as JPEG, dropping the alpha channel.
///
/// # Arguments
/// * `buffer`  - Source pixels
/// * `quality` - JPEG quality (1 = worst, 100 = best)
pub fn encode_jpeg(buffer: &PixelBuffer, quality: u8) -> crate::error::Result<Vec<u8>> {
    if !(1..=100).contains(&quality) {
        return Err(InkScrubError::encode(format!(
            "JPEG quality must be 1-100, got {}",
            quality
        )));
    }

    let rgba = buffer.to_rgba_image()?;
    let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();
    encode_rgb_to_jpeg(&rgb, quality)
}

fn encode_rgb_to_jpeg(rgb: &RgbImage, quality: u8) -> crate::error::Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)?;

    Ok(buf.into_inner())
}

/// Encode with the configured output format.
pub fn encode_page(
    buffer: &PixelBuffer,
    format: OutputFormat,
    jpeg_quality: u8,
) -> crate::error::Result<Vec<u8>> {
    match format {
        OutputFormat::Png => encode_png(buffer),
        OutputFormat::Jpeg => encode_jpeg(buffer, jpeg_quality),
    }
}
