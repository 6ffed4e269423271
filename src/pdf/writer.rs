// 画像XObject構築、1画像=1ページのPDF組立

use std::io::{Cursor, Write};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::{ColorType, ImageDecoder, ImageReader};
use lopdf::{Document, Object, Stream, dictionary};

use crate::error::InkScrubError;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SOI: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Encoding of one input image, inferred from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    /// Unsupported. Pages must be PNG or JPEG.
    Other,
}

impl ImageKind {
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(PNG_SIGNATURE) {
            ImageKind::Png
        } else if bytes.starts_with(JPEG_SOI) {
            ImageKind::Jpeg
        } else {
            ImageKind::Other
        }
    }
}

/// 画像XObjectとページ辞書を構築する。
struct ImageXObject {
    dict: lopdf::Dictionary,
    data: Vec<u8>,
    width: u32,
    height: u32,
}

/// Builds a PDF where every page is exactly one full-bleed image.
pub struct ImagePageWriter {
    doc: Document,
    pages_id: lopdf::ObjectId,
    page_ids: Vec<lopdf::ObjectId>,
}

impl Default for ImagePageWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImagePageWriter {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
        }
    }

    /// 画像のコンテンツストリームバイト列を生成する。
    ///
    /// `q <width> 0 0 <height> 0 0 cm /<name> Do Q`
    pub fn build_image_content_stream(name: &str, width: u32, height: u32) -> Vec<u8> {
        format!("q {width} 0 0 {height} 0 0 cm /{name} Do Q").into_bytes()
    }

    /// Append one encoded image as a new page sized to its pixel dimensions.
    ///
    /// 戻り値はページのオブジェクトID。
    pub fn add_image_page(&mut self, encoded: &[u8]) -> crate::error::Result<lopdf::ObjectId> {
        let xobject = match ImageKind::detect(encoded) {
            ImageKind::Jpeg => jpeg_xobject(encoded)?,
            ImageKind::Png => raster_xobject(encoded)?,
            ImageKind::Other => {
                return Err(InkScrubError::pdf_write(
                    "page image is neither PNG nor JPEG",
                ));
            }
        };
        let (width, height) = (xobject.width, xobject.height);

        let image_id = self
            .doc
            .add_object(Object::Stream(Stream::new(xobject.dict, xobject.data)));

        let mut xobject_dict = lopdf::Dictionary::new();
        xobject_dict.set("Im0", Object::Reference(image_id));
        let resources_id = self.doc.add_object(dictionary! {
            "XObject" => Object::Dictionary(xobject_dict),
        });

        let content_bytes = Self::build_image_content_stream("Im0", width, height);
        let content_id = self
            .doc
            .add_object(Object::Stream(Stream::new(dictionary! {}, content_bytes)));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(width as i64),
                Object::Integer(height as i64),
            ],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        self.page_ids.push(page_id);
        Ok(page_id)
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Pagesノード・Catalogを設定し、PDFドキュメントをバイト列として出力する。
    pub fn finish(mut self) -> crate::error::Result<Vec<u8>> {
        if self.page_ids.is_empty() {
            return Err(InkScrubError::pdf_write("document has no pages"));
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        self.doc
            .save_to(&mut buf)
            .map_err(|e| InkScrubError::pdf_write(e.to_string()))?;
        Ok(buf)
    }
}

/// JPEGはそのままDCTDecodeで埋め込む（ヘッダから寸法と色空間のみ取得）。
fn jpeg_xobject(encoded: &[u8]) -> crate::error::Result<ImageXObject> {
    let decoder = ImageReader::new(Cursor::new(encoded))
        .with_guessed_format()?
        .into_decoder()
        .map_err(|e| InkScrubError::pdf_write(format!("unreadable JPEG header: {e}")))?;
    let (width, height) = decoder.dimensions();
    let color_space = match decoder.color_type() {
        ColorType::L8 | ColorType::L16 => "DeviceGray",
        _ => "DeviceRGB",
    };

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
        "Filter" => "DCTDecode",
    };
    Ok(ImageXObject {
        dict,
        data: encoded.to_vec(),
        width,
        height,
    })
}

/// PNGはデコードしてRGBをFlateDecodeで埋め込む。
fn raster_xobject(encoded: &[u8]) -> crate::error::Result<ImageXObject> {
    let img = image::load_from_memory(encoded)
        .map_err(|e| InkScrubError::pdf_write(format!("cannot decode page image: {e}")))?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(rgb.as_raw())?;
    let data = encoder.finish()?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    Ok(ImageXObject {
        dict,
        data,
        width,
        height,
    })
}

/// Assemble encoded page images, in order, into one PDF.
pub fn build_document(ordered_images: &[Vec<u8>]) -> crate::error::Result<Vec<u8>> {
    let mut writer = ImagePageWriter::new();
    for image in ordered_images {
        writer.add_image_page(image)?;
    }
    writer.finish()
}
