// PDF読込・組立テスト

use lopdf::{Document, Object, Stream, dictionary};
use ink_scrub::error::InkScrubError;
use ink_scrub::pdf::fingerprint;
use ink_scrub::pdf::reader::PdfReader;
use ink_scrub::pdf::writer::{ImagePageWriter, build_document};
use ink_scrub::render::PixelBuffer;
use ink_scrub::render::encode::{encode_jpeg, encode_png};

/// ヘルパー: MediaBoxを持たないページと、MediaBoxを持つ親Pagesノードを持つPDFを作成
fn create_pdf_with_inherited_media_box() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let contents_id = doc.add_object(Stream::new(dictionary! {}, vec![]));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => contents_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("save test PDF");
    buf
}

fn png_page(width: u32, height: u32) -> Vec<u8> {
    encode_png(&PixelBuffer::filled(width, height, [200, 30, 30, 255], 1.0)).expect("encode png")
}

fn load(pdf: &[u8]) -> Document {
    Document::load_mem(pdf).expect("reopen generated PDF")
}

/// Page (1-indexed) width and height from its MediaBox, following Parent.
fn page_size(doc: &Document, page_num: u32) -> (f64, f64) {
    let mut dict = doc
        .get_dictionary(doc.get_pages()[&page_num])
        .expect("page dictionary");
    let media_box = loop {
        if let Ok(mb) = dict.get(b"MediaBox").and_then(Object::as_array) {
            break mb;
        }
        let parent = dict
            .get(b"Parent")
            .and_then(Object::as_reference)
            .expect("MediaBox or Parent");
        dict = doc.get_dictionary(parent).expect("parent dictionary");
    };
    let n: Vec<f64> = media_box
        .iter()
        .map(|o| o.as_float().map(f64::from).expect("numeric MediaBox"))
        .collect();
    ((n[2] - n[0]).abs(), (n[3] - n[1]).abs())
}

/// Resources dictionary of a page (1-indexed), inline or referenced.
fn resources(doc: &Document, page_num: u32) -> &lopdf::Dictionary {
    let page_id = doc.get_pages()[&page_num];
    let (inline, referenced) = doc.get_page_resources(page_id).expect("resources");
    match inline {
        Some(dict) => dict,
        None => doc
            .get_dictionary(referenced[0])
            .expect("referenced resources dictionary"),
    }
}

fn image_count(doc: &Document, page_num: u32) -> usize {
    resources(doc, page_num)
        .get(b"XObject")
        .and_then(Object::as_dict)
        .map(|xobjects| {
            xobjects
                .iter()
                .filter_map(|(_, v)| v.as_reference().ok())
                .filter_map(|id| doc.get_object(id).and_then(Object::as_stream).ok())
                .filter(|s| {
                    s.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(&b"Image"[..])
                })
                .count()
        })
        .unwrap_or(0)
}

/// Filter of the single image XObject on a page (1-indexed).
fn image_filter(doc: &Document, page_num: u32) -> Vec<u8> {
    let xobjects = resources(doc, page_num)
        .get(b"XObject")
        .and_then(Object::as_dict)
        .expect("XObject dictionary");
    let image_id = xobjects
        .get(b"Im0")
        .and_then(Object::as_reference)
        .expect("Im0 reference");
    let stream = doc
        .get_object(image_id)
        .and_then(Object::as_stream)
        .expect("image stream");
    stream
        .dict
        .get(b"Filter")
        .and_then(Object::as_name)
        .expect("Filter name")
        .to_vec()
}

// ============================================================
// 1. reader
// ============================================================

#[test]
fn test_reader_counts_pages_with_inherited_media_box() {
    let reader = PdfReader::from_bytes(&create_pdf_with_inherited_media_box()).expect("open");
    assert_eq!(reader.page_count(), 1);
}

#[test]
fn test_reader_rejects_garbage() {
    let result = PdfReader::from_bytes(b"not a pdf");
    assert!(matches!(result, Err(InkScrubError::PdfReadError(_))));
}

#[test]
fn test_reader_counts_generated_pages() {
    let pdf = build_document(&[png_page(4, 4), png_page(4, 4)]).expect("build");
    let reader = PdfReader::from_bytes(&pdf).expect("reopen");
    assert_eq!(reader.page_count(), 2);
}

#[test]
fn test_fingerprint_is_stable_sha256_hex() {
    let bytes = create_pdf_with_inherited_media_box();
    let a = fingerprint(&bytes);
    assert_eq!(a.len(), 64);
    assert_eq!(a, fingerprint(&bytes));
    assert_ne!(a, fingerprint(b"other"));
}

// ============================================================
// 2. writer: 1画像 = 1ページ
// ============================================================

#[test]
fn test_build_document_one_page_per_image_in_order() {
    let pages = vec![png_page(40, 30), png_page(20, 50), png_page(10, 10)];
    let pdf = build_document(&pages).expect("build");

    let doc = load(&pdf);
    assert_eq!(doc.get_pages().len(), 3);
    assert_eq!(page_size(&doc, 1), (40.0, 30.0));
    assert_eq!(page_size(&doc, 2), (20.0, 50.0));
    assert_eq!(page_size(&doc, 3), (10.0, 10.0));
    for page in 1..=3 {
        assert_eq!(image_count(&doc, page), 1);
    }
}

#[test]
fn test_png_pages_are_flate_encoded() {
    let pdf = build_document(&[png_page(8, 8)]).expect("build");
    assert_eq!(image_filter(&load(&pdf), 1), b"FlateDecode");
}

#[test]
fn test_jpeg_pages_are_embedded_as_dct() {
    let buffer = PixelBuffer::filled(16, 12, [250, 250, 240, 255], 1.0);
    let jpeg = encode_jpeg(&buffer, 85).expect("encode jpeg");
    let pdf = build_document(&[jpeg]).expect("build");

    let doc = load(&pdf);
    assert_eq!(page_size(&doc, 1), (16.0, 12.0));
    assert_eq!(image_filter(&doc, 1), b"DCTDecode");
}

#[test]
fn test_mixed_formats_keep_order() {
    let jpeg = encode_jpeg(&PixelBuffer::filled(30, 20, [0, 0, 0, 255], 1.0), 70)
        .expect("encode jpeg");
    let pdf = build_document(&[png_page(10, 10), jpeg]).expect("build");

    let doc = load(&pdf);
    assert_eq!(image_filter(&doc, 1), b"FlateDecode");
    assert_eq!(image_filter(&doc, 2), b"DCTDecode");
    assert_eq!(page_size(&doc, 2), (30.0, 20.0));
}

#[test]
fn test_build_document_rejects_empty_input() {
    assert!(matches!(
        build_document(&[]),
        Err(InkScrubError::PdfWriteError(_))
    ));
}

#[test]
fn test_unsupported_image_is_write_error() {
    let result = build_document(&[b"GIF89a\x01\x00\x01\x00".to_vec()]);
    assert!(matches!(result, Err(InkScrubError::PdfWriteError(_))));
}

#[test]
fn test_writer_page_count_tracks_added_pages() {
    let mut writer = ImagePageWriter::new();
    assert_eq!(writer.page_count(), 0);
    writer.add_image_page(&png_page(5, 5)).expect("add page");
    writer.add_image_page(&png_page(6, 6)).expect("add page");
    assert_eq!(writer.page_count(), 2);
    let pdf = writer.finish().expect("finish");
    assert!(pdf.starts_with(b"%PDF-"));
}
