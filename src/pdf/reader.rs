use lopdf::Document;

/// 入力PDFの構造読み込み（ページ数のみ。描画はpdfium側で行う）。
pub struct PdfReader {
    doc: Document,
}

impl PdfReader {
    /// メモリ上のPDFバイト列からPdfReaderを作成する。
    pub fn from_bytes(bytes: &[u8]) -> crate::error::Result<Self> {
        let doc = Document::load_mem(bytes)?;
        Ok(Self { doc })
    }

    /// ページ数を返す。
    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }
}
