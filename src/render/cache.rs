// ページ番号 → エンコード済みラスタのメモリキャッシュ
//
// One cache belongs to one viewing surface. It only ever holds entries for a
// single (document identity, scale) pair; switching either clears it entirely.

use std::collections::HashMap;

use super::PixelBuffer;
use super::encode::{decode_png, encode_png};

/// A cached raster for one page at the cache's current scale.
#[derive(Debug, Clone)]
pub struct RenderCacheEntry {
    pub page_index: u32,
    pub width: u32,
    pub height: u32,
    /// PNG-encoded pixels (lossless, so replay is pixel-identical).
    pub encoded: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct RenderCache {
    identity: Option<String>,
    scale_bits: Option<u32>,
    entries: HashMap<u32, RenderCacheEntry>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// キャッシュを指定ドキュメント・スケールに合わせる。
    ///
    /// 識別子またはスケールが変わった場合はエントリを全て破棄する。
    /// 破棄が起きた場合は `true` を返す。
    pub fn prepare(&mut self, identity: &str, scale: f32) -> bool {
        let same_doc = self.identity.as_deref() == Some(identity);
        let same_scale = self.scale_bits == Some(scale.to_bits());
        if same_doc && same_scale {
            return false;
        }
        let had_entries = !self.entries.is_empty();
        self.entries.clear();
        self.identity = Some(identity.to_string());
        self.scale_bits = Some(scale.to_bits());
        had_entries
    }

    /// Whether the cache is currently bound to this document and scale.
    pub fn is_bound_to(&self, identity: &str, scale: f32) -> bool {
        self.identity.as_deref() == Some(identity) && self.scale_bits == Some(scale.to_bits())
    }

    pub fn get(&self, page_index: u32) -> Option<&RenderCacheEntry> {
        self.entries.get(&page_index)
    }

    /// Decode a cached page, if present. A corrupt entry is treated as a miss.
    pub fn replay(&self, page_index: u32, scale: f32) -> Option<PixelBuffer> {
        let entry = self.entries.get(&page_index)?;
        decode_png(&entry.encoded, scale).ok()
    }

    /// Encode and store a freshly rendered page.
    pub fn insert(&mut self, page_index: u32, buffer: &PixelBuffer) -> crate::error::Result<()> {
        let encoded = encode_png(buffer)?;
        self.entries.insert(
            page_index,
            RenderCacheEntry {
                page_index,
                width: buffer.width,
                height: buffer.height,
                encoded,
            },
        );
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.identity = None;
        self.scale_bits = None;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
