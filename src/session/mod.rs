//! Key/value persistence used to resume a session.
//!
//! Two namespaces share one store:
//! - `file-<id>` holds raw bytes (the source document, and cleaned pages as
//!   `file-<id>.p<index>`)
//! - `state-<id>` holds a JSON [`snapshot::JobSnapshot`]
//!
//! The pipeline works without a store; every store failure is logged by the
//! caller and otherwise ignored.

pub mod memory;
pub mod snapshot;
pub mod store;

use std::collections::BTreeSet;

use crate::error::InkScrubError;

pub use memory::MemorySessionStore;
pub use store::FsSessionStore;

pub const FILE_PREFIX: &str = "file-";
pub const STATE_PREFIX: &str = "state-";

pub trait SessionStore {
    fn get(&self, key: &str) -> crate::error::Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> crate::error::Result<()>;
    fn delete(&self, key: &str) -> crate::error::Result<()>;
    fn clear(&self) -> crate::error::Result<()>;
    /// Every key currently stored.
    fn keys(&self) -> crate::error::Result<Vec<String>>;

    /// Identifiers known to the store, across both namespaces.
    fn list_ids(&self) -> crate::error::Result<Vec<String>> {
        Ok(ids_from_keys(self.keys()?.iter().map(String::as_str)))
    }
}

pub fn file_key(id: &str) -> String {
    format!("{FILE_PREFIX}{id}")
}

pub fn page_key(id: &str, page_index: u32) -> String {
    format!("{FILE_PREFIX}{id}.p{page_index}")
}

pub fn state_key(id: &str) -> String {
    format!("{STATE_PREFIX}{id}")
}

/// キーから識別子を取り出す（ページキーの `.p<n>` 接尾辞も除去する）。
pub(crate) fn ids_from_keys<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut ids = BTreeSet::new();
    for key in keys {
        let rest = key
            .strip_prefix(FILE_PREFIX)
            .or_else(|| key.strip_prefix(STATE_PREFIX));
        let Some(rest) = rest else { continue };
        let id = match rest.rsplit_once(".p") {
            Some((id, n)) if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => id,
            _ => rest,
        };
        if !id.is_empty() {
            ids.insert(id.to_string());
        }
    }
    ids.into_iter().collect()
}

/// キーが `[A-Za-z0-9._-]` のみで構成されていることを検証する。
///
/// パストラバーサルや不正なファイル名を防止する。
pub(crate) fn validate_key(key: &str) -> crate::error::Result<()> {
    let valid = !key.is_empty()
        && key.len() <= 200
        && !key.starts_with('.')
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));
    if valid {
        Ok(())
    } else {
        Err(InkScrubError::persistence(format!(
            "invalid session key: '{}'",
            key
        )))
    }
}
