use std::collections::HashMap;
use std::sync::RwLock;

use super::{SessionStore, validate_key};
use crate::error::InkScrubError;

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_error(e: impl std::fmt::Display) -> InkScrubError {
    InkScrubError::persistence(format!("Lock error: {}", e))
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> crate::error::Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let entries = self.entries.read().map_err(lock_error)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> crate::error::Result<()> {
        validate_key(key)?;
        let mut entries = self.entries.write().map_err(lock_error)?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> crate::error::Result<()> {
        validate_key(key)?;
        let mut entries = self.entries.write().map_err(lock_error)?;
        entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> crate::error::Result<()> {
        let mut entries = self.entries.write().map_err(lock_error)?;
        entries.clear();
        Ok(())
    }

    fn keys(&self) -> crate::error::Result<Vec<String>> {
        let entries = self.entries.read().map_err(lock_error)?;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
