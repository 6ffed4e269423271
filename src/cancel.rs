// 協調的キャンセル: 単調増加する世代番号でトークンを発行する

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Issues cancellation tokens for one render target or job slot.
///
/// Every call to [`issue`](Self::issue) supersedes all tokens issued before it.
/// Clones share the same counter, so a clone can be handed to whoever needs to
/// cancel the current operation.
#[derive(Debug, Clone, Default)]
pub struct CancellationSource {
    generation: Arc<AtomicU64>,
}

/// A captured generation. It stays current until its source issues a newer
/// token or is cancelled.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    generation: u64,
    source: Arc<AtomicU64>,
}

impl CancellationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しいトークンを発行し、以前のトークンをすべて無効化する。
    pub fn issue(&self) -> CancellationToken {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        CancellationToken {
            generation,
            source: Arc::clone(&self.generation),
        }
    }

    /// Supersede the current token without issuing a new one.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// 現在の世代番号。
    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl CancellationToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True while no newer token has been issued and no cancel happened.
    pub fn is_current(&self) -> bool {
        self.source.load(Ordering::SeqCst) == self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        !self.is_current()
    }
}
