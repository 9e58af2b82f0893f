//! Cooperative cancellation and progress reporting for long runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::types::Phase;

/// Shared cancellation flag, checked between chunks.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Snapshot of one phase after a chunk was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    pub phase: Phase,
    /// Items of the collection this phase has covered
    pub processed: usize,
    pub total: usize,
    /// Identifiers the chunk added to the maps
    pub newly_classified: usize,
}

/// Receives a callback after every processed chunk.
pub trait ProgressObserver: Send + Sync {
    fn on_chunk(&self, progress: &ChunkProgress);
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_chunk(&self, _progress: &ChunkProgress) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
