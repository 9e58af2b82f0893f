//! The analyzer service: owns the store, the fingerprint cache and the
//! published snapshot, and drives phases chunk by chunk.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde::Serialize;
use tracing::{info, warn};

use super::cancel::{CancellationToken, ChunkProgress, NoopObserver, ProgressObserver};
use super::library::MediaLibrary;
use super::phase::{process_chunk, PhaseContext};
use crate::config::Config;
use crate::error::Result;
use crate::fingerprint::{FingerprintCache, TextRecognizer};
use crate::store::{ClassificationMaps, CollectionStatus, Dashboard, PhaseState, SnapshotStore};
use crate::types::{MediaItem, Phase};

/// Outcome of one `run_phase` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseResult {
    pub phase: Phase,
    pub items_processed: usize,
    pub newly_classified: usize,
    /// The cursor reached the end of the collection
    pub complete: bool,
    /// Disabled by configuration; the cursor was left untouched
    pub skipped: bool,
}

impl PhaseResult {
    fn new(phase: Phase) -> Self {
        Self {
            phase,
            items_processed: 0,
            newly_classified: 0,
            complete: false,
            skipped: false,
        }
    }
}

/// Outcome of `run_to_completion`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub phases: Vec<PhaseResult>,
    /// Stopped by the cancellation token before every phase completed
    pub cancelled: bool,
    pub total_bytes: u64,
}

/// Incremental, resumable analysis of one media library.
///
/// All shared state lives here: the snapshot store (maps and cursors) behind a
/// mutex, the fingerprint cache behind its reader/writer lock and one async
/// lock per phase so a phase cursor has a single writer.
pub struct Analyzer {
    library: Arc<dyn MediaLibrary>,
    recognizer: Arc<dyn TextRecognizer>,
    config: Config,
    store: Mutex<SnapshotStore>,
    published: RwLock<Arc<ClassificationMaps>>,
    cache: FingerprintCache,
    items: tokio::sync::Mutex<Option<Arc<Vec<MediaItem>>>>,
    phase_locks: [tokio::sync::Mutex<()>; Phase::COUNT],
}

impl Analyzer {
    pub fn new(
        library: Arc<dyn MediaLibrary>,
        recognizer: Arc<dyn TextRecognizer>,
        config: Config,
        store: SnapshotStore,
    ) -> Self {
        let cache = FingerprintCache::from_entries(store.load_fingerprints());
        let published = RwLock::new(Arc::new(store.maps().clone()));
        Self {
            library,
            recognizer,
            config,
            store: Mutex::new(store),
            published,
            cache,
            items: tokio::sync::Mutex::new(None),
            phase_locks: std::array::from_fn(|_| tokio::sync::Mutex::new(())),
        }
    }

    /// Open the store at `store_dir` and build an analyzer on it.
    pub fn open(
        library: Arc<dyn MediaLibrary>,
        recognizer: Arc<dyn TextRecognizer>,
        config: Config,
        store_dir: &Path,
    ) -> Result<Self> {
        let store = SnapshotStore::open(store_dir)?;
        info!(recognizer = recognizer.name(), "Analyzer ready");
        Ok(Self::new(library, recognizer, config, store))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn store(&self) -> MutexGuard<'_, SnapshotStore> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Classification maps as of the last flush.
    pub fn snapshot(&self) -> Arc<ClassificationMaps> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn dashboard(&self) -> Dashboard {
        self.snapshot().summary()
    }

    /// In-memory state of every phase cursor.
    pub fn phase_states(&self) -> Vec<(Phase, PhaseState)> {
        let store = self.store();
        Phase::ALL.iter().map(|&p| (p, store.phase_state(p))).collect()
    }

    /// Size of the recorded collection.
    pub fn total_items(&self) -> usize {
        self.store().total_items()
    }

    pub fn fingerprint_count(&self) -> usize {
        self.cache.count()
    }

    fn publish(&self, maps: ClassificationMaps) {
        *self.published.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(maps);
    }

    /// Flush the store and publish the maps; failures are retried later.
    fn flush(&self) {
        let mut store = self.store();
        if let Err(e) = store.flush(&self.cache) {
            warn!(error = %e, pending = store.pending_chunks(), "Snapshot flush failed, will retry");
        }
        let maps = store.maps().clone();
        drop(store);
        self.publish(maps);
    }

    /// Record `items` as the collection, resetting cursors if it changed.
    pub async fn reset_if_collection_changed(&self, mut items: Vec<MediaItem>) -> CollectionStatus {
        let mut cached = self.items.lock().await;
        let chunk_size = self.config.scan.chunk_size;
        let (status, maps) = {
            let mut store = self.store();
            let status = store.reset_if_collection_changed(&mut items, chunk_size, &self.cache);
            (status, store.maps().clone())
        };
        *cached = Some(Arc::new(items));
        self.publish(maps);
        status
    }

    /// Enumerate the library and record the result.
    pub async fn sync_collection(&self) -> Result<CollectionStatus> {
        let items = self.library.enumerate().await?;
        info!(items = items.len(), "Enumerated media library");
        Ok(self.reset_if_collection_changed(items).await)
    }

    /// The sorted collection, from memory, segments or a fresh enumeration.
    async fn items(&self) -> Result<Arc<Vec<MediaItem>>> {
        if let Some(items) = self.items.lock().await.as_ref() {
            return Ok(Arc::clone(items));
        }
        let loaded = {
            let store = self.store();
            if store.has_collection() {
                store.load_items()
            } else {
                Ok(Vec::new())
            }
        };
        match loaded {
            Ok(items) if !items.is_empty() => {
                let items = Arc::new(items);
                *self.items.lock().await = Some(Arc::clone(&items));
                Ok(items)
            }
            Ok(_) => self.fresh_items().await,
            Err(e) => {
                warn!(error = %e, "Item segments unusable, enumerating again");
                self.fresh_items().await
            }
        }
    }

    async fn fresh_items(&self) -> Result<Arc<Vec<MediaItem>>> {
        self.sync_collection().await?;
        Ok(self
            .items
            .lock()
            .await
            .as_ref()
            .map(Arc::clone)
            .unwrap_or_default())
    }

    fn phase_enabled(&self, phase: Phase) -> bool {
        match phase {
            Phase::Blur => self.config.blur.enabled,
            Phase::Text => self.config.text.enabled,
            _ => true,
        }
    }

    /// Advance `phase` by at most `max_chunks` chunks (all remaining if `None`).
    pub async fn run_phase(&self, phase: Phase, max_chunks: Option<usize>) -> Result<PhaseResult> {
        self.drive(phase, max_chunks, None, &NoopObserver).await
    }

    async fn drive(
        &self,
        phase: Phase,
        max_chunks: Option<usize>,
        cancel: Option<&CancellationToken>,
        observer: &dyn ProgressObserver,
    ) -> Result<PhaseResult> {
        let _writer = self.phase_locks[phase as usize].lock().await;
        let mut result = PhaseResult::new(phase);
        if !self.phase_enabled(phase) {
            info!(%phase, "Phase disabled, skipping");
            result.complete = true;
            result.skipped = true;
            return Ok(result);
        }

        let items = self.items().await?;
        let total = items.len();
        let chunk_size = self.store().chunk_size().max(1);
        let persist_every = self.config.scan.persist_every_chunks.max(1);
        let ctx = PhaseContext {
            library: self.library.as_ref(),
            recognizer: self.recognizer.as_ref(),
            config: &self.config,
            cache: &self.cache,
        };

        let start_offset = self.store().next_offset(phase);
        if start_offset < total {
            info!(%phase, offset = start_offset, total, "Phase started");
        }

        let mut chunks = 0usize;
        loop {
            let offset = self.store().next_offset(phase);
            if offset >= total {
                result.complete = true;
                break;
            }
            if max_chunks.is_some_and(|max| chunks >= max) || cancel.is_some_and(|c| c.is_cancelled()) {
                break;
            }

            let end = (offset + chunk_size).min(total);
            let chunk = process_chunk(&ctx, phase, offset / chunk_size, end, &items[offset..end]).await;
            let added = self.store().record_chunk(chunk);

            chunks += 1;
            result.items_processed += end - offset;
            result.newly_classified += added;
            observer.on_chunk(&ChunkProgress {
                phase,
                processed: end,
                total,
                newly_classified: added,
            });
            if chunks % persist_every == 0 {
                self.flush();
            }
        }

        self.flush();
        if result.complete && start_offset < total {
            info!(
                %phase,
                items = result.items_processed,
                newly_classified = result.newly_classified,
                "Phase complete"
            );
        }
        Ok(result)
    }

    /// Run every phase to the end: primary first, then similar, duplicate and
    /// large-video together, then blur and text together.
    ///
    /// Cancellation is honoured between chunks; progress made so far is kept.
    pub async fn run_to_completion(
        &self,
        cancel: &CancellationToken,
        observer: &dyn ProgressObserver,
    ) -> Result<RunSummary> {
        let run = move |phase: Phase| self.drive(phase, None, Some(cancel), observer);

        let mut phases = vec![run(Phase::Primary).await?];
        if !cancel.is_cancelled() {
            let (similar, duplicate, large) =
                tokio::join!(run(Phase::Similar), run(Phase::Duplicate), run(Phase::LargeVideo));
            phases.extend([similar?, duplicate?, large?]);
        }
        if !cancel.is_cancelled() {
            let (blur, text) = tokio::join!(run(Phase::Blur), run(Phase::Text));
            phases.extend([blur?, text?]);
        }

        let complete = phases.len() == Phase::ALL.len() && phases.iter().all(|p| p.complete);
        Ok(RunSummary {
            cancelled: !complete && cancel.is_cancelled(),
            phases,
            total_bytes: self.snapshot().total_bytes(),
        })
    }

    /// Remove identifiers from every category and persist immediately.
    ///
    /// Returns the bytes deducted.
    pub fn remove_items(&self, ids: &[String]) -> Result<u64> {
        let set: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut store = self.store();
        let removed = store.remove_items(&set, &self.cache);
        let maps = store.maps().clone();
        drop(store);
        self.publish(maps);
        Ok(removed?)
    }
}
