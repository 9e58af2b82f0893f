//! Snapshot & progress store: chunked, versioned, resumable persistence.
//!
//! Layout under the store directory:
//!
//! ```text
//! progress.json                      per-phase cursors, collection id
//! maps.json                          classification maps base + removals
//! dashboard.json                     summary of maps.json
//! fingerprints.json                  fingerprint cache
//! segments/segment_{i}.json          sorted item list, one chunk per file
//! results/{phase}/chunk_{i}.json     what chunk i of a phase produced
//! ```
//!
//! A flush writes chunk results first and the cursor after them, so a crash
//! leaves each cursor on its last fully written chunk. Opening the store
//! replays committed chunk results onto `maps.json`; replay is idempotent.

pub mod maps;
pub mod records;

pub use maps::{CategoryMap, ClassificationMaps, Dashboard, DashboardCell, GroupedMap};
pub use records::{ChunkResult, PhaseState, ProgressRecord, SCHEMA_VERSION};

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::fingerprint::FingerprintCache;
use crate::types::{Fingerprint, MediaItem, Phase};
use records::{FingerprintRecord, MapsRecord, SchemaTag, SegmentRecord};

const PROGRESS_FILE: &str = "progress.json";
const MAPS_FILE: &str = "maps.json";
const DASHBOARD_FILE: &str = "dashboard.json";
const FINGERPRINTS_FILE: &str = "fingerprints.json";
const SEGMENTS_DIR: &str = "segments";
const RESULTS_DIR: &str = "results";

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Outcome of comparing the enumerated collection with the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    /// Same identifiers and chunking; cursors kept
    Unchanged,
    /// First scan into this store
    Initialized,
    /// Identifiers or chunking changed; cursors reset, maps pruned
    Changed,
}

/// Order in which items are chunked: newest first, ties by identifier.
pub fn sort_items(items: &mut [MediaItem]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// BLAKE3 over the identifiers in chunk order plus their count.
///
/// The input order does not matter. A timestamp edit that moves an item to
/// another position changes the id; one that keeps the order does not.
pub fn collection_id(items: &[MediaItem]) -> String {
    let mut ordered: Vec<&MediaItem> = items.iter().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(ordered.len() as u64).to_le_bytes());
    for item in ordered {
        hasher.update(item.id.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().to_string()
}

/// Dashboard as written to disk.
#[derive(Serialize)]
struct Tagged<'a, T: Serialize> {
    schema_version: u32,
    #[serde(flatten)]
    body: &'a T,
}

/// `maps.json` serialized without cloning the maps.
#[derive(Serialize)]
struct MapsRecordRef<'a> {
    schema_version: u32,
    maps: &'a ClassificationMaps,
    removed: &'a BTreeSet<String>,
    updated_at: u64,
}

/// Owner of all persisted analysis state for one scanned collection.
#[derive(Debug)]
pub struct SnapshotStore {
    root: PathBuf,
    /// Cursors as last committed by a flush (or replay)
    progress: ProgressRecord,
    /// Offsets processed in memory, ahead of or equal to `progress`
    cursors: BTreeMap<Phase, usize>,
    maps: ClassificationMaps,
    removed: BTreeSet<String>,
    pending: VecDeque<ChunkResult>,
}

impl SnapshotStore {
    /// Open or create the store at `root`.
    ///
    /// Unreadable or outdated records start the store cold; only a directory
    /// that cannot be created is an error.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Open {
            path: root.clone(),
            source,
        })?;

        let mut store = Self {
            root,
            progress: ProgressRecord::empty(),
            cursors: BTreeMap::new(),
            maps: ClassificationMaps::default(),
            removed: BTreeSet::new(),
            pending: VecDeque::new(),
        };

        let progress = match read_json::<ProgressRecord>(&store.path(PROGRESS_FILE)) {
            Ok(progress) => progress,
            Err(e) => {
                warn!(error = %e, "Progress record unusable, starting cold");
                None
            }
        };
        let Some(progress) = progress else {
            store.discard_derived();
            return Ok(store);
        };
        store.progress = progress;

        match read_json::<MapsRecord>(&store.path(MAPS_FILE)) {
            Ok(Some(record)) => {
                store.maps = record.maps;
                store.removed = record.removed;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Maps record unusable, rebuilding from chunk results"),
        }

        store.replay();
        store.sync_cursors();
        info!(
            root = %store.root.display(),
            items = store.progress.total_items,
            total_bytes = store.maps.total_bytes(),
            "Opened snapshot store"
        );
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn segment_path(&self, index: usize) -> PathBuf {
        self.root
            .join(SEGMENTS_DIR)
            .join(format!("segment_{index}.json"))
    }

    fn result_path(&self, phase: Phase, chunk_index: usize) -> PathBuf {
        self.root
            .join(RESULTS_DIR)
            .join(phase.as_str())
            .join(format!("chunk_{chunk_index}.json"))
    }

    /// Committed cursors.
    pub fn progress(&self) -> &ProgressRecord {
        &self.progress
    }

    /// Live classification maps, including unflushed chunks.
    pub fn maps(&self) -> &ClassificationMaps {
        &self.maps
    }

    pub fn dashboard(&self) -> Dashboard {
        self.maps.summary()
    }

    pub fn total_items(&self) -> usize {
        self.progress.total_items
    }

    pub fn chunk_size(&self) -> usize {
        self.progress.chunk_size
    }

    /// Whether a collection has been recorded.
    pub fn has_collection(&self) -> bool {
        !self.progress.collection_id.is_empty()
    }

    /// Next offset to process for `phase`, counting unflushed chunks.
    pub fn next_offset(&self, phase: Phase) -> usize {
        self.cursors.get(&phase).copied().unwrap_or(0)
    }

    /// Phase state as seen in memory.
    pub fn phase_state(&self, phase: Phase) -> PhaseState {
        PhaseState::at(self.next_offset(phase), self.progress.total_items)
    }

    pub fn pending_chunks(&self) -> usize {
        self.pending.len()
    }

    fn sync_cursors(&mut self) {
        let total = self.progress.total_items;
        self.cursors = Phase::ALL
            .iter()
            .map(|&p| (p, self.progress.state(p).offset(total)))
            .collect();
    }

    /// Replay committed chunk results, rewinding a phase at its first gap.
    fn replay(&mut self) {
        let total = self.progress.total_items;
        let chunk_size = self.progress.chunk_size;
        for phase in Phase::ALL {
            for index in 0..self.progress.committed_chunks(phase) {
                let path = self.result_path(phase, index);
                match read_json::<ChunkResult>(&path) {
                    Ok(Some(result)) if result.phase == phase && result.chunk_index == index => {
                        result.apply(&mut self.maps);
                    }
                    outcome => {
                        if let Err(e) = outcome {
                            warn!(error = %e, "Chunk result unusable");
                        }
                        warn!(%phase, chunk = index, "Rewinding phase to its first missing chunk");
                        self.progress.set(phase, PhaseState::at(index * chunk_size, total));
                        break;
                    }
                }
            }
        }
        if !self.removed.is_empty() {
            let ids: HashSet<&str> = self.removed.iter().map(String::as_str).collect();
            self.maps.remove_items(&ids);
        }
    }

    /// Remove segments and chunk results; they are only valid for one collection.
    fn discard_derived(&self) {
        for dir in [SEGMENTS_DIR, RESULTS_DIR] {
            let path = self.path(dir);
            if let Err(e) = fs::remove_dir_all(&path) {
                if e.kind() != ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed to discard stale records");
                }
            }
        }
    }

    /// Compare `items` with the stored collection and reset if it differs.
    ///
    /// `items` is sorted into chunk order in place. On change, cursors start
    /// over, segments and chunk results are discarded, and vanished
    /// identifiers are pruned from the maps and from `fingerprints`.
    pub fn reset_if_collection_changed(
        &mut self,
        items: &mut [MediaItem],
        chunk_size: usize,
        fingerprints: &FingerprintCache,
    ) -> CollectionStatus {
        sort_items(items);
        let id = collection_id(items);
        let chunk_size = chunk_size.max(1);

        if self.progress.collection_id == id && self.progress.chunk_size == chunk_size {
            if !self.segment_path(0).exists() && !items.is_empty() {
                self.write_segments(items);
            }
            return CollectionStatus::Unchanged;
        }

        let status = if self.has_collection() {
            CollectionStatus::Changed
        } else {
            CollectionStatus::Initialized
        };

        self.discard_derived();
        self.pending.clear();
        self.removed.clear();

        let present: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
        let vanished: Vec<String> = self
            .maps
            .all_ids()
            .into_iter()
            .filter(|id| !present.contains(id))
            .map(str::to_string)
            .collect();
        if !vanished.is_empty() {
            let ids: HashSet<&str> = vanished.iter().map(String::as_str).collect();
            let bytes = self.maps.remove_items(&ids);
            info!(vanished = vanished.len(), bytes, "Pruned vanished items from maps");
        }
        let evicted = fingerprints.retain_ids(&present);
        if evicted > 0 {
            info!(evicted, "Evicted fingerprints of vanished items");
        }

        self.progress = ProgressRecord::new(id, items.len(), chunk_size);
        for phase in Phase::ALL {
            self.progress.set(phase, PhaseState::at(0, items.len()));
        }
        self.sync_cursors();
        self.write_segments(items);

        if let Err(e) = self.write_state().and_then(|()| self.save_fingerprints(fingerprints)) {
            warn!(error = %e, "Failed to persist reset state, will retry at next flush");
        }
        match status {
            CollectionStatus::Changed => info!(items = items.len(), "Collection changed, cursors reset"),
            _ => info!(items = items.len(), "Collection recorded"),
        }
        status
    }

    fn write_segments(&self, items: &[MediaItem]) {
        for (index, chunk) in items.chunks(self.progress.chunk_size.max(1)).enumerate() {
            let record = SegmentRecord {
                schema_version: SCHEMA_VERSION,
                index,
                items: chunk.to_vec(),
            };
            if let Err(e) = write_json(&self.segment_path(index), &record) {
                warn!(error = %e, "Failed to write item segment");
                return;
            }
        }
    }

    /// Reassemble the sorted item list from segments.
    pub fn load_items(&self) -> StoreResult<Vec<MediaItem>> {
        let total = self.progress.total_items;
        let segments = total.div_ceil(self.progress.chunk_size.max(1));
        let mut items = Vec::with_capacity(total);
        for index in 0..segments {
            let path = self.segment_path(index);
            let record = read_json::<SegmentRecord>(&path)?.ok_or_else(|| StoreError::Read {
                path: path.clone(),
                message: "segment missing".to_string(),
            })?;
            items.extend(record.items);
        }
        if items.len() != total {
            return Err(StoreError::Read {
                path: self.path(SEGMENTS_DIR),
                message: format!("expected {total} items, found {}", items.len()),
            });
        }
        Ok(items)
    }

    /// Persisted fingerprints; empty when absent or unusable.
    pub fn load_fingerprints(&self) -> HashMap<String, Fingerprint> {
        match read_json::<FingerprintRecord>(&self.path(FINGERPRINTS_FILE)) {
            Ok(Some(record)) => record.entries,
            Ok(None) => HashMap::new(),
            Err(e) => {
                warn!(error = %e, "Fingerprint cache unusable, recomputing");
                HashMap::new()
            }
        }
    }

    /// Fold a chunk result into the maps and queue it for the next flush.
    ///
    /// Returns how many identifiers were newly classified.
    pub fn record_chunk(&mut self, mut result: ChunkResult) -> usize {
        if !self.removed.is_empty() {
            result.retain_ids(|id| !self.removed.contains(id));
        }
        let added = result.apply(&mut self.maps);
        self.cursors.insert(result.phase, result.end_offset);
        debug!(
            phase = %result.phase,
            chunk = result.chunk_index,
            added,
            "Recorded chunk result"
        );
        self.pending.push_back(result);
        added
    }

    /// Write pending chunk results, then cursors, maps, dashboard and
    /// fingerprints.
    ///
    /// Stops at the first failure; everything unwritten stays queued and is
    /// retried by the next flush.
    pub fn flush(&mut self, fingerprints: &FingerprintCache) -> StoreResult<()> {
        while let Some(result) = self.pending.front() {
            write_json(&self.result_path(result.phase, result.chunk_index), result)?;
            let state = PhaseState::at(result.end_offset, self.progress.total_items);
            self.progress.set(result.phase, state);
            self.pending.pop_front();
        }
        self.write_state()?;
        self.save_fingerprints(fingerprints)
    }

    fn save_fingerprints(&self, fingerprints: &FingerprintCache) -> StoreResult<()> {
        let Some(entries) = fingerprints.take_dirty_snapshot() else {
            return Ok(());
        };
        let record = FingerprintRecord {
            schema_version: SCHEMA_VERSION,
            entries,
        };
        write_json(&self.path(FINGERPRINTS_FILE), &record).inspect_err(|_| fingerprints.mark_dirty())
    }

    fn write_state(&mut self) -> StoreResult<()> {
        let now = unix_now();
        self.progress.updated_at = now;
        write_json(&self.path(PROGRESS_FILE), &self.progress)?;
        let record = MapsRecordRef {
            schema_version: SCHEMA_VERSION,
            maps: &self.maps,
            removed: &self.removed,
            updated_at: now,
        };
        write_json(&self.path(MAPS_FILE), &record)?;
        let dashboard = self.maps.summary();
        write_json(
            &self.path(DASHBOARD_FILE),
            &Tagged {
                schema_version: SCHEMA_VERSION,
                body: &dashboard,
            },
        )
    }

    /// Strip identifiers from every category and persist immediately.
    ///
    /// Returns the bytes deducted. Removed identifiers stay out of the maps
    /// even when chunk results mentioning them are replayed, and their
    /// fingerprints are evicted.
    pub fn remove_items(&mut self, ids: &HashSet<&str>, fingerprints: &FingerprintCache) -> StoreResult<u64> {
        let bytes = self.maps.remove_items(ids);
        self.removed.extend(ids.iter().map(|id| id.to_string()));
        let evicted = fingerprints.remove_many(ids);
        info!(items = ids.len(), bytes, evicted, "Removed items from classification maps");
        self.write_state()?;
        self.save_fingerprints(fingerprints)?;
        Ok(bytes)
    }

    /// Delete every record and start empty.
    pub fn clear(&mut self) -> StoreResult<()> {
        self.discard_derived();
        for name in [PROGRESS_FILE, MAPS_FILE, DASHBOARD_FILE, FINGERPRINTS_FILE] {
            let path = self.path(name);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StoreError::Write {
                        path,
                        message: e.to_string(),
                    })
                }
            }
        }
        self.progress = ProgressRecord::empty();
        self.cursors.clear();
        self.maps = ClassificationMaps::default();
        self.removed.clear();
        self.pending.clear();
        info!(root = %self.root.display(), "Cleared snapshot store");
        Ok(())
    }
}

/// Read a versioned record. A missing file is `Ok(None)`.
fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    };
    let parse_error = |e: serde_json::Error| StoreError::Read {
        path: path.to_path_buf(),
        message: format!("Failed to parse record: {e}"),
    };
    let tag: SchemaTag = serde_json::from_str(&content).map_err(parse_error)?;
    if tag.schema_version != SCHEMA_VERSION {
        return Err(StoreError::SchemaMismatch {
            path: path.to_path_buf(),
            found: tag.schema_version,
            expected: SCHEMA_VERSION,
        });
    }
    serde_json::from_str(&content).map(Some).map_err(parse_error)
}

/// Write a record atomically through a sibling temp file.
fn write_json<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let write_error = |message: String| StoreError::Write {
        path: path.to_path_buf(),
        message,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| write_error(format!("Failed to create {parent:?}: {e}")))?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| write_error(format!("Failed to serialize record: {e}")))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json.as_bytes()).map_err(|e| write_error(format!("Failed to write {tmp:?}: {e}")))?;
    fs::rename(&tmp, path).map_err(|e| write_error(format!("Failed to replace {path:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssetEntry, Category, MediaKind};
    use tempfile::tempdir;

    fn items(n: usize) -> Vec<MediaItem> {
        (0..n)
            .map(|i| MediaItem::new(format!("item-{i:02}"), MediaKind::Image, 100, 100, i as i64, 10))
            .collect()
    }

    fn entry(id: &str) -> AssetEntry {
        AssetEntry {
            id: id.to_string(),
            size_bytes: 10,
            created_at: 0,
        }
    }

    fn blurry_chunk(index: usize, end: usize, ids: &[&str]) -> ChunkResult {
        let mut result = ChunkResult::new(Phase::Blur, index, end);
        result
            .singles
            .insert(Category::Blurry, ids.iter().map(|id| entry(id)).collect());
        result
    }

    fn started(dir: &Path, n: usize, chunk_size: usize) -> SnapshotStore {
        let mut store = SnapshotStore::open(dir).unwrap();
        let mut list = items(n);
        store.reset_if_collection_changed(&mut list, chunk_size, &FingerprintCache::new());
        store
    }

    fn fp(phash: u64) -> Fingerprint {
        Fingerprint {
            phash,
            dhash: 2,
            width: 3,
            height: 4,
        }
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested").join("store");
        let store = SnapshotStore::open(&root).unwrap();
        assert!(root.is_dir());
        assert!(!store.has_collection());
    }

    #[test]
    fn test_open_fails_when_root_is_a_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("occupied");
        fs::write(&file, "x").unwrap();
        let err = SnapshotStore::open(&file).unwrap_err();
        assert!(matches!(err, StoreError::Open { .. }));
    }

    #[test]
    fn test_collection_id_tracks_chunk_order() {
        let mut list = items(5);
        let a = collection_id(&list);
        list.reverse();
        assert_eq!(collection_id(&list), a);
        assert_ne!(collection_id(&list[..4]), a);

        // Newest stays newest: same order, same id.
        let mut retimed = items(5);
        retimed[4].created_at = 50;
        assert_eq!(collection_id(&retimed), a);

        // Oldest becomes newest: every chunk boundary moves.
        let mut reordered = items(5);
        reordered[0].created_at = 100;
        assert_ne!(collection_id(&reordered), a);
    }

    #[test]
    fn test_reorder_resets_cursors() {
        let dir = tempdir().unwrap();
        let mut store = started(dir.path(), 4, 2);
        store.record_chunk(blurry_chunk(0, 2, &[]));
        store.flush(&FingerprintCache::new()).unwrap();
        assert_eq!(store.next_offset(Phase::Blur), 2);

        let mut list = items(4);
        list[0].created_at = 100;
        let status = store.reset_if_collection_changed(&mut list, 2, &FingerprintCache::new());
        assert_eq!(status, CollectionStatus::Changed);
        assert_eq!(store.next_offset(Phase::Blur), 0);
        assert_eq!(store.load_items().unwrap()[0].id, "item-00");
    }

    #[test]
    fn test_reset_sorts_newest_first_and_writes_segments() {
        let dir = tempdir().unwrap();
        let mut store = SnapshotStore::open(dir.path()).unwrap();
        let mut list = items(5);
        let cache = FingerprintCache::new();
        assert_eq!(
            store.reset_if_collection_changed(&mut list, 2, &cache),
            CollectionStatus::Initialized
        );
        assert_eq!(list[0].id, "item-04");
        assert_eq!(
            store.reset_if_collection_changed(&mut list, 2, &cache),
            CollectionStatus::Unchanged
        );

        let loaded = store.load_items().unwrap();
        assert_eq!(loaded, list);
        assert!(dir.path().join("segments").join("segment_2.json").exists());
    }

    #[test]
    fn test_flush_commits_and_reopen_replays() {
        let dir = tempdir().unwrap();
        let cache = FingerprintCache::new();
        {
            let mut store = started(dir.path(), 4, 2);
            store.record_chunk(blurry_chunk(0, 2, &["item-03"]));
            store.record_chunk(blurry_chunk(1, 4, &["item-00"]));
            assert_eq!(store.progress().state(Phase::Blur), PhaseState::NotStarted);
            store.flush(&cache).unwrap();
            assert_eq!(store.progress().state(Phase::Blur), PhaseState::Complete);
        }
        // Simulate a crash after the cursor but before maps.json.
        fs::remove_file(dir.path().join("maps.json")).unwrap();

        let store = SnapshotStore::open(dir.path()).unwrap();
        assert_eq!(store.maps().blurry.len(), 2);
        assert_eq!(store.maps().blurry.total_bytes, 20);
        assert!(store.phase_state(Phase::Blur).is_complete());
        assert!(dir.path().join("dashboard.json").exists());
    }

    #[test]
    fn test_unflushed_chunks_are_redone() {
        let dir = tempdir().unwrap();
        {
            let mut store = started(dir.path(), 4, 2);
            store.record_chunk(blurry_chunk(0, 2, &["item-03"]));
            assert_eq!(store.next_offset(Phase::Blur), 2);
        }
        let store = SnapshotStore::open(dir.path()).unwrap();
        assert_eq!(store.next_offset(Phase::Blur), 0);
        assert!(store.maps().blurry.is_empty());
    }

    #[test]
    fn test_corrupt_chunk_rewinds_phase() {
        let dir = tempdir().unwrap();
        {
            let mut store = started(dir.path(), 6, 2);
            for i in 0..3 {
                store.record_chunk(blurry_chunk(i, (i + 1) * 2, &[]));
            }
            store.flush(&FingerprintCache::new()).unwrap();
        }
        let chunk = dir.path().join("results").join("blur").join("chunk_1.json");
        fs::write(&chunk, "{ not json").unwrap();

        let store = SnapshotStore::open(dir.path()).unwrap();
        assert_eq!(store.next_offset(Phase::Blur), 2);
        assert_eq!(store.progress().state(Phase::Blur), PhaseState::InProgress { offset: 2 });
    }

    #[test]
    fn test_schema_mismatch_starts_cold() {
        let dir = tempdir().unwrap();
        {
            let mut store = started(dir.path(), 2, 2);
            store.record_chunk(blurry_chunk(0, 2, &["item-01"]));
            store.flush(&FingerprintCache::new()).unwrap();
        }
        let path = dir.path().join("progress.json");
        let bumped = fs::read_to_string(&path)
            .unwrap()
            .replace("\"schema_version\": 1", "\"schema_version\": 999");
        fs::write(&path, bumped).unwrap();

        let store = SnapshotStore::open(dir.path()).unwrap();
        assert!(!store.has_collection());
        assert!(store.maps().blurry.is_empty());
        assert!(!dir.path().join("results").exists());
    }

    #[test]
    fn test_collection_change_prunes_and_resets() {
        let dir = tempdir().unwrap();
        let mut store = started(dir.path(), 4, 2);
        store.record_chunk(blurry_chunk(0, 2, &["item-03", "item-02"]));
        store.flush(&FingerprintCache::new()).unwrap();

        let cache = FingerprintCache::new();
        for id in ["item-00", "item-03"] {
            cache.insert(id.into(), fp(1));
        }
        store.flush(&cache).unwrap();

        let mut smaller: Vec<MediaItem> = items(4).into_iter().filter(|i| i.id != "item-03").collect();
        assert_eq!(
            store.reset_if_collection_changed(&mut smaller, 2, &cache),
            CollectionStatus::Changed
        );
        assert_eq!(store.next_offset(Phase::Blur), 0);
        assert_eq!(store.maps().blurry.len(), 1);
        assert_eq!(store.maps().blurry.total_bytes, 10);
        assert!(!dir.path().join("results").exists());

        assert!(cache.get("item-03").is_none());
        let persisted = SnapshotStore::open(dir.path()).unwrap().load_fingerprints();
        assert_eq!(persisted.len(), 1);
        assert!(persisted.contains_key("item-00"));
    }

    #[test]
    fn test_chunk_size_change_counts_as_change() {
        let dir = tempdir().unwrap();
        let mut store = started(dir.path(), 4, 2);
        let mut list = items(4);
        assert_eq!(
            store.reset_if_collection_changed(&mut list, 3, &FingerprintCache::new()),
            CollectionStatus::Changed
        );
    }

    #[test]
    fn test_write_failure_is_retried() {
        let dir = tempdir().unwrap();
        let mut store = started(dir.path(), 2, 2);
        fs::write(dir.path().join("results"), "blocking file").unwrap();

        store.record_chunk(blurry_chunk(0, 2, &["item-01"]));
        assert!(matches!(
            store.flush(&FingerprintCache::new()),
            Err(StoreError::Write { .. })
        ));
        assert_eq!(store.pending_chunks(), 1);
        assert_eq!(store.progress().state(Phase::Blur), PhaseState::NotStarted);

        fs::remove_file(dir.path().join("results")).unwrap();
        store.flush(&FingerprintCache::new()).unwrap();
        assert_eq!(store.pending_chunks(), 0);
        assert!(store.progress().state(Phase::Blur).is_complete());
    }

    #[test]
    fn test_removed_items_survive_replay() {
        let dir = tempdir().unwrap();
        {
            let mut store = started(dir.path(), 2, 2);
            store.record_chunk(blurry_chunk(0, 2, &["item-01", "item-00"]));
            store.flush(&FingerprintCache::new()).unwrap();
            let cache = FingerprintCache::new();
            cache.insert("item-01".into(), fp(1));
            cache.insert("item-00".into(), fp(2));
            let ids: HashSet<&str> = ["item-01"].into_iter().collect();
            assert_eq!(store.remove_items(&ids, &cache).unwrap(), 10);
        }
        let store = SnapshotStore::open(dir.path()).unwrap();
        assert_eq!(store.maps().blurry.len(), 1);
        assert_eq!(store.maps().blurry.entries[0].id, "item-00");
        let fingerprints = store.load_fingerprints();
        assert!(!fingerprints.contains_key("item-01"));
        assert!(fingerprints.contains_key("item-00"));
    }

    #[test]
    fn test_fingerprints_persist() {
        let dir = tempdir().unwrap();
        let cache = FingerprintCache::new();
        cache.insert("item-00".into(), fp(1));
        let mut store = started(dir.path(), 1, 1);
        store.flush(&cache).unwrap();

        let reopened = SnapshotStore::open(dir.path()).unwrap();
        assert_eq!(reopened.load_fingerprints()["item-00"].dhash, 2);
    }

    #[test]
    fn test_clear_removes_everything() {
        let dir = tempdir().unwrap();
        let mut store = started(dir.path(), 2, 2);
        store.flush(&FingerprintCache::new()).unwrap();
        store.clear().unwrap();
        assert!(!dir.path().join("progress.json").exists());
        assert!(!dir.path().join("segments").exists());
        assert!(!store.has_collection());
    }
}
