//! Identifier-keyed fingerprint cache shared by concurrent phases.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::types::Fingerprint;

/// Fingerprints are computed once per identifier and reused by every phase
/// and every later run. Readers never block each other; writers hold the lock
/// only for a map insert.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    entries: RwLock<HashMap<String, Fingerprint>>,
    dirty: AtomicBool,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache from persisted entries; the result is clean.
    pub fn from_entries(entries: HashMap<String, Fingerprint>) -> Self {
        Self {
            entries: RwLock::new(entries),
            dirty: AtomicBool::new(false),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Fingerprint>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Fingerprint>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, id: &str) -> Option<Fingerprint> {
        self.read().get(id).copied()
    }

    pub fn insert(&self, id: String, fingerprint: Fingerprint) {
        self.write().insert(id, fingerprint);
        self.dirty.store(true, Ordering::Release);
    }

    /// Forget the given identifiers, returning how many were cached.
    pub fn remove_many(&self, ids: &HashSet<&str>) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|id, _| !ids.contains(id.as_str()));
        let removed = before - entries.len();
        if removed > 0 {
            self.dirty.store(true, Ordering::Release);
        }
        removed
    }

    /// Keep only the given identifiers, returning how many were evicted.
    pub fn retain_ids(&self, keep: &HashSet<&str>) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|id, _| keep.contains(id.as_str()));
        let evicted = before - entries.len();
        if evicted > 0 {
            self.dirty.store(true, Ordering::Release);
        }
        evicted
    }

    /// Number of cached identifiers.
    pub fn count(&self) -> usize {
        self.read().len()
    }

    /// Copy of the entries if anything changed since the last successful save.
    ///
    /// The dirty flag is cleared here; call [`mark_dirty`](Self::mark_dirty)
    /// if the save then fails.
    pub fn take_dirty_snapshot(&self) -> Option<HashMap<String, Fingerprint>> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return None;
        }
        Some(self.read().clone())
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(phash: u64) -> Fingerprint {
        Fingerprint {
            phash,
            dhash: !phash,
            width: 10,
            height: 10,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let cache = FingerprintCache::new();
        assert!(cache.get("a").is_none());
        cache.insert("a".into(), fp(1));
        assert_eq!(cache.get("a"), Some(fp(1)));
        assert_eq!(cache.count(), 1);
    }

    #[test]
    fn test_dirty_snapshot_only_after_changes() {
        let cache = FingerprintCache::from_entries(HashMap::from([("a".to_string(), fp(1))]));
        assert!(cache.take_dirty_snapshot().is_none());

        cache.insert("b".into(), fp(2));
        let snapshot = cache.take_dirty_snapshot().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(cache.take_dirty_snapshot().is_none());

        cache.mark_dirty();
        assert!(cache.take_dirty_snapshot().is_some());
    }

    #[test]
    fn test_remove_many_forgets_removed_items() {
        let cache = FingerprintCache::new();
        cache.insert("a".into(), fp(1));
        cache.insert("b".into(), fp(2));
        cache.take_dirty_snapshot();

        let removed: HashSet<&str> = ["b", "zz"].into_iter().collect();
        assert_eq!(cache.remove_many(&removed), 1);
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.take_dirty_snapshot().is_some());
    }

    #[test]
    fn test_retain_ids_evicts_everything_else() {
        let cache = FingerprintCache::new();
        for (i, id) in ["a", "b", "c"].into_iter().enumerate() {
            cache.insert(id.into(), fp(i as u64));
        }
        cache.take_dirty_snapshot();

        let keep: HashSet<&str> = ["a", "c", "new"].into_iter().collect();
        assert_eq!(cache.retain_ids(&keep), 1);
        assert_eq!(cache.count(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.take_dirty_snapshot().is_some());

        assert_eq!(cache.retain_ids(&keep), 0);
        assert!(cache.take_dirty_snapshot().is_none());
    }
}
