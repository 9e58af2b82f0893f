//! Persisted record shapes. Every record carries `schema_version`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::maps::ClassificationMaps;
use crate::types::{AssetEntry, Category, Fingerprint, MediaItem, Phase};

/// Bumped whenever a record shape or a classification rule changes.
pub const SCHEMA_VERSION: u32 = 1;

/// First pass over any record: only the version is looked at.
#[derive(Debug, Deserialize)]
pub(crate) struct SchemaTag {
    #[serde(default)]
    pub schema_version: u32,
}

/// Cursor of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PhaseState {
    #[default]
    NotStarted,
    InProgress {
        offset: usize,
    },
    Complete,
}

impl PhaseState {
    /// Next item offset, given the collection length.
    pub fn offset(self, total: usize) -> usize {
        match self {
            PhaseState::NotStarted => 0,
            PhaseState::InProgress { offset } => offset.min(total),
            PhaseState::Complete => total,
        }
    }

    /// State after committing everything before `offset`.
    pub fn at(offset: usize, total: usize) -> Self {
        if offset >= total {
            PhaseState::Complete
        } else if offset == 0 {
            PhaseState::NotStarted
        } else {
            PhaseState::InProgress { offset }
        }
    }

    pub fn is_complete(self) -> bool {
        self == PhaseState::Complete
    }
}

/// `progress.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub schema_version: u32,
    /// Content fingerprint of the scanned identifier set
    pub collection_id: String,
    pub total_items: usize,
    pub chunk_size: usize,
    pub phases: BTreeMap<Phase, PhaseState>,
    pub updated_at: u64,
}

impl ProgressRecord {
    pub fn new(collection_id: String, total_items: usize, chunk_size: usize) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            collection_id,
            total_items,
            chunk_size,
            phases: Phase::ALL.iter().map(|&p| (p, PhaseState::NotStarted)).collect(),
            updated_at: super::unix_now(),
        }
    }

    /// A store with no scanned collection yet.
    pub fn empty() -> Self {
        Self::new(String::new(), 0, 0)
    }

    pub fn state(&self, phase: Phase) -> PhaseState {
        self.phases.get(&phase).copied().unwrap_or_default()
    }

    pub fn set(&mut self, phase: Phase, state: PhaseState) {
        self.phases.insert(phase, state);
    }

    /// Number of chunks whose results are committed for `phase`.
    pub fn committed_chunks(&self, phase: Phase) -> usize {
        if self.chunk_size == 0 {
            return 0;
        }
        self.state(phase).offset(self.total_items).div_ceil(self.chunk_size)
    }
}

/// `maps.json`: the base state that chunk results are replayed onto.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapsRecord {
    pub schema_version: u32,
    pub maps: ClassificationMaps,
    /// Identifiers removed by the caller; replayed results never bring them back
    #[serde(default)]
    pub removed: BTreeSet<String>,
    pub updated_at: u64,
}

/// `segments/segment_{i}.json`: one chunk worth of the sorted item list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub schema_version: u32,
    pub index: usize,
    pub items: Vec<MediaItem>,
}

/// `fingerprints.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FingerprintRecord {
    pub schema_version: u32,
    pub entries: HashMap<String, Fingerprint>,
}

/// `results/{phase}/chunk_{i}.json`: what one chunk of one phase produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkResult {
    pub schema_version: u32,
    pub phase: Phase,
    pub chunk_index: usize,
    /// Offset just past the chunk's last item
    pub end_offset: usize,
    #[serde(default)]
    pub singles: BTreeMap<Category, Vec<AssetEntry>>,
    /// Raw clusters for the phase's grouped category
    #[serde(default)]
    pub groups: Vec<Vec<AssetEntry>>,
}

impl ChunkResult {
    pub fn new(phase: Phase, chunk_index: usize, end_offset: usize) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            phase,
            chunk_index,
            end_offset,
            singles: BTreeMap::new(),
            groups: Vec::new(),
        }
    }

    /// Grouped category fed by this phase, if any.
    pub fn grouped_category(&self) -> Option<Category> {
        match self.phase {
            Phase::Similar => Some(Category::Similar),
            Phase::Duplicate => Some(Category::Duplicate),
            _ => None,
        }
    }

    /// Keep only identifiers accepted by `keep`; clusters below two are dropped.
    pub fn retain_ids(&mut self, keep: impl Fn(&str) -> bool) {
        for entries in self.singles.values_mut() {
            entries.retain(|e| keep(&e.id));
        }
        for group in &mut self.groups {
            group.retain(|e| keep(&e.id));
        }
        self.groups.retain(|g| g.len() >= 2);
    }

    /// Fold into the maps; returns how many identifiers were newly classified.
    ///
    /// Applying the same result twice changes nothing.
    pub fn apply(&self, maps: &mut ClassificationMaps) -> usize {
        let mut added = 0;
        for (category, entries) in &self.singles {
            added += maps.add_singles(*category, entries.iter().cloned());
        }
        if let Some(category) = self.grouped_category() {
            added += maps.add_groups(category, self.groups.clone());
        }
        added
    }
}
