//! Approximate-match clustering: LSH banding, union-find and group merging.
//!
//! Clustering never compares all pairs. Candidates meet only when they share
//! a band bucket (and, for duplicates, a dimension/timestamp bucket); accepted
//! pairs are joined with union-find and each component becomes a group.

pub mod consolidate;
pub mod lsh;
pub mod policy;
pub mod union_find;

use std::collections::BTreeSet;

pub use consolidate::{is_partition, merge_groups};
pub use policy::{aspect_close, find_duplicate_groups, find_similar_groups, MatchPolicy};
pub use union_find::DisjointSet;

use crate::types::{Fingerprint, MediaItem};

/// A set of identifiers judged to show the same content.
pub type Group = BTreeSet<String>;

/// One fingerprinted item offered to the clustering engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub fingerprint: Fingerprint,
    /// Creation time in whole seconds
    pub created_at: i64,
    pub is_image: bool,
}

impl Candidate {
    pub fn new(item: &MediaItem, fingerprint: Fingerprint) -> Self {
        Self {
            id: item.id.clone(),
            fingerprint,
            created_at: item.created_at,
            is_image: item.is_image(),
        }
    }
}
