//! Duplicate and similar match policies on top of banding and union-find.

use std::collections::HashMap;

use super::lsh::{band_buckets, candidate_pairs};
use super::union_find::DisjointSet;
use super::{Candidate, Group};
use crate::config::{DuplicateConfig, SimilarConfig};
use crate::fingerprint::hamming_distance;
use crate::types::Fingerprint;

/// Pair acceptance rule shared by both policies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    pub max_phash_distance: u32,
    pub max_dhash_distance: u32,
    /// Reject early when the pHash distance exceeds this
    pub phash_prefilter: Option<u32>,
    pub max_bucket_size: usize,
    pub aspect_tolerance: f64,
}

impl From<&DuplicateConfig> for MatchPolicy {
    fn from(config: &DuplicateConfig) -> Self {
        Self {
            max_phash_distance: config.max_phash_distance,
            max_dhash_distance: config.max_dhash_distance,
            phash_prefilter: Some(config.phash_prefilter),
            max_bucket_size: config.max_bucket_size,
            aspect_tolerance: config.aspect_tolerance,
        }
    }
}

impl From<&SimilarConfig> for MatchPolicy {
    fn from(config: &SimilarConfig) -> Self {
        Self {
            max_phash_distance: config.max_phash_distance,
            max_dhash_distance: config.max_dhash_distance,
            phash_prefilter: None,
            max_bucket_size: config.max_bucket_size,
            aspect_tolerance: config.aspect_tolerance,
        }
    }
}

impl MatchPolicy {
    pub fn accepts(&self, a: &Fingerprint, b: &Fingerprint) -> bool {
        if !aspect_close((a.width, a.height), (b.width, b.height), self.aspect_tolerance) {
            return false;
        }
        let phash = hamming_distance(a.phash, b.phash);
        if self.phash_prefilter.is_some_and(|limit| phash > limit) {
            return false;
        }
        phash <= self.max_phash_distance
            && hamming_distance(a.dhash, b.dhash) <= self.max_dhash_distance
    }

    /// Cluster `members` (indices into `candidates`) and return identifier groups.
    fn cluster(&self, candidates: &[Candidate], members: &[usize]) -> Vec<Group> {
        let buckets = band_buckets(
            members
                .iter()
                .enumerate()
                .map(|(local, &global)| (local, candidates[global].fingerprint.phash)),
        );
        let mut set = DisjointSet::new(members.len());
        for (i, j) in candidate_pairs(&buckets, self.max_bucket_size) {
            let (a, b) = (&candidates[members[i]], &candidates[members[j]]);
            if self.accepts(&a.fingerprint, &b.fingerprint) {
                set.union(i, j);
            }
        }
        set.components()
            .into_iter()
            .map(|component| {
                component
                    .into_iter()
                    .map(|local| candidates[members[local]].id.clone())
                    .collect()
            })
            .collect()
    }
}

/// Relative aspect-ratio difference within `tolerance`.
///
/// Ratios are `width / max(1, height)`, compared against the larger ratio.
pub fn aspect_close(a: (u32, u32), b: (u32, u32), tolerance: f64) -> bool {
    let ratio = |(w, h): (u32, u32)| f64::from(w) / f64::from(h.max(1));
    let (ra, rb) = (ratio(a), ratio(b));
    let larger = ra.max(rb);
    if larger == 0.0 {
        return true;
    }
    (ra - rb).abs() / larger <= tolerance
}

fn sort_groups(mut groups: Vec<Group>) -> Vec<Group> {
    groups.sort_by(|a, b| a.iter().next().cmp(&b.iter().next()));
    groups
}

/// Near-exact duplicates among images.
///
/// Items are first bucketed by `(width, height, creation second)`; banding and
/// pair checks only happen inside those buckets.
pub fn find_duplicate_groups(candidates: &[Candidate], config: &DuplicateConfig) -> Vec<Group> {
    let policy = MatchPolicy::from(config);
    let mut buckets: HashMap<(u32, u32, i64), Vec<usize>> = HashMap::new();
    for (index, candidate) in candidates.iter().enumerate() {
        if !candidate.is_image {
            continue;
        }
        let fp = &candidate.fingerprint;
        buckets
            .entry((fp.width, fp.height, candidate.created_at))
            .or_default()
            .push(index);
    }

    let groups = buckets
        .values()
        .filter(|members| members.len() >= 2)
        .flat_map(|members| policy.cluster(candidates, members))
        .collect();
    sort_groups(groups)
}

/// Visually similar items, images and video frames alike.
pub fn find_similar_groups(candidates: &[Candidate], config: &SimilarConfig) -> Vec<Group> {
    let policy = MatchPolicy::from(config);
    let members: Vec<usize> = (0..candidates.len()).collect();
    sort_groups(policy.cluster(candidates, &members))
}
