//! Folding per-run clusters into the persistent, ever-growing partition.

use std::collections::HashSet;

use super::Group;

/// Merge raw clusters into `existing`, one cluster at a time.
///
/// Each cluster absorbs every existing group it intersects; those groups are
/// removed and the union is appended. Groups stay pairwise disjoint and are
/// never split. Returns the identifiers that were in no group before, in the
/// order they were first grouped.
pub fn merge_groups(existing: &mut Vec<Group>, raw: impl IntoIterator<Item = Group>) -> Vec<String> {
    let mut grouped: HashSet<String> = existing.iter().flatten().cloned().collect();
    let mut newly_grouped = Vec::new();

    for cluster in raw {
        if cluster.len() < 2 {
            continue;
        }
        for id in &cluster {
            if grouped.insert(id.clone()) {
                newly_grouped.push(id.clone());
            }
        }

        let mut merged = cluster;
        let mut kept = Vec::with_capacity(existing.len());
        for group in existing.drain(..) {
            if group.is_disjoint(&merged) {
                kept.push(group);
            } else {
                merged.extend(group);
            }
        }
        kept.push(merged);
        *existing = kept;
    }

    debug_assert!(is_partition(existing));
    newly_grouped
}

/// No identifier appears in two groups.
pub fn is_partition(groups: &[Group]) -> bool {
    let mut seen = HashSet::new();
    groups.iter().flatten().all(|id| seen.insert(id.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn group(ids: &[&str]) -> Group {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn normalized(groups: &[Group]) -> BTreeSet<Group> {
        groups.iter().cloned().collect()
    }

    #[test]
    fn test_disjoint_clusters_are_appended() {
        let mut groups = vec![group(&["a", "b"])];
        let new = merge_groups(&mut groups, vec![group(&["c", "d"])]);
        assert_eq!(groups.len(), 2);
        assert_eq!(new, vec!["c", "d"]);
        assert!(is_partition(&groups));
    }

    #[test]
    fn test_bridging_cluster_merges_groups() {
        let mut groups = vec![group(&["a", "b"]), group(&["c", "d"]), group(&["x", "y"])];
        let new = merge_groups(&mut groups, vec![group(&["b", "c", "e"])]);
        assert_eq!(new, vec!["e"]);
        assert_eq!(
            normalized(&groups),
            normalized(&[group(&["a", "b", "c", "d", "e"]), group(&["x", "y"])])
        );
        assert!(is_partition(&groups));
    }

    #[test]
    fn test_singletons_are_ignored() {
        let mut groups = Vec::new();
        let new = merge_groups(&mut groups, vec![group(&["lonely"])]);
        assert!(groups.is_empty());
        assert!(new.is_empty());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let raw = vec![group(&["a", "b"]), group(&["b", "c"]), group(&["d", "e"])];
        let mut groups = Vec::new();
        merge_groups(&mut groups, raw.clone());
        let once = normalized(&groups);

        let new = merge_groups(&mut groups, raw);
        assert!(new.is_empty());
        assert_eq!(normalized(&groups), once);
        assert!(is_partition(&groups));
    }

    #[test]
    fn test_merge_is_order_independent() {
        let raw = vec![
            group(&["a", "b"]),
            group(&["c", "d"]),
            group(&["b", "c"]),
            group(&["e", "f"]),
            group(&["f", "g", "h"]),
        ];
        let mut forward = Vec::new();
        merge_groups(&mut forward, raw.clone());

        let mut backward = Vec::new();
        merge_groups(&mut backward, raw.into_iter().rev());

        assert_eq!(normalized(&forward), normalized(&backward));
        assert!(is_partition(&forward));
        assert!(is_partition(&backward));
    }
}
