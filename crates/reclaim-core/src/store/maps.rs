//! Per-category classification results with byte accounting.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::cluster::{merge_groups, Group};
use crate::types::{AssetEntry, Category};

/// Flat list of classified entries, each identifier at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryMap {
    pub entries: Vec<AssetEntry>,
    pub total_bytes: u64,
}

impl CategoryMap {
    /// Append entries not already present; returns the number added.
    pub fn insert_unique(&mut self, add: impl IntoIterator<Item = AssetEntry>) -> usize {
        let mut seen: HashSet<String> = self.entries.iter().map(|e| e.id.clone()).collect();
        let mut added = 0;
        for entry in add {
            if seen.insert(entry.id.clone()) {
                self.total_bytes += entry.size_bytes;
                self.entries.push(entry);
                added += 1;
            }
        }
        added
    }

    /// Remove the given identifiers; returns the bytes deducted.
    fn strip(&mut self, ids: &HashSet<&str>) -> u64 {
        let mut removed = 0u64;
        self.entries.retain(|e| {
            if ids.contains(e.id.as_str()) {
                removed += e.size_bytes;
                false
            } else {
                true
            }
        });
        self.total_bytes = self.total_bytes.saturating_sub(removed);
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Accumulated groups of one channel (duplicate or similar).
///
/// `group_ids` is the persistent partition; `groups` is its materialized form
/// with entries sorted by size, largest first. Only groups whose entries are
/// all known are materialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupedMap {
    pub group_ids: Vec<Group>,
    pub groups: Vec<Vec<AssetEntry>>,
    pub total_bytes: u64,
}

impl GroupedMap {
    /// Merge raw clusters and rebuild the materialized groups.
    ///
    /// `entries` supplies entries for identifiers seen in this batch; entries
    /// of previously grouped identifiers are carried over. Bytes are added
    /// once per identifier that was not materialized before. Returns the
    /// number of newly grouped identifiers.
    pub fn integrate(&mut self, raw: Vec<Group>, entries: &HashMap<String, AssetEntry>) -> usize {
        if raw.is_empty() {
            return 0;
        }
        let newly_grouped = merge_groups(&mut self.group_ids, raw);

        let mut index: HashMap<String, AssetEntry> = self
            .groups
            .iter()
            .flatten()
            .map(|e| (e.id.clone(), e.clone()))
            .collect();
        let old_ids: HashSet<String> = index.keys().cloned().collect();
        for (id, entry) in entries {
            index.entry(id.clone()).or_insert_with(|| entry.clone());
        }

        self.groups = self
            .group_ids
            .iter()
            .filter_map(|ids| {
                let mut members: Vec<AssetEntry> =
                    ids.iter().filter_map(|id| index.get(id).cloned()).collect();
                members.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes).then_with(|| a.id.cmp(&b.id)));
                (members.len() >= 2).then_some(members)
            })
            .collect();

        let delta: u64 = self
            .groups
            .iter()
            .flatten()
            .filter(|e| !old_ids.contains(&e.id))
            .map(|e| e.size_bytes)
            .sum();
        self.total_bytes += delta;
        newly_grouped.len()
    }

    /// Remove identifiers from every group; groups left with fewer than two
    /// members are dropped. Returns the bytes deducted, survivors of dropped
    /// groups included.
    fn strip(&mut self, ids: &HashSet<&str>) -> u64 {
        let before = self.materialized_bytes();
        for group in &mut self.groups {
            group.retain(|e| !ids.contains(e.id.as_str()));
        }
        self.groups.retain(|g| g.len() >= 2);
        for group in &mut self.group_ids {
            group.retain(|id| !ids.contains(id.as_str()));
        }
        self.group_ids.retain(|g| g.len() >= 2);
        let removed = before - self.materialized_bytes();
        self.total_bytes = self.total_bytes.saturating_sub(removed);
        removed
    }

    fn materialized_bytes(&self) -> u64 {
        self.groups.iter().flatten().map(|e| e.size_bytes).sum()
    }

    /// Number of materialized identifiers.
    pub fn item_count(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }
}

/// All classification results of one library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationMaps {
    pub screenshot: CategoryMap,
    pub live_photo: CategoryMap,
    pub selfie: CategoryMap,
    pub back_camera: CategoryMap,
    pub all_videos: CategoryMap,
    pub large_video: CategoryMap,
    pub blurry: CategoryMap,
    pub text: CategoryMap,
    pub similar: GroupedMap,
    pub duplicate: GroupedMap,
}

impl ClassificationMaps {
    /// Flat map of a single-entry category; `None` for grouped categories.
    pub fn category(&self, category: Category) -> Option<&CategoryMap> {
        match category {
            Category::Screenshot => Some(&self.screenshot),
            Category::LivePhoto => Some(&self.live_photo),
            Category::Selfie => Some(&self.selfie),
            Category::BackCamera => Some(&self.back_camera),
            Category::AllVideos => Some(&self.all_videos),
            Category::LargeVideo => Some(&self.large_video),
            Category::Blurry => Some(&self.blurry),
            Category::Text => Some(&self.text),
            Category::Similar | Category::Duplicate => None,
        }
    }

    fn category_mut(&mut self, category: Category) -> Option<&mut CategoryMap> {
        match category {
            Category::Screenshot => Some(&mut self.screenshot),
            Category::LivePhoto => Some(&mut self.live_photo),
            Category::Selfie => Some(&mut self.selfie),
            Category::BackCamera => Some(&mut self.back_camera),
            Category::AllVideos => Some(&mut self.all_videos),
            Category::LargeVideo => Some(&mut self.large_video),
            Category::Blurry => Some(&mut self.blurry),
            Category::Text => Some(&mut self.text),
            Category::Similar | Category::Duplicate => None,
        }
    }

    /// Group channel of a grouped category; `None` for flat categories.
    pub fn grouped(&self, category: Category) -> Option<&GroupedMap> {
        match category {
            Category::Similar => Some(&self.similar),
            Category::Duplicate => Some(&self.duplicate),
            _ => None,
        }
    }

    fn grouped_mut(&mut self, category: Category) -> Option<&mut GroupedMap> {
        match category {
            Category::Similar => Some(&mut self.similar),
            Category::Duplicate => Some(&mut self.duplicate),
            _ => None,
        }
    }

    /// Insert-unique into a flat category. Returns the number added.
    pub fn add_singles(&mut self, category: Category, entries: impl IntoIterator<Item = AssetEntry>) -> usize {
        match self.category_mut(category) {
            Some(map) => map.insert_unique(entries),
            None => 0,
        }
    }

    /// Merge clusters into a grouped category. Returns newly grouped count.
    pub fn add_groups(&mut self, category: Category, groups: Vec<Vec<AssetEntry>>) -> usize {
        let Some(map) = self.grouped_mut(category) else {
            return 0;
        };
        let mut entries = HashMap::new();
        let raw: Vec<Group> = groups
            .into_iter()
            .map(|group| {
                group
                    .into_iter()
                    .map(|entry| {
                        let id = entry.id.clone();
                        entries.entry(id.clone()).or_insert(entry);
                        id
                    })
                    .collect()
            })
            .collect();
        map.integrate(raw, &entries)
    }

    /// Strip identifiers from every category with exact byte deduction.
    pub fn remove_items(&mut self, ids: &HashSet<&str>) -> u64 {
        if ids.is_empty() {
            return 0;
        }
        let mut removed = 0;
        for category in Category::SINGLES {
            if let Some(map) = self.category_mut(category) {
                removed += map.strip(ids);
            }
        }
        removed += self.similar.strip(ids);
        removed += self.duplicate.strip(ids);
        removed
    }

    /// Every identifier present in any category or group.
    pub fn all_ids(&self) -> HashSet<&str> {
        let mut ids: HashSet<&str> = HashSet::new();
        for category in Category::SINGLES {
            if let Some(map) = self.category(category) {
                ids.extend(map.entries.iter().map(|e| e.id.as_str()));
            }
        }
        for map in [&self.similar, &self.duplicate] {
            ids.extend(map.group_ids.iter().flatten().map(String::as_str));
        }
        ids
    }

    /// Sum of all category and channel totals.
    pub fn total_bytes(&self) -> u64 {
        let singles: u64 = Category::SINGLES
            .iter()
            .filter_map(|&c| self.category(c))
            .map(|m| m.total_bytes)
            .sum();
        singles + self.similar.total_bytes + self.duplicate.total_bytes
    }

    /// Per-category bytes, counts and up to two preview identifiers.
    pub fn summary(&self) -> Dashboard {
        let mut cells = Vec::with_capacity(Category::SINGLES.len() + Category::GROUPED.len());
        for category in Category::SINGLES {
            if let Some(map) = self.category(category) {
                cells.push(DashboardCell {
                    category,
                    bytes: map.total_bytes,
                    count: map.len(),
                    groups: 0,
                    preview_ids: map.entries.iter().take(PREVIEW_COUNT).map(|e| e.id.clone()).collect(),
                });
            }
        }
        for category in Category::GROUPED {
            if let Some(map) = self.grouped(category) {
                let materialized = map.groups.iter().filter_map(|g| g.first()).map(|e| e.id.clone());
                let from_ids = map.group_ids.iter().filter_map(|g| g.iter().next().cloned());
                let preview_ids: Vec<String> = if map.groups.is_empty() {
                    from_ids.take(PREVIEW_COUNT).collect()
                } else {
                    materialized.take(PREVIEW_COUNT).collect()
                };
                cells.push(DashboardCell {
                    category,
                    bytes: map.total_bytes,
                    count: map.item_count(),
                    groups: map.groups.len(),
                    preview_ids,
                });
            }
        }
        Dashboard {
            total_bytes: self.total_bytes(),
            cells,
            updated_at: super::unix_now(),
        }
    }
}

const PREVIEW_COUNT: usize = 2;

/// One dashboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardCell {
    pub category: Category,
    pub bytes: u64,
    /// Classified items (grouped members for grouped categories)
    pub count: usize,
    /// Materialized groups; zero for flat categories
    pub groups: usize,
    pub preview_ids: Vec<String>,
}

/// Compact overview of the classification maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub cells: Vec<DashboardCell>,
    pub total_bytes: u64,
    /// Unix seconds when the summary was built
    pub updated_at: u64,
}

impl Dashboard {
    pub fn cell(&self, category: Category) -> Option<&DashboardCell> {
        self.cells.iter().find(|c| c.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::is_partition;

    fn entry(id: &str, size: u64) -> AssetEntry {
        AssetEntry {
            id: id.to_string(),
            size_bytes: size,
            created_at: 0,
        }
    }

    fn group(entries: &[(&str, u64)]) -> Vec<AssetEntry> {
        entries.iter().map(|(id, size)| entry(id, *size)).collect()
    }

    #[test]
    fn test_insert_unique_counts_bytes_once() {
        let mut maps = ClassificationMaps::default();
        assert_eq!(maps.add_singles(Category::Blurry, [entry("a", 10), entry("b", 5)]), 2);
        assert_eq!(maps.add_singles(Category::Blurry, [entry("a", 10), entry("c", 1)]), 1);
        assert_eq!(maps.blurry.len(), 3);
        assert_eq!(maps.blurry.total_bytes, 16);
        assert_eq!(maps.add_singles(Category::Duplicate, [entry("x", 1)]), 0);
    }

    #[test]
    fn test_groups_materialize_sorted_by_size() {
        let mut maps = ClassificationMaps::default();
        let added = maps.add_groups(Category::Duplicate, vec![group(&[("a", 1), ("b", 30), ("c", 20)])]);
        assert_eq!(added, 3);
        let ids: Vec<&str> = maps.duplicate.groups[0].iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_eq!(maps.duplicate.total_bytes, 51);
    }

    #[test]
    fn test_group_bytes_count_new_members_only() {
        let mut maps = ClassificationMaps::default();
        maps.add_groups(Category::Similar, vec![group(&[("a", 10), ("b", 10)])]);
        maps.add_groups(Category::Similar, vec![group(&[("b", 10), ("c", 7)])]);
        assert_eq!(maps.similar.group_ids.len(), 1);
        assert_eq!(maps.similar.item_count(), 3);
        assert_eq!(maps.similar.total_bytes, 27);

        // Replaying the same clusters changes nothing.
        maps.add_groups(Category::Similar, vec![group(&[("a", 10), ("b", 10)])]);
        assert_eq!(maps.similar.total_bytes, 27);
        assert!(is_partition(&maps.similar.group_ids));
    }

    #[test]
    fn test_remove_items_deducts_exact_bytes() {
        let mut maps = ClassificationMaps::default();
        maps.add_singles(Category::Screenshot, [entry("a", 10), entry("b", 5)]);
        maps.add_singles(Category::Blurry, [entry("a", 10)]);
        maps.add_groups(Category::Duplicate, vec![group(&[("a", 10), ("c", 3)])]);
        maps.add_groups(Category::Similar, vec![group(&[("a", 10), ("c", 3), ("d", 4)])]);
        let before = maps.total_bytes();

        let ids: HashSet<&str> = ["a"].into_iter().collect();
        let removed = maps.remove_items(&ids);
        // 40 for "a" in four places, 3 for "c" leaving the dropped pair.
        assert_eq!(removed, 43);
        assert_eq!(maps.total_bytes(), before - 43);

        // The duplicate pair fell below two members and is gone.
        assert!(maps.duplicate.groups.is_empty());
        assert!(maps.duplicate.group_ids.is_empty());
        assert_eq!(maps.duplicate.total_bytes, 0);
        assert_eq!(maps.similar.item_count(), 2);
        assert!(!maps.all_ids().contains("a"));
    }

    #[test]
    fn test_total_bytes_sums_every_category() {
        let mut maps = ClassificationMaps::default();
        maps.add_singles(Category::AllVideos, [entry("v", 100)]);
        maps.add_singles(Category::LargeVideo, [entry("v", 100)]);
        maps.add_groups(Category::Duplicate, vec![group(&[("a", 1), ("b", 2)])]);
        assert_eq!(maps.total_bytes(), 203);
    }

    #[test]
    fn test_summary_previews() {
        let mut maps = ClassificationMaps::default();
        maps.add_singles(Category::Text, [entry("t1", 1), entry("t2", 1), entry("t3", 1)]);
        maps.add_groups(
            Category::Duplicate,
            vec![group(&[("a", 5), ("b", 9)]), group(&[("c", 1), ("d", 2)])],
        );

        let dashboard = maps.summary();
        let text = dashboard.cell(Category::Text).unwrap();
        assert_eq!(text.preview_ids, vec!["t1", "t2"]);
        assert_eq!(text.count, 3);

        let dup = dashboard.cell(Category::Duplicate).unwrap();
        assert_eq!(dup.groups, 2);
        assert_eq!(dup.count, 4);
        assert_eq!(dup.preview_ids.len(), 2);
        assert!(dup.preview_ids.contains(&"b".to_string()));
        assert_eq!(dashboard.total_bytes, 3 + 17);
    }
}
