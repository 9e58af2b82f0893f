//! Metadata-only classification: no raster is ever requested here.

use std::collections::BTreeMap;

use crate::types::{AssetEntry, CameraFacing, Category, MediaItem};

/// Oversized means at or above the threshold.
pub fn is_oversized_video(item: &MediaItem, threshold_bytes: u64) -> bool {
    item.is_video() && item.size_bytes >= threshold_bytes
}

pub fn oversized_videos(items: &[MediaItem], threshold_bytes: u64) -> Vec<AssetEntry> {
    items
        .iter()
        .filter(|item| is_oversized_video(item, threshold_bytes))
        .map(MediaItem::entry)
        .collect()
}

/// Categories an item falls into from its kind, subtypes and camera alone.
pub fn primary_categories(item: &MediaItem) -> Vec<Category> {
    let mut categories = Vec::new();
    if item.is_image() && item.is_screenshot {
        categories.push(Category::Screenshot);
    }
    if item.is_live {
        categories.push(Category::LivePhoto);
    }
    if item.is_video() {
        categories.push(Category::AllVideos);
    }
    if item.is_image() {
        match item.camera_facing {
            Some(CameraFacing::Front) => categories.push(Category::Selfie),
            Some(CameraFacing::Back) => categories.push(Category::BackCamera),
            None => {}
        }
    }
    categories
}

/// Primary classification of a chunk, keyed by category.
///
/// Every primary category is present in the result, possibly empty.
pub fn classify_primary(items: &[MediaItem]) -> BTreeMap<Category, Vec<AssetEntry>> {
    let mut out: BTreeMap<Category, Vec<AssetEntry>> = [
        Category::Screenshot,
        Category::LivePhoto,
        Category::AllVideos,
        Category::Selfie,
        Category::BackCamera,
    ]
    .into_iter()
    .map(|c| (c, Vec::new()))
    .collect();

    for item in items {
        for category in primary_categories(item) {
            out.entry(category).or_default().push(item.entry());
        }
    }
    out
}
