//! Core data types shared by the analysis engine and the snapshot store.

use serde::{Deserialize, Serialize};

/// Media kind reported by the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Which camera captured a photo, when the library can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    Front,
    Back,
}

/// An immutable reference to one item of the media library.
///
/// Owned by the library; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Opaque library identifier
    pub id: String,

    /// Image or video
    pub kind: MediaKind,

    /// Pixel width
    pub width: u32,

    /// Pixel height
    pub height: u32,

    /// Creation time in unix seconds
    pub created_at: i64,

    /// Storage size in bytes
    pub size_bytes: u64,

    /// Screen capture
    #[serde(default)]
    pub is_screenshot: bool,

    /// Still image paired with a motion clip
    #[serde(default)]
    pub is_live: bool,

    /// Capturing camera, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_facing: Option<CameraFacing>,
}

impl MediaItem {
    /// Create an item with no subtype flags.
    pub fn new(
        id: impl Into<String>,
        kind: MediaKind,
        width: u32,
        height: u32,
        created_at: i64,
        size_bytes: u64,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            width,
            height,
            created_at,
            size_bytes,
            is_screenshot: false,
            is_live: false,
            camera_facing: None,
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    /// The entry recorded in classification maps for this item.
    pub fn entry(&self) -> AssetEntry {
        AssetEntry {
            id: self.id.clone(),
            size_bytes: self.size_bytes,
            created_at: self.created_at,
        }
    }
}

/// A classified item as stored in the classification maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetEntry {
    pub id: String,
    pub size_bytes: u64,
    pub created_at: i64,
}

/// Compact visual fingerprint of one item.
///
/// Computed once per item and cached by identifier. A fingerprint is never
/// mutated; recomputation replaces the cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// DCT perceptual hash
    pub phash: u64,

    /// Horizontal gradient hash
    pub dhash: u64,

    /// Item width when the fingerprint was taken
    pub width: u32,

    /// Item height when the fingerprint was taken
    pub height: u32,
}

/// Classification categories exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Screenshot,
    LivePhoto,
    Selfie,
    BackCamera,
    AllVideos,
    LargeVideo,
    Blurry,
    Text,
    Similar,
    Duplicate,
}

impl Category {
    /// Categories backed by a flat entry list.
    pub const SINGLES: [Category; 8] = [
        Category::Screenshot,
        Category::LivePhoto,
        Category::Selfie,
        Category::BackCamera,
        Category::AllVideos,
        Category::LargeVideo,
        Category::Blurry,
        Category::Text,
    ];

    /// Categories backed by accumulated groups.
    pub const GROUPED: [Category; 2] = [Category::Similar, Category::Duplicate];

    pub fn is_grouped(self) -> bool {
        matches!(self, Category::Similar | Category::Duplicate)
    }

    /// Human-readable label for summaries.
    pub fn label(self) -> &'static str {
        match self {
            Category::Screenshot => "Screenshots",
            Category::LivePhoto => "Live photos",
            Category::Selfie => "Selfies",
            Category::BackCamera => "Back camera",
            Category::AllVideos => "Videos",
            Category::LargeVideo => "Large videos",
            Category::Blurry => "Blurry photos",
            Category::Text => "Text photos",
            Category::Similar => "Similar",
            Category::Duplicate => "Duplicates",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Resumable unit of work; each phase keeps its own cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Metadata classification (screenshots, live photos, videos, cameras)
    Primary,
    Similar,
    Duplicate,
    LargeVideo,
    Blur,
    Text,
}

impl Phase {
    pub const COUNT: usize = 6;

    pub const ALL: [Phase; Phase::COUNT] = [
        Phase::Primary,
        Phase::Similar,
        Phase::Duplicate,
        Phase::LargeVideo,
        Phase::Blur,
        Phase::Text,
    ];

    /// Stable name used for directories and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Primary => "primary",
            Phase::Similar => "similar",
            Phase::Duplicate => "duplicate",
            Phase::LargeVideo => "large_video",
            Phase::Blur => "blur",
            Phase::Text => "text",
        }
    }

    /// Whether the phase needs rasters from the library.
    pub fn needs_rasters(self) -> bool {
        matches!(self, Phase::Similar | Phase::Duplicate | Phase::Blur | Phase::Text)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_item_entry() {
        let item = MediaItem::new("a", MediaKind::Image, 4032, 3024, 1_700_000_000, 2_048);
        let entry = item.entry();
        assert_eq!(entry.id, "a");
        assert_eq!(entry.size_bytes, 2_048);
        assert_eq!(entry.created_at, 1_700_000_000);
    }

    #[test]
    fn test_media_item_deserializes_without_subtypes() {
        let json = r#"{"id":"x","kind":"video","width":1920,"height":1080,"created_at":5,"size_bytes":9}"#;
        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert!(item.is_video());
        assert!(!item.is_screenshot);
        assert!(item.camera_facing.is_none());
    }

    #[test]
    fn test_category_serialization() {
        assert_eq!(
            serde_json::to_string(&Category::LargeVideo).unwrap(),
            "\"large_video\""
        );
        assert!(Category::Duplicate.is_grouped());
        assert!(!Category::Blurry.is_grouped());
    }

    #[test]
    fn test_phase_names_match_serde() {
        for phase in Phase::ALL {
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(json, format!("\"{}\"", phase.as_str()));
        }
        assert!(!Phase::Primary.needs_rasters());
        assert!(!Phase::LargeVideo.needs_rasters());
        assert!(Phase::Blur.needs_rasters());
    }
}
