//! Media file discovery for the filesystem library.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::types::MediaKind;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "tif", "tiff", "bmp"];
const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4", "m4v", "avi", "mkv"];

/// A media file found under the library root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    pub kind: MediaKind,
    /// File size in bytes
    pub size: u64,
    /// Still image with a motion clip next to it
    pub has_motion_clip: bool,
}

fn lower_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

/// Media kind from the file extension, if supported.
pub fn media_kind(path: &Path) -> Option<MediaKind> {
    let ext = lower_extension(path)?;
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Whether the file name marks a screen capture.
pub fn looks_like_screenshot(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| {
            let lower = n.to_lowercase();
            lower.contains("screenshot") || lower.contains("screen shot")
        })
        .unwrap_or(false)
}

/// Path without its extension, used to pair stills with motion clips.
fn stem_key(path: &Path) -> PathBuf {
    path.with_extension("")
}

/// Find all supported media under `root`, sorted by path.
///
/// A `.mov` sharing its stem with an image is the motion half of a live
/// photo: it marks the image and is not listed on its own.
pub fn discover(root: &Path) -> Vec<DiscoveredFile> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(kind) = media_kind(path) else {
            continue;
        };
        if let Ok(meta) = entry.metadata() {
            files.push(DiscoveredFile {
                path: path.to_path_buf(),
                kind,
                size: meta.len(),
                has_motion_clip: false,
            });
        }
    }

    let image_stems: HashSet<PathBuf> = files
        .iter()
        .filter(|f| f.kind == MediaKind::Image)
        .map(|f| stem_key(&f.path))
        .collect();
    let clip_stems: HashSet<PathBuf> = files
        .iter()
        .filter(|f| lower_extension(&f.path).as_deref() == Some("mov") && image_stems.contains(&stem_key(&f.path)))
        .map(|f| stem_key(&f.path))
        .collect();

    files.retain(|f| !(f.kind == MediaKind::Video && clip_stems.contains(&stem_key(&f.path))));
    for file in &mut files {
        file.has_motion_clip = file.kind == MediaKind::Image && clip_stems.contains(&stem_key(&file.path));
    }

    // Sort by path for deterministic ordering
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}
