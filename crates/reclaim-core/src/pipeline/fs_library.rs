//! A directory tree of photos and videos exposed as a [`MediaLibrary`].
//!
//! Identifiers are paths relative to the root. Stills are decoded with the
//! `image` crate on the blocking pool; videos have no frame decoder, so the
//! raster phases exclude them.

use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::imageops::FilterType;
use image::DynamicImage;

use super::discovery::{discover, looks_like_screenshot, DiscoveredFile};
use super::library::{DecodeMode, MediaLibrary};
use super::metadata::{modified_seconds, MetadataExtractor};
use crate::error::{PipelineError, PipelineResult, Result};
use crate::fingerprint::Raster;
use crate::types::{MediaItem, MediaKind};

pub struct FsLibrary {
    root: PathBuf,
}

impl FsLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn item_from(root: &Path, file: DiscoveredFile) -> MediaItem {
        let id = file
            .path
            .strip_prefix(root)
            .unwrap_or(&file.path)
            .to_string_lossy()
            .into_owned();
        let mtime = std::fs::metadata(&file.path)
            .map(|m| modified_seconds(&m))
            .unwrap_or(0);

        let mut item = MediaItem::new(id, file.kind, 0, 0, mtime, file.size);
        if file.kind == MediaKind::Image {
            if let Ok((width, height)) = image::image_dimensions(&file.path) {
                item.width = width;
                item.height = height;
            }
            let info = MetadataExtractor::extract(&file.path);
            if let Some(captured_at) = info.captured_at {
                item.created_at = captured_at;
            }
            item.camera_facing = info.camera_facing;
            item.is_screenshot = looks_like_screenshot(&file.path);
            item.is_live = file.has_motion_clip;
        }
        item
    }

    fn decode_sync(path: &Path, id: &str, target: u32, mode: DecodeMode) -> PipelineResult<Raster> {
        let decode_error = |message: String| PipelineError::Decode {
            id: id.to_string(),
            message,
        };
        let image = image::ImageReader::open(path)
            .map_err(|e| decode_error(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| decode_error(format!("Cannot detect image format: {e}")))?
            .decode()
            .map_err(|e| decode_error(e.to_string()))?;
        Raster::new(id, downscale(image, target, mode))
    }
}

fn downscale(image: DynamicImage, target: u32, mode: DecodeMode) -> DynamicImage {
    if image.width() <= target && image.height() <= target {
        return image;
    }
    match mode {
        DecodeMode::Fast => image.thumbnail(target, target),
        DecodeMode::HighQuality => image.resize(target, target, FilterType::Lanczos3),
    }
}

#[async_trait]
impl MediaLibrary for FsLibrary {
    async fn enumerate(&self) -> Result<Vec<MediaItem>> {
        if !self.root.is_dir() {
            return Err(IoError::new(
                ErrorKind::NotFound,
                format!("Library root is not a directory: {:?}", self.root),
            )
            .into());
        }
        let root = self.root.clone();
        let items = tokio::task::spawn_blocking(move || {
            discover(&root)
                .into_iter()
                .map(|file| Self::item_from(&root, file))
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| IoError::new(ErrorKind::Other, format!("Task join error: {e}")))?;
        Ok(items)
    }

    async fn decode(&self, id: &str, target: u32, mode: DecodeMode) -> PipelineResult<Raster> {
        let path = self.root.join(id);
        if !path.is_file() {
            return Err(PipelineError::ItemNotFound(id.to_string()));
        }
        let id_owned = id.to_string();
        match tokio::task::spawn_blocking(move || Self::decode_sync(&path, &id_owned, target, mode)).await {
            Ok(result) => result,
            Err(e) => Err(PipelineError::Decode {
                id: id.to_string(),
                message: format!("Task join error: {e}"),
            }),
        }
    }

    async fn representative_frame(&self, id: &str, _target: u32) -> PipelineResult<Raster> {
        Err(PipelineError::UnsupportedKind {
            id: id.to_string(),
            kind: MediaKind::Video.to_string(),
        })
    }
}
