//! Access to the media library: the only source of items and rasters.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::{PipelineError, PipelineResult, Result};
use crate::fingerprint::Raster;
use crate::types::MediaItem;

/// Decode quality requested from the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Cheapest path to a small raster
    Fast,
    /// Full-quality downscale, used for text recognition
    HighQuality,
}

/// External media library.
///
/// Identifiers are opaque to the engine. Rasters must have their longest edge
/// at most `target` pixels; larger rasters are downscaled on arrival.
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    /// All items with their metadata.
    async fn enumerate(&self) -> Result<Vec<MediaItem>>;

    /// Decoded still image.
    async fn decode(&self, id: &str, target: u32, mode: DecodeMode) -> PipelineResult<Raster>;

    /// One frame standing in for a video.
    async fn representative_frame(&self, id: &str, target: u32) -> PipelineResult<Raster>;
}

/// Acquire a raster for `item` under the configured time limit.
///
/// Images use the decode timeout, videos the frame timeout. A timeout is
/// reported as [`PipelineError::Timeout`] and the library call is dropped.
pub async fn acquire_raster(
    library: &dyn MediaLibrary,
    item: &MediaItem,
    target: u32,
    mode: DecodeMode,
    limits: &LimitsConfig,
) -> PipelineResult<Raster> {
    let (timeout_ms, stage) = if item.is_video() {
        (limits.video_frame_timeout_ms, "video_frame")
    } else {
        (limits.decode_timeout_ms, "decode")
    };

    let request = async {
        if item.is_video() {
            library.representative_frame(&item.id, target).await
        } else {
            library.decode(&item.id, target, mode).await
        }
    };

    match timeout(Duration::from_millis(timeout_ms), request).await {
        Ok(Ok(raster)) => Ok(raster.fit_within(target)),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(PipelineError::Timeout {
            id: item.id.clone(),
            stage: stage.to_string(),
            timeout_ms,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::test_rasters;
    use crate::types::MediaKind;

    struct SlowLibrary;

    #[async_trait]
    impl MediaLibrary for SlowLibrary {
        async fn enumerate(&self) -> Result<Vec<MediaItem>> {
            Ok(Vec::new())
        }

        async fn decode(&self, _id: &str, _target: u32, _mode: DecodeMode) -> PipelineResult<Raster> {
            Ok(test_rasters::gray(400, 200, |x, _| x as u8))
        }

        async fn representative_frame(&self, _id: &str, _target: u32) -> PipelineResult<Raster> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(test_rasters::gray(8, 8, |_, _| 0))
        }
    }

    #[tokio::test]
    async fn test_oversized_rasters_are_downscaled() {
        let item = MediaItem::new("a", MediaKind::Image, 400, 200, 0, 1);
        let raster = acquire_raster(&SlowLibrary, &item, 64, DecodeMode::Fast, &LimitsConfig::default())
            .await
            .unwrap();
        assert_eq!((raster.width(), raster.height()), (64, 32));
    }

    #[tokio::test]
    async fn test_video_frame_timeout() {
        let item = MediaItem::new("v", MediaKind::Video, 1920, 1080, 0, 1);
        let limits = LimitsConfig {
            video_frame_timeout_ms: 20,
            ..LimitsConfig::default()
        };
        let err = acquire_raster(&SlowLibrary, &item, 64, DecodeMode::Fast, &limits)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("video_frame"));
    }
}
