//! What one phase does with one chunk of items.
//!
//! Per-item failures (decode, timeout, degenerate raster) only exclude that
//! item from the phase at hand; a chunk always produces a result.

use std::collections::HashMap;
use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use tracing::{debug, trace};

use super::library::{acquire_raster, DecodeMode, MediaLibrary};
use crate::cluster::{find_duplicate_groups, find_similar_groups, Candidate, Group};
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::filter::{classify_primary, oversized_videos};
use crate::fingerprint::{self, has_text, BlurAssessment, FingerprintCache, TextRecognizer};
use crate::store::ChunkResult;
use crate::types::{AssetEntry, Category, Fingerprint, MediaItem, Phase};

/// Shared collaborators for chunk processing.
pub(crate) struct PhaseContext<'a> {
    pub library: &'a dyn MediaLibrary,
    pub recognizer: &'a dyn TextRecognizer,
    pub config: &'a Config,
    pub cache: &'a FingerprintCache,
}

/// Run `phase` over `items`, the chunk ending at `end_offset`.
pub(crate) async fn process_chunk(
    ctx: &PhaseContext<'_>,
    phase: Phase,
    chunk_index: usize,
    end_offset: usize,
    items: &[MediaItem],
) -> ChunkResult {
    let start = Instant::now();
    let mut result = ChunkResult::new(phase, chunk_index, end_offset);

    match phase {
        Phase::Primary => result.singles = classify_primary(items),
        Phase::LargeVideo => {
            let threshold = ctx.config.video.large_threshold_bytes();
            result
                .singles
                .insert(Category::LargeVideo, oversized_videos(items, threshold));
        }
        Phase::Similar => {
            let candidates = fingerprint_items(ctx, items.iter()).await;
            let groups = find_similar_groups(&candidates, &ctx.config.similar);
            result.groups = materialize(groups, items);
        }
        Phase::Duplicate => {
            let candidates = fingerprint_items(ctx, items.iter().filter(|i| i.is_image())).await;
            let groups = find_duplicate_groups(&candidates, &ctx.config.duplicate);
            result.groups = materialize(groups, items);
        }
        Phase::Blur => {
            result.singles.insert(Category::Blurry, blurry_items(ctx, items).await);
        }
        Phase::Text => {
            result.singles.insert(Category::Text, text_items(ctx, items).await);
        }
    }

    debug!(
        %phase,
        chunk = chunk_index,
        items = items.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Processed chunk"
    );
    result
}

/// Replace identifiers with entries, largest first within each group.
fn materialize(groups: Vec<Group>, items: &[MediaItem]) -> Vec<Vec<AssetEntry>> {
    let by_id: HashMap<&str, &MediaItem> = items.iter().map(|i| (i.id.as_str(), i)).collect();
    groups
        .into_iter()
        .map(|group| {
            let mut entries: Vec<AssetEntry> = group
                .iter()
                .filter_map(|id| by_id.get(id.as_str()).map(|item| item.entry()))
                .collect();
            entries.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes).then_with(|| a.id.cmp(&b.id)));
            entries
        })
        .filter(|entries| entries.len() >= 2)
        .collect()
}

/// Fingerprints for `items`, from the cache or computed with bounded
/// parallelism. Items that fail are left out; candidate order is arbitrary.
async fn fingerprint_items<'a>(
    ctx: &PhaseContext<'_>,
    items: impl Iterator<Item = &'a MediaItem>,
) -> Vec<Candidate> {
    stream::iter(items)
        .map(|item| async move {
            match fingerprint_item(ctx, item).await {
                Ok(fp) => Some(Candidate::new(item, fp)),
                Err(e) => {
                    debug!(id = %item.id, error = %e, "Excluded from clustering");
                    None
                }
            }
        })
        .buffer_unordered(ctx.config.scan.parallel_workers.max(1))
        .filter_map(|candidate| async move { candidate })
        .collect()
        .await
}

async fn fingerprint_item(ctx: &PhaseContext<'_>, item: &MediaItem) -> PipelineResult<Fingerprint> {
    if let Some(fp) = ctx.cache.get(&item.id) {
        return Ok(fp);
    }
    let start = Instant::now();
    let target = ctx.config.scan.fingerprint_target;
    let raster = acquire_raster(ctx.library, item, target, DecodeMode::Fast, &ctx.config.limits).await?;
    let (width, height) = (item.width, item.height);
    let fp = blocking(&item.id, move || fingerprint::fingerprint(&raster, width, height)).await?;
    ctx.cache.insert(item.id.clone(), fp);
    trace!(id = %item.id, elapsed_us = start.elapsed().as_micros() as u64, "Fingerprinted");
    Ok(fp)
}

async fn blurry_items(ctx: &PhaseContext<'_>, items: &[MediaItem]) -> Vec<AssetEntry> {
    let blur = &ctx.config.blur;
    stream::iter(items.iter().filter(|i| i.is_image()))
        .map(|item| async move {
            let raster =
                acquire_raster(ctx.library, item, blur.target_size, DecodeMode::Fast, &ctx.config.limits)
                    .await?;
            let (base, floor) = (blur.base_threshold, blur.uniformity_floor);
            let assessment =
                blocking(&item.id, move || BlurAssessment::assess(&raster, base, floor)).await?;
            trace!(id = %item.id, ?assessment, "Blur assessed");
            Ok::<_, PipelineError>(assessment.blurry.then(|| item.entry()))
        })
        .buffered(ctx.config.scan.parallel_workers.max(1))
        .filter_map(|outcome| async move {
            outcome
                .map_err(|e| debug!(error = %e, "Excluded from blur detection"))
                .ok()
                .flatten()
        })
        .collect()
        .await
}

async fn text_items(ctx: &PhaseContext<'_>, items: &[MediaItem]) -> Vec<AssetEntry> {
    let text = &ctx.config.text;
    let limits = &ctx.config.limits;
    stream::iter(items.iter().filter(|i| i.is_image()))
        .map(|item| async move {
            let coarse =
                acquire_raster(ctx.library, item, text.coarse_size, DecodeMode::Fast, limits).await?;
            let fine = || acquire_raster(ctx.library, item, text.fine_size, DecodeMode::HighQuality, limits);
            let found = has_text(ctx.recognizer, &coarse, fine, text).await?;
            Ok::<_, PipelineError>(found.then(|| item.entry()))
        })
        .buffered(ctx.config.scan.parallel_workers.max(1))
        .filter_map(|outcome| async move {
            outcome
                .map_err(|e| debug!(error = %e, "Excluded from text detection"))
                .ok()
                .flatten()
        })
        .collect()
        .await
}

/// Run CPU-bound raster work on the blocking pool.
async fn blocking<T, F>(id: &str, work: F) -> PipelineResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| PipelineError::Decode {
            id: id.to_string(),
            message: format!("Task join error: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::text::tests::ScriptedRecognizer;
    use crate::fingerprint::{test_rasters, NullRecognizer, Raster, RecognizedLine, TextRegion};
    use crate::types::MediaKind;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Library whose rasters are derived from the item identifier.
    struct PatternLibrary;

    fn raster_for(id: &str) -> Raster {
        match id {
            id if id.starts_with("flat") => test_rasters::gray(64, 48, |_, _| 128),
            id if id.starts_with("sharp") => {
                test_rasters::gray(128, 128, |x, y| if (x + y) % 2 == 0 { 0 } else { 255 })
            }
            id if id.starts_with("ramp") => test_rasters::gray(128, 128, |x, _| (x * 2) as u8),
            id if id.starts_with("copy") => test_rasters::noise(7, 64, 48, 0, 255),
            _ => test_rasters::noise(id.len() as u64 * 31 + 1, 64, 48, 0, 255),
        }
    }

    #[async_trait]
    impl MediaLibrary for PatternLibrary {
        async fn enumerate(&self) -> crate::error::Result<Vec<MediaItem>> {
            Ok(Vec::new())
        }

        async fn decode(&self, id: &str, _target: u32, _mode: DecodeMode) -> PipelineResult<Raster> {
            if id.starts_with("broken") {
                return Err(PipelineError::Decode {
                    id: id.to_string(),
                    message: "corrupt".to_string(),
                });
            }
            Ok(raster_for(id))
        }

        async fn representative_frame(&self, id: &str, target: u32) -> PipelineResult<Raster> {
            self.decode(id, target, DecodeMode::Fast).await
        }
    }

    fn image(id: &str) -> MediaItem {
        MediaItem::new(id, MediaKind::Image, 640, 480, 100, 1_000)
    }

    async fn run(phase: Phase, items: &[MediaItem], recognizer: &dyn TextRecognizer) -> ChunkResult {
        let config = Config::default();
        let cache = FingerprintCache::new();
        let ctx = PhaseContext {
            library: &PatternLibrary,
            recognizer,
            config: &config,
            cache: &cache,
        };
        process_chunk(&ctx, phase, 0, items.len(), items).await
    }

    #[tokio::test]
    async fn test_duplicate_chunk_groups_identical_content() {
        let items = vec![image("copy-a"), image("copy-b"), image("other"), image("broken")];
        let result = run(Phase::Duplicate, &items, &NullRecognizer).await;
        assert_eq!(result.groups.len(), 1);
        let ids: Vec<&str> = result.groups[0].iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["copy-a", "copy-b"]);
    }

    #[tokio::test]
    async fn test_duplicate_chunk_skips_videos() {
        let mut video = image("copy-v");
        video.kind = MediaKind::Video;
        let items = vec![image("copy-a"), video];
        let result = run(Phase::Duplicate, &items, &NullRecognizer).await;
        assert!(result.groups.is_empty());

        let similar = run(Phase::Similar, &items, &NullRecognizer).await;
        assert_eq!(similar.groups.len(), 1);
    }

    #[tokio::test]
    async fn test_blur_chunk() {
        let items = vec![image("flat"), image("sharp"), image("ramp"), image("broken")];
        let result = run(Phase::Blur, &items, &NullRecognizer).await;
        // A flat raster is below the uniformity floor; the checkerboard is sharp.
        let ids: Vec<&str> = result.singles[&Category::Blurry].iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["ramp"]);
    }

    #[tokio::test]
    async fn test_text_chunk() {
        let recognizer = ScriptedRecognizer {
            regions: vec![TextRegion {
                x: 0.1,
                y: 0.1,
                width: 0.5,
                height: 0.1,
            }],
            lines: vec![RecognizedLine {
                text: "RECEIPT TOTAL".to_string(),
                bounds: TextRegion {
                    x: 0.1,
                    y: 0.1,
                    width: 0.5,
                    height: 0.1,
                },
            }],
            recognize_calls: AtomicUsize::new(0),
        };
        let items = vec![image("a"), image("broken")];
        let result = run(Phase::Text, &items, &recognizer).await;
        let ids: Vec<&str> = result.singles[&Category::Text].iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn test_metadata_phases_need_no_rasters() {
        let mut video = MediaItem::new("broken-video", MediaKind::Video, 1920, 1080, 0, 200 << 20);
        video.is_live = true;
        let items = vec![video, image("broken")];

        let large = run(Phase::LargeVideo, &items, &NullRecognizer).await;
        assert_eq!(large.singles[&Category::LargeVideo].len(), 1);

        let primary = run(Phase::Primary, &items, &NullRecognizer).await;
        assert_eq!(primary.singles[&Category::AllVideos].len(), 1);
        assert_eq!(primary.singles[&Category::LivePhoto].len(), 1);
    }
}
