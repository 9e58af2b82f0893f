//! Two-stage text detection on top of an external recognizer.
//!
//! A cheap region pass on a small raster gates the expensive recognition pass
//! on a larger one, so the large raster is only acquired for candidates.

use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Raster;
use crate::config::TextConfig;
use crate::error::PipelineResult;

/// Axis-aligned box in normalized image coordinates (0.0..=1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl TextRegion {
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// One recognized line with its best candidate string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedLine {
    pub text: String,
    pub bounds: TextRegion,
}

/// External text detector/recognizer.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Cheap detection of text-like regions.
    async fn detect_regions(&self, raster: &Raster) -> PipelineResult<Vec<TextRegion>>;

    /// Full recognition.
    async fn recognize(&self, raster: &Raster) -> PipelineResult<Vec<RecognizedLine>>;

    /// Provider name, for logs.
    fn name(&self) -> &str;
}

/// Recognizer that never finds text.
///
/// Used when no recognition backend is available; the text phase then
/// completes without classifying anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecognizer;

#[async_trait]
impl TextRecognizer for NullRecognizer {
    async fn detect_regions(&self, _raster: &Raster) -> PipelineResult<Vec<TextRegion>> {
        Ok(Vec::new())
    }

    async fn recognize(&self, _raster: &Raster) -> PipelineResult<Vec<RecognizedLine>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Whether recognized lines carry enough text to count.
pub fn lines_indicate_text(lines: &[RecognizedLine], config: &TextConfig) -> bool {
    let characters: usize = lines.iter().map(|l| l.text.chars().count()).sum();
    let area: f64 = lines.iter().map(|l| l.bounds.area()).sum();
    characters >= config.min_characters || area >= config.min_area_fraction
}

/// Text verdict for one image.
///
/// `fine` is only awaited when the coarse raster has at least one region.
pub async fn has_text<F, Fut>(
    recognizer: &dyn TextRecognizer,
    coarse: &Raster,
    fine: F,
    config: &TextConfig,
) -> PipelineResult<bool>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = PipelineResult<Raster>>,
{
    let regions = recognizer.detect_regions(coarse).await?;
    if regions.is_empty() {
        return Ok(false);
    }
    let fine = fine().await?;
    let lines = recognizer.recognize(&fine).await?;
    Ok(lines_indicate_text(&lines, config))
}
