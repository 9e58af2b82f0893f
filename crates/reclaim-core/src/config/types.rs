//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Root under which per-library snapshot stores are kept
    pub store_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("~/.reclaim/stores"),
        }
    }
}

/// Chunking and concurrency settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Items per chunk; also the segment size of the persisted item list
    pub chunk_size: usize,

    /// Flush the store after this many processed chunks
    pub persist_every_chunks: usize,

    /// Concurrent raster acquisitions per chunk
    pub parallel_workers: usize,

    /// Edge length requested from the library for fingerprinting
    pub fingerprint_target: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            persist_every_chunks: 3,
            parallel_workers: 4,
            fingerprint_target: 64,
        }
    }
}

/// Raster acquisition limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Image decode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// Representative video frame timeout in milliseconds
    pub video_frame_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            decode_timeout_ms: 5000,
            video_frame_timeout_ms: 2000,
        }
    }
}

/// Near-exact duplicate thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateConfig {
    /// Accept when the pHash distance is at most this
    pub max_phash_distance: u32,

    /// ...and the dHash distance is at most this
    pub max_dhash_distance: u32,

    /// Pairs beyond this pHash distance are rejected before the dHash check
    pub phash_prefilter: u32,

    /// Band buckets larger than this are skipped
    pub max_bucket_size: usize,

    /// Maximum relative aspect-ratio difference
    pub aspect_tolerance: f64,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            max_phash_distance: 7,
            max_dhash_distance: 9,
            phash_prefilter: 14,
            max_bucket_size: 120,
            aspect_tolerance: 0.15,
        }
    }
}

/// Visual similarity thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarConfig {
    pub max_phash_distance: u32,
    pub max_dhash_distance: u32,
    pub max_bucket_size: usize,
    pub aspect_tolerance: f64,
}

impl Default for SimilarConfig {
    fn default() -> Self {
        Self {
            max_phash_distance: 18,
            max_dhash_distance: 20,
            max_bucket_size: 120,
            aspect_tolerance: 0.15,
        }
    }
}

/// Blur detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlurConfig {
    /// Whether the blur phase runs
    pub enabled: bool,

    /// Laplacian variance threshold before contrast adjustment
    pub base_threshold: f64,

    /// Below this luminance variance an image is treated as uniform, never blurry
    pub uniformity_floor: f64,

    /// Raster edge length requested for blur analysis
    pub target_size: u32,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_threshold: 2.0,
            uniformity_floor: 90.0,
            target_size: 256,
        }
    }
}

/// Text detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Whether the text phase runs
    pub enabled: bool,

    /// Edge length for the region-detection pass
    pub coarse_size: u32,

    /// Edge length for the recognition pass
    pub fine_size: u32,

    /// Recognized characters needed for a positive verdict
    pub min_characters: usize,

    /// Alternatively, the fraction of the image covered by text boxes
    pub min_area_fraction: f64,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            coarse_size: 160,
            fine_size: 512,
            min_characters: 6,
            min_area_fraction: 0.03,
        }
    }
}

/// Video settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Videos at or above this size are oversized
    pub large_threshold_mb: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            large_threshold_mb: 100,
        }
    }
}

impl VideoConfig {
    pub fn large_threshold_bytes(&self) -> u64 {
        self.large_threshold_mb * 1024 * 1024
    }
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default report format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON reports
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
