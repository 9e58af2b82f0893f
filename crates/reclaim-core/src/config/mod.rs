//! Configuration management for Reclaim.
//!
//! Configuration is loaded from the platform config directory with defaults
//! for every field, so an empty or partial file is valid.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Reclaim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Chunking and concurrency
    pub scan: ScanConfig,

    /// Raster acquisition limits
    pub limits: LimitsConfig,

    /// Duplicate clustering thresholds
    pub duplicate: DuplicateConfig,

    /// Similar clustering thresholds
    pub similar: SimilarConfig,

    /// Blur detection
    pub blur: BlurConfig,

    /// Text detection
    pub text: TextConfig,

    /// Video size filter
    pub video: VideoConfig,

    /// Report output
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.reclaim.reclaim/config.toml
    /// - Linux: ~/.config/reclaim/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\reclaim\config\config.toml
    ///
    /// Falls back to ~/.reclaim/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "reclaim", "reclaim")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".reclaim").join("config.toml")
            })
    }

    /// Resolved store root (with ~ expansion).
    pub fn store_dir(&self) -> PathBuf {
        let path_str = self.general.store_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Store directory for one scanned library root.
    ///
    /// Each root gets its own directory, keyed by a hash of the root path, so
    /// scanning two folders never mixes their progress.
    pub fn store_dir_for(&self, library_root: &Path) -> PathBuf {
        let key = blake3::hash(library_root.to_string_lossy().as_bytes());
        self.store_dir().join(&key.to_hex()[..16])
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scan.chunk_size, 500);
        assert_eq!(config.scan.persist_every_chunks, 3);
        assert_eq!(config.limits.video_frame_timeout_ms, 2000);
        assert_eq!(config.video.large_threshold_bytes(), 100 * 1024 * 1024);
    }

    #[test]
    fn test_clustering_defaults() {
        let config = Config::default();
        assert_eq!(config.duplicate.max_phash_distance, 7);
        assert_eq!(config.duplicate.max_dhash_distance, 9);
        assert_eq!(config.duplicate.phash_prefilter, 14);
        assert_eq!(config.similar.max_phash_distance, 18);
        assert_eq!(config.similar.max_dhash_distance, 20);
        assert_eq!(config.similar.max_bucket_size, 120);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[duplicate]"));
        assert!(toml.contains("[blur]"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("[scan]\nchunk_size = 50\n").unwrap();
        assert_eq!(config.scan.chunk_size, 50);
        assert_eq!(config.scan.parallel_workers, 4);
        assert!(config.text.enabled);
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scan]\nchunk_size = 0\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("scan.chunk_size"));
    }

    #[test]
    fn test_store_dir_for_is_stable_per_root() {
        let config = Config::default();
        let a = config.store_dir_for(Path::new("/photos/a"));
        let b = config.store_dir_for(Path::new("/photos/b"));
        assert_ne!(a, b);
        assert_eq!(a, config.store_dir_for(Path::new("/photos/a")));
    }
}
