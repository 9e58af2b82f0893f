//! Error types for the Reclaim analysis engine.
//!
//! Per-item failures (`PipelineError`) are absorbed by the phase that hit them:
//! the item is left out of that classification and the chunk carries on.
//! Store failures are split by severity so callers can tell a cold start
//! (unreadable or outdated records) from a store that cannot be used at all.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Reclaim operations.
#[derive(Error, Debug)]
pub enum ReclaimError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Per-item pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Snapshot store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Per-item failures raised while acquiring or analyzing a raster.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The library could not produce a raster for the item
    #[error("Decode error for {id}: {message}")]
    Decode { id: String, message: String },

    /// Raster acquisition did not finish in time
    #[error("Timeout in {stage} stage for {id} after {timeout_ms}ms")]
    Timeout {
        id: String,
        stage: String,
        timeout_ms: u64,
    },

    /// The raster has a zero dimension
    #[error("Degenerate raster for {id}: {width}x{height}")]
    DegenerateRaster { id: String, width: u32, height: u32 },

    /// The requested operation does not apply to this media kind
    #[error("Unsupported media kind for {id}: {kind}")]
    UnsupportedKind { id: String, kind: String },

    /// The library no longer knows the identifier
    #[error("Item not found: {0}")]
    ItemNotFound(String),
}

impl PipelineError {
    /// Whether the failure came from the acquisition timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PipelineError::Timeout { .. })
    }
}

/// Snapshot store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store directory cannot be created or opened. This is the only
    /// store failure surfaced as fatal.
    #[error("Cannot open snapshot store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be written (retried at the next flush)
    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },

    /// A record exists but could not be read or parsed
    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// A record was written by a different schema version
    #[error("Schema mismatch in {path}: found v{found}, expected v{expected}")]
    SchemaMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
}

impl StoreError {
    /// Read-side failures are recovered by starting cold.
    pub fn is_cold_start(&self) -> bool {
        matches!(
            self,
            StoreError::Read { .. } | StoreError::SchemaMismatch { .. }
        )
    }
}

/// Convenience type alias for Reclaim results.
pub type Result<T> = std::result::Result<T, ReclaimError>;

/// Convenience type alias for per-item pipeline results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Convenience type alias for store results.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
