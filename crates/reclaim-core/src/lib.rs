//! Reclaim Core - incremental media library analysis.
//!
//! Reclaim sorts a large photo and video collection into categories worth
//! cleaning up: exact duplicates, visually similar shots, blurry photos,
//! photos of text and oversized videos, alongside metadata categories such as
//! screenshots and selfies.
//!
//! # Architecture
//!
//! ```text
//! MediaLibrary → chunk → Fingerprint / Filter → Cluster → Consolidate → SnapshotStore
//! ```
//!
//! Work is split into phases, each with its own persisted cursor, so an
//! interrupted run picks up at the last committed chunk and never recomputes
//! a fingerprint or a group.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use reclaim_core::{Analyzer, CancellationToken, Config, FsLibrary, NoopObserver, NullRecognizer};
//!
//! #[tokio::main]
//! async fn main() -> reclaim_core::Result<()> {
//!     let config = Config::load()?;
//!     let root = std::path::Path::new("./Photos");
//!     let store_dir = config.store_dir_for(root);
//!     let analyzer = Analyzer::open(
//!         Arc::new(FsLibrary::new(root)),
//!         Arc::new(NullRecognizer),
//!         config,
//!         &store_dir,
//!     )?;
//!     analyzer.sync_collection().await?;
//!     let summary = analyzer.run_to_completion(&CancellationToken::new(), &NoopObserver).await?;
//!     println!("{} bytes reclaimable", summary.total_bytes);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod cluster;
pub mod config;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod output;
pub mod pipeline;
pub mod store;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, PipelineError, PipelineResult, ReclaimError, Result, StoreError};
pub use fingerprint::{NullRecognizer, Raster, TextRecognizer};
pub use output::{OutputFormat, ReportWriter};
pub use pipeline::{
    Analyzer, CancellationToken, ChunkProgress, DecodeMode, FsLibrary, MediaLibrary, NoopObserver,
    PhaseResult, ProgressObserver, RunSummary,
};
pub use store::{ClassificationMaps, CollectionStatus, Dashboard, PhaseState, SnapshotStore};
pub use types::{AssetEntry, CameraFacing, Category, Fingerprint, MediaItem, MediaKind, Phase};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
