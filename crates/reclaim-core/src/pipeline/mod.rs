//! Analysis pipeline: media access, per-phase chunk processing and the
//! resumable analyzer service.
//!
//! - **library**: the `MediaLibrary` seam and time-limited raster acquisition
//! - **fs_library**: a directory tree as a media library
//! - **discovery** / **metadata**: file walking and EXIF capture info
//! - **phase**: what each phase does with one chunk
//! - **analyzer**: cursors, flush cadence, phase scheduling, snapshots
//! - **cancel**: cooperative cancellation and progress callbacks

pub mod analyzer;
pub mod cancel;
pub mod discovery;
pub mod fs_library;
pub mod library;
pub mod metadata;
mod phase;

pub use analyzer::{Analyzer, PhaseResult, RunSummary};
pub use cancel::{CancellationToken, ChunkProgress, NoopObserver, ProgressObserver};
pub use fs_library::FsLibrary;
pub use library::{acquire_raster, DecodeMode, MediaLibrary};
