//! Filesystem adapters for ridgeline.
//!
//! - `fs` - idempotent and atomic file operations over a pluggable
//!   [`Filesystem`]
//! - `region_store` - staging, validation, promotion and cleanup of region
//!   packages
//! - `state_repository` - JSON persistence of download job state
#![deny(unused_crate_dependencies)]

pub mod fs;
mod region_store;
mod state_repository;

pub use fs::{FileOps, FileStat, Filesystem, FsError, TokioFilesystem};
pub use region_store::{CACHEDIR_TAG, ReconcileReport, RegionPackageStore};
pub use state_repository::JsonDownloadStateRepository;
