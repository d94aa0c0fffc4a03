//! Core domain types and port definitions for ridgeline offline regions.
//!
//! - `region` - validated region ids, package manifests, package errors
//! - `paths` - region package layout and data root resolution
//! - `download` - phases, job status, persisted state, progress events
//! - `ports` - traits implemented by storage and fetch adapters
//! - `settings` - retry settings and validation
#![deny(unused_crate_dependencies)]

pub mod download;
pub mod paths;
pub mod ports;
pub mod region;
pub mod settings;

// Re-export commonly used types for convenience
pub use download::{
    DownloadError, JobId, JobStatus, PersistedDownloadState, PersistedError, Phase, ProgressEvent,
    ProgressPatch,
};
pub use ports::{
    DownloadRequest, DownloadStateRepositoryPort, ElevationProviderPort, ProgressCallback,
    RegionDownloadPort, RegionPackagePort, RepositoryError, Subscription,
};
pub use region::{Manifest, ManifestFile, PackageError, RegionId, ValidationError};
pub use settings::{PipelineSettings, RetrySettings, SettingsError, validate_settings};

// Path utilities
pub use paths::{Artifact, PathError, RegionPaths, data_root};
