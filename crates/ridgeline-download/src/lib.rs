//! Region download pipeline for ridgeline.
//!
//! - `retry` - bounded exponential backoff and outcome classification
//! - `phases` - phase handler contract, registry, DEM and finalise handlers
//! - `elevation` - bundled elevation providers
//! - `manager` - the `RegionDownloadPort` state machine
#![deny(unused_crate_dependencies)]

// Integration tests use these; unit tests do not.
#[cfg(test)]
use ridgeline_storage as _;
#[cfg(test)]
use tempfile as _;

// Re-export core types for convenience
pub use ridgeline_core::download::{
    DownloadError, JobId, JobStatus, PersistedDownloadState, Phase, ProgressEvent, ProgressPatch,
};
pub use ridgeline_core::ports::{
    DownloadRequest, DownloadStateRepositoryPort, ElevationProviderPort, RegionDownloadPort,
    RegionPackagePort, Subscription,
};

pub mod elevation;
mod manager;
pub mod phases;
pub mod retry;

pub use elevation::{SyntheticElevationProvider, UnconfiguredElevationProvider};
pub use manager::{DownloadManager, DownloadManagerDeps, build_download_manager};
pub use phases::{
    DemPhaseHandler, FinalisePhaseHandler, NoopPhaseHandler, PhaseContext, PhaseHandler,
    PhaseHandlers, ProgressSink, RunControl, phase_fn,
};
pub use retry::{Outcome, RetryOptions, with_retry};
