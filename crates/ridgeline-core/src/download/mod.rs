//! Download domain types.
//!
//! This module contains the job identity, phase, status, persisted state,
//! progress event, and error types shared by the download engine, the state
//! store, and callers subscribing to progress.

mod errors;
mod events;
mod types;

pub use errors::DownloadError;
pub use events::{ProgressEvent, ProgressPatch, compute_percent};
pub use types::{
    DOWNLOAD_STATE_SCHEMA_VERSION, JobId, JobStatus, PersistedDownloadState, PersistedError, Phase,
};
