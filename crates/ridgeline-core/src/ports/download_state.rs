//! Download state repository port definition.
//!
//! This port defines the interface for persisting the resumable progress of
//! a single download job so it survives process restarts.
//!
//! # Design
//!
//! - One record per region, keyed by `(job_id, region_id)`
//! - Written after every progress report and every phase transition
//! - Intent-based methods, not generic CRUD

use async_trait::async_trait;

use super::RepositoryError;
use crate::download::{JobId, PersistedDownloadState};
use crate::region::RegionId;

/// Port for persisting download job state.
///
/// The download manager exclusively owns the records it writes; the store
/// is a persistence adapter with no lifecycle of its own.
#[async_trait]
pub trait DownloadStateRepositoryPort: Send + Sync {
    /// Load the state for a job.
    ///
    /// Returns `Ok(None)` when nothing is stored, the stored record cannot
    /// be parsed, or it belongs to a different job. Those conditions are
    /// never errors.
    async fn load(
        &self,
        job_id: &JobId,
        region_id: &RegionId,
    ) -> Result<Option<PersistedDownloadState>, RepositoryError>;

    /// Persist a state record, stamping `updated_at` with the current time.
    ///
    /// The caller's value is not modified.
    async fn save(&self, state: &PersistedDownloadState) -> Result<(), RepositoryError>;

    /// Remove the state record. Removing a missing record succeeds.
    async fn remove(&self, job_id: &JobId, region_id: &RegionId) -> Result<(), RepositoryError>;
}
