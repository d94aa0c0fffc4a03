//! JSON file implementation of the `DownloadStateRepositoryPort` trait.

use async_trait::async_trait;
use ridgeline_core::download::{JobId, PersistedDownloadState};
use ridgeline_core::paths::RegionPaths;
use ridgeline_core::ports::{DownloadStateRepositoryPort, RepositoryError};
use ridgeline_core::region::RegionId;
use tracing::warn;

use crate::fs::FileOps;

/// Download state stored as `<tmp>/<region_id>/download_state.json`.
#[derive(Debug, Clone)]
pub struct JsonDownloadStateRepository {
    paths: RegionPaths,
    ops: FileOps,
}

impl JsonDownloadStateRepository {
    /// Repository over the real filesystem.
    pub fn new(paths: RegionPaths) -> Self {
        Self::with_file_ops(paths, FileOps::default())
    }

    pub fn with_file_ops(paths: RegionPaths, ops: FileOps) -> Self {
        Self { paths, ops }
    }
}

#[async_trait]
impl DownloadStateRepositoryPort for JsonDownloadStateRepository {
    async fn load(
        &self,
        job_id: &JobId,
        region_id: &RegionId,
    ) -> Result<Option<PersistedDownloadState>, RepositoryError> {
        let path = self
            .paths
            .download_state(region_id)
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        let bytes = match self.ops.read_file(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(RepositoryError::Storage(e.to_string())),
        };

        let state: PersistedDownloadState = match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    target: "ridgeline.storage",
                    path = %path.display(),
                    error = %e,
                    "Ignoring unreadable download state"
                );
                return Ok(None);
            }
        };

        if state.job_id != *job_id {
            warn!(
                target: "ridgeline.storage",
                path = %path.display(),
                expected = %job_id,
                found = %state.job_id,
                "Ignoring download state of another job"
            );
            return Ok(None);
        }

        Ok(Some(state))
    }

    async fn save(&self, state: &PersistedDownloadState) -> Result<(), RepositoryError> {
        let path = self
            .paths
            .download_state(&state.region_id)
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        let stamped = state.stamped();
        let bytes = serde_json::to_vec_pretty(&stamped)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent() {
            self.ops
                .ensure_dir(parent)
                .await
                .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        }
        self.ops
            .write_file_atomic(&path, &bytes)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))
    }

    async fn remove(&self, _job_id: &JobId, region_id: &RegionId) -> Result<(), RepositoryError> {
        let path = self
            .paths
            .download_state(region_id)
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        self.ops
            .remove(&path)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ridgeline_core::download::{JobStatus, Phase};
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, JsonDownloadStateRepository, JobId, RegionId) {
        let dir = TempDir::new().unwrap();
        let repo = JsonDownloadStateRepository::new(RegionPaths::new(dir.path()));
        (dir, repo, JobId::new("j1"), RegionId::new("r1").unwrap())
    }

    #[tokio::test]
    async fn save_then_load_round_trips_and_stamps() {
        let (dir, repo, job, region) = setup();
        let mut state = PersistedDownloadState::new(job.clone(), region.clone());
        state.status = JobStatus::Paused;
        state.current_phase = Phase::Dem;
        state.phase_index = Phase::Dem.index();
        state.updated_at = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let original = state.clone();

        repo.save(&state).await.unwrap();
        assert_eq!(state, original);

        let loaded = repo.load(&job, &region).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Paused);
        assert_eq!(loaded.phase_index, 2);
        assert!(loaded.updated_at > original.updated_at);
        assert!(dir.path().join("tmp/r1/download_state.json").is_file());
    }

    #[tokio::test]
    async fn absent_corrupt_or_foreign_state_loads_as_none() {
        let (dir, repo, job, region) = setup();
        assert_eq!(repo.load(&job, &region).await.unwrap(), None);

        let path = dir.path().join("tmp/r1/download_state.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{ truncated").unwrap();
        assert_eq!(repo.load(&job, &region).await.unwrap(), None);

        let foreign = PersistedDownloadState::new(JobId::new("other"), region.clone());
        repo.save(&foreign).await.unwrap();
        assert_eq!(repo.load(&job, &region).await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (_dir, repo, job, region) = setup();
        repo.save(&PersistedDownloadState::new(job.clone(), region.clone()))
            .await
            .unwrap();

        repo.remove(&job, &region).await.unwrap();
        repo.remove(&job, &region).await.unwrap();
        assert_eq!(repo.load(&job, &region).await.unwrap(), None);
    }
}
