//! Download manager implementation.
//!
//! This module provides the concrete implementation of `RegionDownloadPort`:
//! an in-memory map of jobs, one spawned run per active job, and a shared
//! subscriber registry.
//!
//! # Architecture
//!
//! - **Manager**: validates transitions, owns the job map
//! - **Runner**: drives phases in order, wraps each in the retry executor,
//!   and settles the job on success, signal, or failure
//! - **Job**: the single mutable record per job; every event is emitted and
//!   persisted from here
//!
//! # Concurrency Model
//!
//! - At most one run per job; `pause` and `cancel` wait for it to unwind
//! - A run is installed while the jobs map is locked, so no caller can see
//!   a running job without its run
//! - Fresh `RunControl` flags per run, so a resumed job never sees the
//!   signal that stopped the previous run
//! - Lock order: jobs map → job state

mod job;
mod runner;
mod subscribers;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use ridgeline_core::download::{DownloadError, JobId, JobStatus, PersistedDownloadState};
use ridgeline_core::ports::{
    DownloadRequest, DownloadStateRepositoryPort, ProgressCallback, RegionDownloadPort,
    Subscription,
};
use ridgeline_core::region::RegionId;

use crate::phases::PhaseHandlers;
use crate::retry::RetryOptions;

use job::Job;
use runner::{RunDeps, spawn_run};
use subscribers::Subscribers;

/// Dependencies for creating a download manager.
pub struct DownloadManagerDeps<D>
where
    D: DownloadStateRepositoryPort + 'static,
{
    /// Handler per pipeline phase.
    pub handlers: PhaseHandlers,
    /// Port for persisting resumable job state.
    pub state_repo: Arc<D>,
    /// Retry policy applied to every phase.
    pub retry: RetryOptions<DownloadError>,
}

/// Build a download manager from its dependencies.
///
/// Returns an implementation of `RegionDownloadPort` that can be stored as
/// `Arc<dyn RegionDownloadPort>` in adapters.
pub fn build_download_manager<D>(deps: DownloadManagerDeps<D>) -> DownloadManager
where
    D: DownloadStateRepositoryPort + 'static,
{
    DownloadManager::new(deps.handlers, deps.state_repo, deps.retry)
}

/// Concrete region download manager.
///
/// Cheap to clone; clones share the same jobs.
#[derive(Clone)]
pub struct DownloadManager {
    inner: Arc<Inner>,
}

struct Inner {
    deps: RunDeps,
    state_repo: Arc<dyn DownloadStateRepositoryPort>,
    jobs: Mutex<HashMap<JobId, Arc<Job>>>,
    subscribers: Arc<Subscribers>,
}

impl DownloadManager {
    /// Create a manager.
    ///
    /// Pause and cancel signals are never retried, whatever `retry` says.
    pub fn new(
        handlers: PhaseHandlers,
        state_repo: Arc<dyn DownloadStateRepositoryPort>,
        retry: RetryOptions<DownloadError>,
    ) -> Self {
        let base = Arc::clone(&retry.retry_on);
        let retry = retry.with_retry_on(move |err| !err.is_control_signal() && base(err));

        Self {
            inner: Arc::new(Inner {
                deps: RunDeps { handlers, retry },
                state_repo,
                jobs: Mutex::new(HashMap::new()),
                subscribers: Arc::new(Subscribers::default()),
            }),
        }
    }

    /// Current state of an in-memory job.
    pub async fn snapshot(&self, job_id: &JobId) -> Option<PersistedDownloadState> {
        let job = self.job(job_id).await?;
        Some(job.snapshot().await)
    }

    /// Wait for the job's current run to finish and return its status.
    ///
    /// Returns `None` for jobs not in memory.
    pub async fn wait_settled(&self, job_id: &JobId) -> Option<JobStatus> {
        let job = self.job(job_id).await?;
        job.wait_idle().await;
        Some(job.status().await)
    }

    async fn job(&self, job_id: &JobId) -> Option<Arc<Job>> {
        self.inner.jobs.lock().await.get(job_id).cloned()
    }

    fn new_job(&self, state: PersistedDownloadState) -> Arc<Job> {
        Arc::new(Job::new(
            state,
            Arc::clone(&self.inner.state_repo),
            Arc::clone(&self.inner.subscribers),
        ))
    }

    /// Rebuild a job from persisted state.
    async fn reconstruct(
        &self,
        job_id: &JobId,
        region_id: &RegionId,
    ) -> Result<Arc<Job>, DownloadError> {
        let mut state = self
            .inner
            .state_repo
            .load(job_id, region_id)
            .await?
            .ok_or_else(|| DownloadError::JobNotFound {
                job_id: job_id.to_string(),
            })?;

        if state.status == JobStatus::Running {
            warn!(
                target: "ridgeline.download",
                job_id = %job_id,
                region_id = %region_id,
                phase = %state.current_phase,
                "Found stale running state; treating job as paused"
            );
            state.status = JobStatus::Paused;
        }
        state.phase_index = state.resume_phase().index();
        state.current_phase = state.resume_phase();

        Ok(self.new_job(state))
    }
}

fn invalid_state(job_id: &JobId, status: JobStatus, operation: &str) -> DownloadError {
    DownloadError::InvalidState {
        job_id: job_id.to_string(),
        status,
        operation: operation.to_string(),
    }
}

#[async_trait]
impl RegionDownloadPort for DownloadManager {
    async fn start(&self, request: DownloadRequest) -> Result<(), DownloadError> {
        let mut jobs = self.inner.jobs.lock().await;
        if jobs.contains_key(&request.job_id) {
            return Err(DownloadError::JobAlreadyActive {
                job_id: request.job_id.to_string(),
            });
        }

        let state = PersistedDownloadState::new(request.job_id.clone(), request.region_id.clone());
        let start = state.resume_phase();
        let job = self.new_job(state);
        jobs.insert(request.job_id.clone(), Arc::clone(&job));

        info!(
            target: "ridgeline.download",
            job_id = %request.job_id,
            region_id = %request.region_id,
            "Download started"
        );
        // Install the run's control before `pause` or `cancel` can see the job.
        spawn_run(job, self.inner.deps.clone(), start);
        Ok(())
    }

    async fn pause(&self, job_id: &JobId) -> Result<(), DownloadError> {
        let job = self
            .job(job_id)
            .await
            .ok_or_else(|| DownloadError::JobNotFound {
                job_id: job_id.to_string(),
            })?;

        let status = job.status().await;
        if status != JobStatus::Running {
            return Err(invalid_state(job_id, status, "pause"));
        }

        job.control().pause();
        job.wait_idle().await;
        Ok(())
    }

    async fn resume(&self, job_id: &JobId, region_id: &RegionId) -> Result<(), DownloadError> {
        let mut jobs = self.inner.jobs.lock().await;
        let job = match jobs.get(job_id) {
            Some(job) => Arc::clone(job),
            None => self.reconstruct(job_id, region_id).await?,
        };

        match job.status().await {
            JobStatus::Completed => return Ok(()),
            status @ (JobStatus::Running | JobStatus::Cancelled) => {
                return Err(invalid_state(job_id, status, "resume"));
            }
            JobStatus::Paused | JobStatus::Error => {}
        }

        job.wait_idle().await;
        job.mark_running().await;
        let start = job.snapshot().await.resume_phase();
        info!(
            target: "ridgeline.download",
            job_id = %job_id,
            region_id = %job.region_id(),
            phase = %start,
            "Download resumed"
        );
        spawn_run(Arc::clone(&job), self.inner.deps.clone(), start);
        jobs.insert(job_id.clone(), job);
        Ok(())
    }

    async fn cancel(&self, job_id: &JobId) -> Result<(), DownloadError> {
        let Some(job) = self.job(job_id).await else {
            return Ok(());
        };

        match job.status().await {
            JobStatus::Running => {
                job.control().cancel();
                job.wait_idle().await;
            }
            JobStatus::Paused | JobStatus::Error => {
                job.wait_idle().await;
                job.settle(JobStatus::Cancelled, None).await;
            }
            JobStatus::Cancelled | JobStatus::Completed => {}
        }

        self.inner.jobs.lock().await.remove(job_id);
        self.inner.subscribers.clear(job_id);
        Ok(())
    }

    async fn status(&self, job_id: &JobId) -> Option<JobStatus> {
        let job = self.job(job_id).await?;
        Some(job.status().await)
    }

    async fn on_progress(&self, job_id: &JobId, callback: ProgressCallback) -> Subscription {
        self.inner.subscribers.subscribe(job_id, callback)
    }
}
