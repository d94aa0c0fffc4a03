//! In-memory record of one download job.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use ridgeline_core::download::{
    JobId, JobStatus, PersistedDownloadState, PersistedError, Phase, ProgressEvent, ProgressPatch,
    compute_percent,
};
use ridgeline_core::ports::DownloadStateRepositoryPort;
use ridgeline_core::region::RegionId;
use tokio::sync::{Mutex, watch};
use tracing::warn;

use super::subscribers::Subscribers;
use crate::phases::{ProgressSink, RunControl};

/// Marks a run finished when dropped, including on panic.
pub(super) struct RunGuard(watch::Sender<bool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.send_replace(true);
    }
}

/// Single mutable record of a job, shared by the manager and its run task.
///
/// `state` is the persisted shape; the tokio mutex is held across the save
/// in [`report`](ProgressSink::report), so persisted state never runs ahead
/// of delivered events.
pub(super) struct Job {
    job_id: JobId,
    region_id: RegionId,
    state: Mutex<PersistedDownloadState>,
    control: StdMutex<RunControl>,
    finished: StdMutex<Option<watch::Receiver<bool>>>,
    repo: Arc<dyn DownloadStateRepositoryPort>,
    subscribers: Arc<Subscribers>,
}

impl Job {
    pub(super) fn new(
        state: PersistedDownloadState,
        repo: Arc<dyn DownloadStateRepositoryPort>,
        subscribers: Arc<Subscribers>,
    ) -> Self {
        Self {
            job_id: state.job_id.clone(),
            region_id: state.region_id.clone(),
            state: Mutex::new(state),
            control: StdMutex::new(RunControl::new()),
            finished: StdMutex::new(None),
            repo,
            subscribers,
        }
    }

    pub(super) fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub(super) fn region_id(&self) -> &RegionId {
        &self.region_id
    }

    pub(super) async fn status(&self) -> JobStatus {
        self.state.lock().await.status
    }

    pub(super) async fn snapshot(&self) -> PersistedDownloadState {
        self.state.lock().await.clone()
    }

    pub(super) fn control(&self) -> RunControl {
        self.control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install fresh flags for a new run and return them with its guard.
    pub(super) fn begin_run(&self) -> (RunControl, RunGuard) {
        let control = RunControl::new();
        *self.control.lock().unwrap_or_else(PoisonError::into_inner) = control.clone();

        let (tx, rx) = watch::channel(false);
        *self.finished.lock().unwrap_or_else(PoisonError::into_inner) = Some(rx);
        (control, RunGuard(tx))
    }

    /// Wait until the current run, if any, has fully unwound.
    pub(super) async fn wait_idle(&self) {
        let finished = self
            .finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(mut rx) = finished {
            let _ = rx.wait_for(|done| *done).await;
        }
    }

    /// Mark the job running again, clearing any recorded error.
    pub(super) async fn mark_running(&self) {
        let mut state = self.state.lock().await;
        state.status = JobStatus::Running;
        state.error = None;
        self.persist(&state).await;
    }

    /// Record entry into `phase` and announce it.
    pub(super) async fn enter_phase(&self, phase: Phase) {
        let mut state = self.state.lock().await;
        state.current_phase = phase;
        state.phase_index = phase.index();
        state.downloaded_bytes = None;
        state.total_bytes = None;
        let event = self.event(&state, Some(format!("Starting {phase}")), None);
        self.subscribers.notify(&event);
        self.persist(&state).await;
    }

    /// Move to a settled status, persist it and emit the final event.
    pub(super) async fn settle(&self, status: JobStatus, error: Option<PersistedError>) {
        let mut state = self.state.lock().await;
        state.status = status;

        let (message, percent) = match status {
            JobStatus::Completed => {
                let last = Phase::ALL[Phase::COUNT - 1];
                state.current_phase = last;
                state.phase_index = last.index();
                if let Some(total) = state.total_bytes {
                    state.downloaded_bytes = Some(total);
                }
                (Some("Download complete".to_string()), Some(100.0))
            }
            JobStatus::Paused => (Some("Paused".to_string()), None),
            JobStatus::Cancelled => (Some("Cancelled".to_string()), None),
            JobStatus::Error => (error.as_ref().map(|e| e.message.clone()), None),
            JobStatus::Running => (None, None),
        };
        state.error = error;

        let event = self.event(&state, message, percent);
        self.subscribers.notify(&event);
        self.persist(&state).await;
    }

    fn event(
        &self,
        state: &PersistedDownloadState,
        message: Option<String>,
        percent: Option<f64>,
    ) -> ProgressEvent {
        ProgressEvent {
            job_id: self.job_id.clone(),
            phase: state.current_phase,
            status: state.status,
            downloaded_bytes: state.downloaded_bytes,
            total_bytes: state.total_bytes,
            percent: percent.or_else(|| compute_percent(state.downloaded_bytes, state.total_bytes)),
            message,
        }
    }

    /// Save state; failures are logged and never fail the job.
    async fn persist(&self, state: &PersistedDownloadState) {
        if let Err(e) = self.repo.save(state).await {
            warn!(
                target: "ridgeline.download",
                job_id = %self.job_id,
                region_id = %self.region_id,
                error = %e,
                "Failed to persist download state"
            );
        }
    }
}

#[async_trait]
impl ProgressSink for Job {
    async fn report(&self, phase: Phase, patch: ProgressPatch) {
        let mut state = self.state.lock().await;
        if state.current_phase != phase {
            warn!(
                target: "ridgeline.download",
                job_id = %self.job_id,
                phase = %phase,
                current = %state.current_phase,
                "Dropping progress from a finished phase"
            );
            return;
        }
        if patch.downloaded_bytes.is_some() {
            state.downloaded_bytes = patch.downloaded_bytes;
        }
        if patch.total_bytes.is_some() {
            state.total_bytes = patch.total_bytes;
        }
        let event = self.event(&state, patch.message, None);
        self.subscribers.notify(&event);
        self.persist(&state).await;
    }
}
