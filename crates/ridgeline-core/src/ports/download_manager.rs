//! Region download manager port definition.
//!
//! This port is the whole surface UI collaborators see: start, pause,
//! resume, cancel, status, and a progress subscription. Cancellation flags,
//! task handles, and retry policy stay behind it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::download::{DownloadError, JobId, JobStatus, ProgressEvent};
use crate::region::RegionId;

/// Request to start downloading a region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub job_id: JobId,
    pub region_id: RegionId,
}

impl DownloadRequest {
    pub fn new(job_id: impl Into<JobId>, region_id: RegionId) -> Self {
        Self {
            job_id: job_id.into(),
            region_id,
        }
    }
}

/// Callback invoked for every progress event of a job.
///
/// Runs synchronously on the job's task; keep it cheap. Panics are caught
/// and logged by the manager.
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Handle returned by [`RegionDownloadPort::on_progress`].
///
/// Dropping the handle keeps the callback registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Wrap a deregistration function.
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Deregister the callback.
    pub fn unsubscribe(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Port for managing region downloads.
///
/// # Usage
///
/// ```ignore
/// let manager: Arc<dyn RegionDownloadPort> = /* ... */;
///
/// let sub = manager.on_progress(&job_id, Arc::new(|event| {
///     println!("{} {:?}", event.phase, event.percent);
/// })).await;
/// manager.start(DownloadRequest::new("j1", region_id)).await?;
/// ```
#[async_trait]
pub trait RegionDownloadPort: Send + Sync {
    /// Start a new job at the first phase. Returns once the job is running.
    async fn start(&self, request: DownloadRequest) -> Result<(), DownloadError>;

    /// Pause a running job and wait until it has stopped.
    async fn pause(&self, job_id: &JobId) -> Result<(), DownloadError>;

    /// Resume a paused or failed job from its recorded phase.
    ///
    /// Jobs not in memory are reconstructed from persisted state.
    async fn resume(&self, job_id: &JobId, region_id: &RegionId) -> Result<(), DownloadError>;

    /// Cancel a job, wait for it to stop, and forget it.
    async fn cancel(&self, job_id: &JobId) -> Result<(), DownloadError>;

    /// Current status of an in-memory job.
    async fn status(&self, job_id: &JobId) -> Option<JobStatus>;

    /// Register a progress callback for a job.
    async fn on_progress(&self, job_id: &JobId, callback: ProgressCallback) -> Subscription;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn unsubscribe_runs_release_once() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&released);
        let sub = Subscription::new(move || flag.store(true, Ordering::SeqCst));

        assert!(!released.load(Ordering::SeqCst));
        sub.unsubscribe();
        assert!(released.load(Ordering::SeqCst));
    }
}
