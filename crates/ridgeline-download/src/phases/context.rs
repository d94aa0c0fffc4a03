//! Per-phase execution context handed to phase handlers.

use std::sync::Arc;

use async_trait::async_trait;
use ridgeline_core::download::{DownloadError, JobId, Phase, ProgressPatch};
use ridgeline_core::region::RegionId;
use tokio_util::sync::CancellationToken;

/// Receiver of progress reports from a running phase.
///
/// The manager's job record implements this; it merges the patch, notifies
/// subscribers and persists state before returning.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, phase: Phase, patch: ProgressPatch);
}

/// Pause and cancel flags of one run of a job.
///
/// Each start or resume gets a fresh pair of tokens, so a pause from a
/// previous run never leaks into the next one.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    cancel: CancellationToken,
    pause: CancellationToken,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn pause(&self) {
        self.pause.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_cancelled()
    }

    /// `Err(Cancelled)` or `Err(Paused)` if a signal is pending. Cancel wins.
    pub fn check(&self) -> Result<(), DownloadError> {
        if self.is_cancelled() {
            Err(DownloadError::Cancelled)
        } else if self.is_paused() {
            Err(DownloadError::Paused)
        } else {
            Ok(())
        }
    }

    /// Resolves once either flag is set.
    pub async fn interrupted(&self) {
        tokio::select! {
            () = self.cancel.cancelled() => {}
            () = self.pause.cancelled() => {}
        }
    }
}

/// What a phase handler sees of its job.
///
/// Cheap to clone; handlers may move clones into spawned work.
#[derive(Clone)]
pub struct PhaseContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    job_id: JobId,
    region_id: RegionId,
    phase: Phase,
    control: RunControl,
    sink: Arc<dyn ProgressSink>,
}

impl PhaseContext {
    pub fn new(
        job_id: JobId,
        region_id: RegionId,
        phase: Phase,
        control: RunControl,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                job_id,
                region_id,
                phase,
                control,
                sink,
            }),
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.inner.job_id
    }

    pub fn region_id(&self) -> &RegionId {
        &self.inner.region_id
    }

    pub fn phase(&self) -> Phase {
        self.inner.phase
    }

    pub fn control(&self) -> &RunControl {
        &self.inner.control
    }

    /// Report progress and wait until it has been recorded.
    pub async fn report(&self, patch: ProgressPatch) {
        self.inner.sink.report(self.inner.phase, patch).await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.control.is_cancelled()
    }

    pub fn is_paused(&self) -> bool {
        self.inner.control.is_paused()
    }

    /// Checkpoint for handlers.
    ///
    /// Returns `Err(Cancelled)` on cancel and `Ok(true)` on pause, so a
    /// handler can write `if ctx.should_stop()? { return Ok(()); }`.
    pub fn should_stop(&self) -> Result<bool, DownloadError> {
        if self.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }
        Ok(self.is_paused())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(Phase, ProgressPatch)>>);

    #[async_trait]
    impl ProgressSink for Recorder {
        async fn report(&self, phase: Phase, patch: ProgressPatch) {
            self.0.lock().unwrap().push((phase, patch));
        }
    }

    fn context(control: RunControl, sink: Arc<Recorder>) -> PhaseContext {
        PhaseContext::new(
            JobId::new("j1"),
            RegionId::new("r1").unwrap(),
            Phase::Tiles,
            control,
            sink,
        )
    }

    #[tokio::test]
    async fn reports_are_tagged_with_the_phase() {
        let sink = Arc::new(Recorder::default());
        let ctx = context(RunControl::new(), Arc::clone(&sink));

        ctx.report(ProgressPatch::bytes(10, Some(100))).await;

        let reports = sink.0.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, Phase::Tiles);
        assert_eq!(reports[0].1.downloaded_bytes, Some(10));
    }

    #[test]
    fn checkpoints_follow_the_flags() {
        let control = RunControl::new();
        let ctx = context(control.clone(), Arc::new(Recorder::default()));
        assert_eq!(ctx.should_stop(), Ok(false));

        control.pause();
        assert!(ctx.is_paused());
        assert_eq!(ctx.should_stop(), Ok(true));
        assert_eq!(control.check(), Err(DownloadError::Paused));

        control.cancel();
        assert_eq!(ctx.should_stop(), Err(DownloadError::Cancelled));
        assert_eq!(control.check(), Err(DownloadError::Cancelled));
    }

    #[tokio::test]
    async fn interrupted_resolves_on_pause() {
        let control = RunControl::new();
        let waiter = control.clone();
        let handle = tokio::spawn(async move { waiter.interrupted().await });
        control.pause();
        handle.await.unwrap();
    }
}
