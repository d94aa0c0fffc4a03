//! Execution loop driving one job through its phases.

use std::sync::Arc;

use ridgeline_core::download::{DownloadError, JobStatus, PersistedError, Phase};
use tracing::{debug, info, warn};

use super::job::{Job, RunGuard};
use crate::phases::{PhaseContext, PhaseHandlers, ProgressSink, RunControl};
use crate::retry::{Outcome, RetryOptions, with_retry};

/// Everything a run needs besides the job itself.
#[derive(Clone)]
pub(super) struct RunDeps {
    pub(super) handlers: PhaseHandlers,
    /// Policy whose predicate already excludes pause and cancel.
    pub(super) retry: RetryOptions<DownloadError>,
}

/// Start a run on the current tokio runtime and return immediately.
pub(super) fn spawn_run(job: Arc<Job>, deps: RunDeps, start: Phase) {
    let (control, guard) = job.begin_run();
    tokio::spawn(run(job, deps, control, start, guard));
}

async fn run(job: Arc<Job>, deps: RunDeps, control: RunControl, start: Phase, _guard: RunGuard) {
    debug!(
        target: "ridgeline.download",
        job_id = %job.job_id(),
        region_id = %job.region_id(),
        phase = %start,
        "Job run started"
    );

    let result = drive(&job, &deps, &control, start).await;
    let phase = job.snapshot().await.current_phase;

    match Outcome::classify(result, |_| false) {
        Outcome::Success(()) => {
            info!(
                target: "ridgeline.download",
                job_id = %job.job_id(),
                region_id = %job.region_id(),
                "Download completed"
            );
            job.settle(JobStatus::Completed, None).await;
        }
        Outcome::Paused => {
            info!(target: "ridgeline.download", job_id = %job.job_id(), phase = %phase, "Download paused");
            job.settle(JobStatus::Paused, None).await;
        }
        Outcome::Cancelled => {
            info!(target: "ridgeline.download", job_id = %job.job_id(), phase = %phase, "Download cancelled");
            job.settle(JobStatus::Cancelled, None).await;
        }
        Outcome::Retryable(err) | Outcome::Fatal(err) => {
            warn!(
                target: "ridgeline.download",
                job_id = %job.job_id(),
                phase = %phase,
                error = %err,
                "Download failed"
            );
            let error = PersistedError {
                message: err.to_string(),
                phase,
                code: err.code().map(str::to_string),
            };
            job.settle(JobStatus::Error, Some(error)).await;
        }
    }
}

/// Run phases from `start` to the end, stopping at the first signal or error.
async fn drive(
    job: &Arc<Job>,
    deps: &RunDeps,
    control: &RunControl,
    start: Phase,
) -> Result<(), DownloadError> {
    let sink: Arc<dyn ProgressSink> = Arc::clone(job) as Arc<dyn ProgressSink>;

    for phase in Phase::ALL.into_iter().skip(start.index()) {
        control.check()?;
        job.enter_phase(phase).await;

        let handler = deps
            .handlers
            .get(phase)
            .ok_or(DownloadError::MissingHandler { phase })?;
        let ctx = PhaseContext::new(
            job.job_id().clone(),
            job.region_id().clone(),
            phase,
            control.clone(),
            Arc::clone(&sink),
        );

        with_retry(&deps.retry, || {
            let handler = Arc::clone(&handler);
            let ctx = ctx.clone();
            async move {
                ctx.control().check()?;
                handler.run(&ctx).await
            }
        })
        .await?;

        // Observe signals even if the handler never checked them. Once the
        // last phase returns Ok the package is installed and the job is done.
        if phase.index() + 1 < Phase::COUNT {
            control.check()?;
        }
    }
    Ok(())
}
