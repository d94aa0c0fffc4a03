//! Status and forget command handlers over persisted job state.

use ridgeline_core::download::JobId;
use ridgeline_core::ports::DownloadStateRepositoryPort;
use ridgeline_core::region::RegionId;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::format_state;

/// Print the persisted state of a job.
pub async fn execute(ctx: &CliContext, job_id: &str, region_id: &RegionId) -> Result<(), CliError> {
    let job_id = JobId::new(job_id);
    let state = ctx
        .state_repo
        .load(&job_id, region_id)
        .await?
        .ok_or_else(|| {
            CliError::NotFound(format!("no download state for job {job_id} in region {region_id}"))
        })?;

    print!("{}", format_state(&state));
    Ok(())
}

/// Remove the persisted state of a job.
pub async fn forget(ctx: &CliContext, job_id: &str, region_id: &RegionId) -> Result<(), CliError> {
    let job_id = JobId::new(job_id);
    ctx.state_repo.remove(&job_id, region_id).await?;
    println!("Forgot download state for job {job_id} in region {region_id}");
    Ok(())
}
