//! DEM command handler.
//!
//! Runs the pipeline with only the DEM phase doing work, backed by the
//! synthetic elevation provider. The staged package is left in place for
//! `validate` and `finalise`.

use std::sync::Arc;

use ridgeline_core::download::{JobId, JobStatus, Phase, ProgressEvent};
use ridgeline_core::paths::Artifact;
use ridgeline_core::ports::{Bounds, DemEncoding, DownloadRequest, RegionDownloadPort};
use ridgeline_core::region::RegionId;
use ridgeline_download::{DemPhaseHandler, PhaseHandlers, SyntheticElevationProvider};
use serde_json::json;
use tracing::info;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::format_bytes;

/// Arguments of the `dem` command.
#[derive(Debug, Clone)]
pub struct DemArgs {
    pub region_id: RegionId,
    pub job_id: Option<String>,
    pub bounds: Option<String>,
    pub width: u32,
    pub height: u32,
    pub encoding: DemEncoding,
    pub resolution: Option<f64>,
}

/// Execute the dem command.
pub async fn execute(ctx: &CliContext, args: DemArgs) -> Result<(), CliError> {
    let region_id = args.region_id;
    if let Some(raw) = &args.bounds {
        seed_region_file(ctx, &region_id, parse_bounds(raw)?).await?;
    }

    let provider = Arc::new(SyntheticElevationProvider::new(args.width, args.height));
    let mut dem = DemPhaseHandler::new(provider, ctx.package_port()).with_encoding(args.encoding);
    if let Some(meters) = args.resolution {
        dem = dem.with_target_resolution(meters);
    }
    let manager = ctx.download_manager(PhaseHandlers::noop().with(Phase::Dem, dem));

    let job_id = JobId::new(args.job_id.unwrap_or_else(|| format!("dem-{region_id}")));
    let subscription = manager
        .on_progress(&job_id, Arc::new(|event: &ProgressEvent| print_event(event)))
        .await;

    manager
        .start(DownloadRequest::new(job_id.clone(), region_id.clone()))
        .await?;
    let status = manager.wait_settled(&job_id).await;
    subscription.unsubscribe();

    match status {
        Some(JobStatus::Completed) => {
            info!(target: "ridgeline.cli", job_id = %job_id, region_id = %region_id, "DEM staged");
            println!(
                "Staged {} for {region_id}",
                ctx.paths.tmp_artifact(&region_id, Artifact::Dem)?.display()
            );
            Ok(())
        }
        _ => {
            let message = manager
                .snapshot(&job_id)
                .await
                .and_then(|state| state.error)
                .map_or_else(
                    || format!("job {job_id} did not complete"),
                    |error| format!("{} (phase {})", error.message, error.phase),
                );
            Err(CliError::Download(message))
        }
    }
}

fn print_event(event: &ProgressEvent) {
    match (&event.message, event.downloaded_bytes, event.total_bytes) {
        (Some(message), _, _) => println!("[{}] {message}", event.phase),
        (None, Some(done), Some(total)) => println!(
            "[{}] {} / {}",
            event.phase,
            format_bytes(done),
            format_bytes(total)
        ),
        _ => {}
    }
}

/// Write `region.json` with `bounds` unless the region already has one.
async fn seed_region_file(
    ctx: &CliContext,
    region_id: &RegionId,
    bounds: Bounds,
) -> Result<(), CliError> {
    let name = Artifact::Region.file_name();
    if ctx.store.read_temp_json(region_id, name).await?.is_some() {
        return Ok(());
    }
    let region = json!({
        "id": region_id.as_str(),
        "bounds": bounds,
    });
    ctx.store.write_temp_json(region_id, name, &region).await?;
    Ok(())
}

/// Parse `minLat,minLon,maxLat,maxLon`.
fn parse_bounds(raw: &str) -> Result<Bounds, CliError> {
    let invalid = || CliError::Arguments(format!("bounds must be minLat,minLon,maxLat,maxLon: {raw}"));

    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;
    let [min_lat, min_lon, max_lat, max_lon] = values[..] else {
        return Err(invalid());
    };

    let bounds = Bounds {
        min_lat,
        min_lon,
        max_lat,
        max_lon,
    };
    if !bounds.is_valid() {
        return Err(CliError::Arguments(format!(
            "bounds are outside WGS84 limits or inverted: {raw}"
        )));
    }
    Ok(bounds)
}
