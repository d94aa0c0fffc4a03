//! Package command handlers: validate, finalise, delete, size.

use ridgeline_core::region::RegionId;
use tracing::info;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::format_bytes;

/// Validate the staged package of a region.
pub async fn validate(ctx: &CliContext, region_id: &RegionId) -> Result<(), CliError> {
    ctx.store.validate_temp_package(region_id).await?;
    println!("Staged package for {region_id} is valid");
    Ok(())
}

/// Validate and install the staged package of a region.
pub async fn finalise(ctx: &CliContext, region_id: &RegionId) -> Result<(), CliError> {
    ctx.store.finalise_temp_to_final(region_id).await?;
    info!(target: "ridgeline.cli", region_id = %region_id, "Region installed");
    println!(
        "Installed {region_id} at {}",
        ctx.paths.region_dir(region_id)?.display()
    );
    Ok(())
}

/// Delete the installed package, or the staging directory with `temp`.
pub async fn delete(ctx: &CliContext, region_id: &RegionId, temp: bool) -> Result<(), CliError> {
    if temp {
        ctx.store.delete_temp(region_id).await?;
        println!("Deleted staging directory for {region_id}");
    } else {
        ctx.store.delete_region(region_id).await?;
        println!("Deleted region {region_id}");
    }
    Ok(())
}

/// Print the installed and staged size of a region.
pub async fn size(ctx: &CliContext, region_id: &RegionId) -> Result<(), CliError> {
    let installed = ctx.store.get_final_size_bytes(region_id).await?;
    let staged = ctx.store.get_temp_size_bytes(region_id).await?;
    println!("installed = {} ({installed} bytes)", format_bytes(installed));
    println!("staged    = {} ({staged} bytes)", format_bytes(staged));
    Ok(())
}
