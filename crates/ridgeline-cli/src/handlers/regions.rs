//! Regions and reconcile command handlers.

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::format_bytes;

/// List installed regions with their sizes.
pub async fn execute(ctx: &CliContext) -> Result<(), CliError> {
    let regions = ctx.store.list_regions().await?;
    if regions.is_empty() {
        println!("No regions installed");
        return Ok(());
    }
    for id in regions {
        let size = ctx.store.get_final_size_bytes(&id).await?;
        println!("{id}\t{}", format_bytes(size));
    }
    Ok(())
}

/// Restore or clear backups and temp files left by interrupted installs.
pub async fn reconcile(ctx: &CliContext) -> Result<(), CliError> {
    let report = ctx.store.reconcile_backups().await?;
    if report.is_empty() {
        println!("Nothing to reconcile");
        return Ok(());
    }
    for id in &report.restored {
        println!("restored {id}");
    }
    for path in &report.removed {
        println!("removed  {}", path.display());
    }
    Ok(())
}
