//! `ridgeline` command-line adapter.
//!
//! - `parser` / `commands` - clap definitions
//! - `bootstrap` - composition root building storage and the download manager
//! - `handlers` - one module per command group
//! - `error` - exit codes for lower-layer errors
#![deny(unused_crate_dependencies)]

// Used by main.rs only
use anyhow as _;
use dotenvy as _;
use tokio as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;

/// Run one command against a composed context.
pub async fn dispatch(ctx: &CliContext, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Paths => handlers::paths::execute(ctx),
        Commands::Status { job_id, region_id } => {
            handlers::status::execute(ctx, &job_id, &region_id).await
        }
        Commands::Forget { job_id, region_id } => {
            handlers::status::forget(ctx, &job_id, &region_id).await
        }
        Commands::Validate { region_id } => handlers::package::validate(ctx, &region_id).await,
        Commands::Finalise { region_id } => handlers::package::finalise(ctx, &region_id).await,
        Commands::Delete { region_id, temp } => {
            handlers::package::delete(ctx, &region_id, temp).await
        }
        Commands::Size { region_id } => handlers::package::size(ctx, &region_id).await,
        Commands::Regions => handlers::regions::execute(ctx).await,
        Commands::Reconcile => handlers::regions::reconcile(ctx).await,
        Commands::Dem {
            region_id,
            job_id,
            bounds,
            width,
            height,
            encoding,
            resolution,
        } => {
            let args = handlers::dem::DemArgs {
                region_id,
                job_id,
                bounds,
                width,
                height,
                encoding,
                resolution,
            };
            handlers::dem::execute(ctx, args).await
        }
    }
}
