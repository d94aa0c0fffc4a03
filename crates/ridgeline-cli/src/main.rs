//! CLI entry point.
//!
//! Wires logging and configuration, bootstraps the context, and maps
//! command errors to exit codes.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use ridgeline_cli::{Cli, CliConfig, bootstrap, dispatch};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads its env fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command.clone() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let result = async {
        let config = CliConfig::from_cli(&cli)?;
        let ctx = bootstrap(config).await?;
        dispatch(&ctx, command).await
    }
    .await;

    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(err.exit_code());
    }
    Ok(())
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug and the default is warn.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
