//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use std::path::PathBuf;

use clap::{Args, Parser};
use ridgeline_core::settings::{
    DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_DELAY_MS, DEFAULT_RETRIES, RetrySettings,
};

use crate::commands::Commands;

/// Command-line interface for managing offline map regions.
///
/// This is the top-level parser that handles global options and dispatches
/// to subcommands.
#[derive(Parser, Debug)]
#[command(name = "ridgeline")]
#[command(about = "Inspect, validate and install offline map region packages")]
#[command(version)]
pub struct Cli {
    /// Override the data directory for this invocation
    #[arg(long = "data-dir", env = "RIDGELINE_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub retry: RetryArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Retry policy flags, shared by every command that runs phases.
#[derive(Args, Debug, Clone)]
pub struct RetryArgs {
    /// Retries per phase after the first attempt
    #[arg(long, env = "RIDGELINE_RETRIES", default_value_t = DEFAULT_RETRIES, global = true)]
    pub retries: u32,

    /// Delay before the first retry, in milliseconds
    #[arg(long, env = "RIDGELINE_BASE_DELAY_MS", default_value_t = DEFAULT_BASE_DELAY_MS, global = true)]
    pub base_delay_ms: u64,

    /// Upper bound for the backoff delay, in milliseconds
    #[arg(long, env = "RIDGELINE_MAX_DELAY_MS", default_value_t = DEFAULT_MAX_DELAY_MS, global = true)]
    pub max_delay_ms: u64,

    /// Disable random jitter on backoff delays
    #[arg(long, global = true)]
    pub no_jitter: bool,
}

impl RetryArgs {
    pub const fn settings(&self) -> RetrySettings {
        RetrySettings {
            retries: self.retries,
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
            jitter: !self.no_jitter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from([
            "ridgeline",
            "--verbose",
            "--data-dir",
            "/tmp/maps",
            "regions",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/maps")));
        assert!(matches!(cli.command, Some(Commands::Regions)));
    }

    #[test]
    fn test_retry_flags_map_to_settings() {
        let cli = Cli::parse_from([
            "ridgeline",
            "reconcile",
            "--retries",
            "5",
            "--base-delay-ms",
            "100",
            "--no-jitter",
        ]);
        let settings = cli.retry.settings();
        assert_eq!(settings.retries, 5);
        assert_eq!(settings.base_delay_ms, 100);
        assert_eq!(settings.max_delay_ms, DEFAULT_MAX_DELAY_MS);
        assert!(!settings.jitter);
    }
}
