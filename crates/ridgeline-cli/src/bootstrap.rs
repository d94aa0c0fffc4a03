//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter. All concrete implementations are instantiated here:
//! - Region package store and download state store (via ridgeline-storage)
//! - Download manager (via ridgeline-download)
//!
//! Command handlers receive the composed `CliContext`.

use std::path::PathBuf;
use std::sync::Arc;

use ridgeline_core::paths::{RegionPaths, data_root};
use ridgeline_core::ports::RegionPackagePort;
use ridgeline_core::settings::{PipelineSettings, validate_settings};
use ridgeline_download::{
    DownloadManager, DownloadManagerDeps, PhaseHandlers, RetryOptions, build_download_manager,
};
use ridgeline_storage::{JsonDownloadStateRepository, RegionPackageStore};
use tracing::debug;

use crate::error::CliError;
use crate::parser::Cli;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Root of the `regions/` and `tmp/` trees.
    pub data_dir: PathBuf,
    /// Pipeline settings after validation.
    pub settings: PipelineSettings,
}

impl CliConfig {
    /// Resolve config from parsed arguments.
    ///
    /// `--data-dir` (or `RIDGELINE_DATA_DIR`) wins over the platform data
    /// directory. Retry settings are validated here so no handler sees an
    /// unusable policy.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let data_dir = match &cli.data_dir {
            Some(dir) if dir.as_os_str().is_empty() => {
                return Err(CliError::Config("--data-dir cannot be empty".to_string()));
            }
            Some(dir) => dir.clone(),
            None => data_root()?,
        };

        let settings = PipelineSettings {
            retry: cli.retry.settings(),
        };
        validate_settings(&settings)?;

        Ok(Self { data_dir, settings })
    }
}

/// Fully composed context for CLI commands.
pub struct CliContext {
    /// Path resolver rooted at the data directory.
    pub paths: RegionPaths,
    /// Region package store.
    pub store: Arc<RegionPackageStore>,
    /// Persisted download job state.
    pub state_repo: Arc<JsonDownloadStateRepository>,
    /// Validated pipeline settings.
    pub settings: PipelineSettings,
}

impl CliContext {
    /// The package store as the port phase handlers use.
    pub fn package_port(&self) -> Arc<dyn RegionPackagePort> {
        Arc::clone(&self.store) as Arc<dyn RegionPackagePort>
    }

    /// Build a download manager over the context's stores.
    pub fn download_manager(&self, handlers: PhaseHandlers) -> DownloadManager {
        build_download_manager(DownloadManagerDeps {
            handlers,
            state_repo: Arc::clone(&self.state_repo),
            retry: RetryOptions::from_settings(&self.settings.retry),
        })
    }
}

/// Bootstrap the CLI application.
///
/// Creates the data directory layout (including its `CACHEDIR.TAG`) and
/// the storage adapters.
pub async fn bootstrap(config: CliConfig) -> Result<CliContext, CliError> {
    let paths = RegionPaths::new(config.data_dir);
    let store = Arc::new(RegionPackageStore::new(paths.clone()));
    store.init().await?;

    let state_repo = Arc::new(JsonDownloadStateRepository::new(paths.clone()));

    debug!(
        target: "ridgeline.cli",
        base_dir = %paths.base_dir().display(),
        retries = config.settings.retry.retries,
        "CLI context ready"
    );

    Ok(CliContext {
        paths,
        store,
        state_repo,
        settings: config.settings,
    })
}
