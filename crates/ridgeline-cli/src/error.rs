//! CLI-specific error types and mappings.
//!
//! This module maps errors from the lower layers to exit codes and
//! user-facing messages.

use ridgeline_core::download::DownloadError;
use ridgeline_core::paths::PathError;
use ridgeline_core::ports::RepositoryError;
use ridgeline_core::region::{PackageError, ValidationError};
use ridgeline_core::settings::SettingsError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument validation error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// A staged package or stored record failed validation.
    #[error("{0}")]
    InvalidData(String),

    /// The requested record or directory does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error (permission denied, disk full, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A download job ended in a non-completed state.
    #[error("Download failed: {0}")]
    Download(String),

    /// An install failed and the previous package could not be restored.
    #[error("{0}. Run `ridgeline reconcile`, or re-download the region")]
    NeedsAttention(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Download(_) => 1,
            Self::Arguments(_) => 2,
            Self::InvalidData(_) => 65,    // EX_DATAERR
            Self::NotFound(_) => 66,       // EX_NOINPUT
            Self::NeedsAttention(_) => 70, // EX_SOFTWARE
            Self::Io(_) => 74,             // EX_IOERR
            Self::Config(_) => 78,         // EX_CONFIG
        }
    }
}

impl From<PackageError> for CliError {
    fn from(err: PackageError) -> Self {
        match err {
            PackageError::Validation(e) => Self::from(e),
            PackageError::MissingStagingDir { .. } => Self::NotFound(err.to_string()),
            PackageError::Io { .. } | PackageError::FinaliseFailed { .. } => {
                Self::Io(err.to_string())
            }
            PackageError::RestoreFailed { .. } => Self::NeedsAttention(err.to_string()),
            _ => Self::InvalidData(err.to_string()),
        }
    }
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        Self::Arguments(err.to_string())
    }
}

impl From<PathError> for CliError {
    fn from(err: PathError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<RepositoryError> for CliError {
    fn from(err: RepositoryError) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<DownloadError> for CliError {
    fn from(err: DownloadError) -> Self {
        match err {
            DownloadError::Package(e) => Self::from(e),
            DownloadError::Validation(e) => Self::from(e),
            DownloadError::JobNotFound { .. } => Self::NotFound(err.to_string()),
            DownloadError::NotConfigured { .. } => Self::Config(err.to_string()),
            other => Self::Download(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
