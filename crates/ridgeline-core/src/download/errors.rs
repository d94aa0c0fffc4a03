//! Download error types.
//!
//! These errors are designed to be serializable and not depend on external
//! error types like `std::io::Error`. For I/O errors, we capture the kind,
//! message, and (where one applies) a transient error code as strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{JobStatus, Phase};
use crate::region::{PackageError, ValidationError};

/// Error type for the region download pipeline.
///
/// `Cancelled` and `Paused` are control signals rather than failures: the
/// manager never retries them and turns them into state transitions.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum DownloadError {
    /// A region id or filename failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Package validation or promotion failed.
    #[error(transparent)]
    Package(#[from] PackageError),

    /// I/O error during file operations.
    #[error("I/O error ({kind}): {message}")]
    Io {
        kind: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// Network error from a fetch collaborator.
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Transport error code (e.g. `ECONNRESET`) if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        /// HTTP status code if available.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },

    /// The job was cancelled.
    #[error("Download cancelled")]
    Cancelled,

    /// The job was paused.
    #[error("Download paused")]
    Paused,

    /// A collaborator was never configured.
    #[error("{component} is not configured")]
    NotConfigured { component: String },

    /// No phase handler is registered for a phase.
    #[error("No handler registered for phase {phase}")]
    MissingHandler { phase: Phase },

    /// The job is not known to the manager or the state store.
    #[error("Unknown download job: {job_id}")]
    JobNotFound { job_id: String },

    /// A job with this id is already active.
    #[error("Download job already active: {job_id}")]
    JobAlreadyActive { job_id: String },

    /// The operation is not valid for the job's current status.
    #[error("Cannot {operation} job {job_id} while it is {status}")]
    InvalidState {
        job_id: String,
        status: JobStatus,
        operation: String,
    },

    /// Persisted state could not be read or written.
    #[error("State store error: {message}")]
    Repository { message: String },

    /// General/uncategorized error.
    #[error("{message}")]
    Other { message: String },
}

impl DownloadError {
    /// Create an I/O error from a `std::io::Error`.
    ///
    /// Network-flavoured kinds get the matching transient code.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        use std::io::ErrorKind;

        let code = match err.kind() {
            ErrorKind::TimedOut => Some("ETIMEDOUT"),
            ErrorKind::ConnectionReset => Some("ECONNRESET"),
            _ => None,
        };
        Self::Io {
            kind: format!("{:?}", err.kind()),
            message: err.to_string(),
            code: code.map(str::to_string),
        }
    }

    /// Create a network error without a code.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: None,
            status_code: None,
        }
    }

    /// Create a network error carrying a transport error code.
    pub fn network_with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: Some(code.into()),
            status_code: None,
        }
    }

    /// Create a network error with HTTP status code.
    pub fn network_with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::Network {
            message: message.into(),
            code: None,
            status_code: Some(status_code),
        }
    }

    /// Create an error explicitly marked as transient.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::network_with_code(message, "TRANSIENT")
    }

    /// Create a not-configured error.
    pub fn not_configured(component: impl Into<String>) -> Self {
        Self::NotConfigured {
            component: component.into(),
        }
    }

    /// Create a repository error.
    pub fn repository(message: impl Into<String>) -> Self {
        Self::Repository {
            message: message.into(),
        }
    }

    /// Create a general error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Whether this is a pause or cancel signal rather than a failure.
    pub const fn is_control_signal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Paused)
    }

    /// Transport error code, if this error carries one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Io { code, .. } | Self::Network { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io_error(&err)
    }
}

impl From<serde_json::Error> for DownloadError {
    fn from(err: serde_json::Error) -> Self {
        Self::other(format!("JSON error: {err}"))
    }
}
