//! Region package error types.
//!
//! Like the download errors, these carry strings rather than `std::io::Error`
//! so they can be persisted in the download state and cross process
//! boundaries unchanged.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::ValidationError;

/// Errors raised while validating, staging, or promoting a region package.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum PackageError {
    /// A region id or filename failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The staging directory for the region does not exist.
    #[error("staging directory {path} does not exist")]
    MissingStagingDir { path: String },

    /// A required package file is absent.
    #[error("required file {name} is missing")]
    MissingFile { name: String },

    /// A required package entry exists but is not a regular file.
    #[error("{name} is not a regular file")]
    NotAFile { name: String },

    /// A required package file has zero length.
    #[error("{name} is empty")]
    EmptyFile { name: String },

    /// A `*.json` file failed to parse.
    #[error("{name} is not valid JSON: {message}")]
    InvalidJson { name: String, message: String },

    /// `manifest.json` does not have the expected shape.
    #[error("manifest.json is malformed: {reason}")]
    InvalidManifest { reason: String },

    /// The manifest belongs to a different region.
    #[error("manifest regionId {found:?} does not match region {expected:?}")]
    ManifestRegionMismatch { expected: String, found: String },

    /// A file listed in the manifest is absent from the package.
    #[error("manifest lists {name} but it is missing")]
    ManifestFileMissing { name: String },

    /// A file listed in the manifest has a different size on disk.
    #[error("manifest size mismatch for {name}: expected {expected} bytes, found {actual}")]
    ManifestSizeMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    /// An underlying filesystem operation failed.
    #[error("I/O error ({kind}) on {path}: {message}")]
    Io {
        kind: String,
        path: String,
        message: String,
    },

    /// Promotion failed and the previous package was restored.
    #[error("finalisation of region {region_id} failed: {message}")]
    FinaliseFailed { region_id: String, message: String },

    /// Promotion failed and restoring the previous package also failed.
    ///
    /// The region may have no usable package until it is re-downloaded or
    /// the backup at `backup_path` is reconciled.
    #[error(
        "finalisation of region {region_id} failed: {message}; restoring backup {backup_path} also failed: {restore_message}"
    )]
    RestoreFailed {
        region_id: String,
        message: String,
        backup_path: String,
        restore_message: String,
    },
}

impl PackageError {
    /// Build an I/O error from its parts.
    pub fn io(
        kind: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Io {
            kind: kind.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Build an invalid-manifest error.
    pub fn invalid_manifest(reason: impl Into<String>) -> Self {
        Self::InvalidManifest {
            reason: reason.into(),
        }
    }

    /// Whether the error means recovery was incomplete and needs attention.
    pub const fn needs_attention(&self) -> bool {
        matches!(self, Self::RestoreFailed { .. })
    }
}
