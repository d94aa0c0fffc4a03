//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the download engine expects from
//! infrastructure. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No `std::fs` or `tokio::fs` types in any signature
//! - Storage ports speak in region ids and filenames, never raw paths
//! - Collaborators outside this workspace (tile fetchers, elevation
//!   services) plug in through these traits

pub mod download_manager;
pub mod download_state;
pub mod elevation;
pub mod region_package;

use thiserror::Error;

use crate::download::DownloadError;

pub use download_manager::{DownloadRequest, ProgressCallback, RegionDownloadPort, Subscription};
pub use download_state::DownloadStateRepositoryPort;
pub use elevation::{
    Bounds, DemEncoding, DemMetadata, DemProgress, DemRequest, DemResult, ElevationProviderPort,
};
pub use region_package::RegionPackagePort;

/// Domain-specific errors for repository operations.
///
/// This error type abstracts away storage implementation details so the
/// download engine never sees `std::io::Error` from a state store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The state could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The state could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<RepositoryError> for DownloadError {
    fn from(err: RepositoryError) -> Self {
        Self::repository(err.to_string())
    }
}
