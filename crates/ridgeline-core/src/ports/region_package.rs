//! Region package port definition.
//!
//! Phase handlers materialise artifacts through this port instead of
//! touching the filesystem directly, so the staging and promotion rules
//! live in one place.

use async_trait::async_trait;
use serde_json::Value;

use crate::region::{PackageError, RegionId};

/// Port for staging and promoting region packages.
#[async_trait]
pub trait RegionPackagePort: Send + Sync {
    /// Create the staging directory for a region if absent.
    async fn ensure_temp_region_dir(&self, id: &RegionId) -> Result<(), PackageError>;

    /// Read and parse a staged JSON file. `Ok(None)` if it does not exist.
    async fn read_temp_json(
        &self,
        id: &RegionId,
        filename: &str,
    ) -> Result<Option<Value>, PackageError>;

    /// Atomically write pretty-printed JSON into staging.
    async fn write_temp_json(
        &self,
        id: &RegionId,
        filename: &str,
        value: &Value,
    ) -> Result<(), PackageError>;

    /// Atomically write raw bytes into staging.
    async fn write_temp_file(
        &self,
        id: &RegionId,
        filename: &str,
        data: &[u8],
    ) -> Result<(), PackageError>;

    /// Validate the staged package and promote it to the final location.
    async fn finalise_temp_to_final(&self, id: &RegionId) -> Result<(), PackageError>;
}
