//! On-disk region package store.
//!
//! Packages are assembled under `<root>/tmp/<id>` and promoted to
//! `<root>/regions/<id>` by [`RegionPackageStore::finalise_temp_to_final`].
//! Every path is derived through [`RegionPaths`], so region ids and
//! filenames are validated before any filesystem call.

mod finalise;
mod reconcile;
mod validate;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ridgeline_core::paths::RegionPaths;
use ridgeline_core::region::{PackageError, RegionId, validate_filename};
use ridgeline_core::ports::RegionPackagePort;
use serde_json::Value;
use tracing::{debug, info};

use crate::fs::{FileOps, FsError};

pub use reconcile::ReconcileReport;

/// Name of the backup-exclusion marker written at the data root.
pub const CACHEDIR_TAG: &str = "CACHEDIR.TAG";

const CACHEDIR_TAG_CONTENT: &str = "Signature: 8a477f597d28d172789f06886806bc55\n\
# This file is a cache directory tag created by ridgeline.\n\
# For information about cache directory tags see https://bford.info/cachedir/\n";

/// Region package store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct RegionPackageStore {
    paths: RegionPaths,
    ops: FileOps,
}

impl RegionPackageStore {
    /// Store over the real filesystem.
    pub fn new(paths: RegionPaths) -> Self {
        Self::with_file_ops(paths, FileOps::default())
    }

    pub fn with_file_ops(paths: RegionPaths, ops: FileOps) -> Self {
        Self { paths, ops }
    }

    pub fn paths(&self) -> &RegionPaths {
        &self.paths
    }

    /// Create the base, regions and tmp directories. Safe to repeat.
    pub async fn init(&self) -> Result<(), PackageError> {
        let base = self.paths.base_dir();
        self.ops.ensure_dir(base).await?;
        self.ops.ensure_dir(&self.paths.regions_dir()).await?;
        self.ops.ensure_dir(&self.paths.tmp_dir()).await?;

        let tag = base.join(CACHEDIR_TAG);
        if !self.ops.exists(&tag).await? {
            self.ops
                .write_file_atomic(&tag, CACHEDIR_TAG_CONTENT.as_bytes())
                .await?;
        }

        debug!(target: "ridgeline.storage", base = %base.display(), "Region store initialised");
        Ok(())
    }

    /// Create the staging directory for a region and return its path.
    pub async fn ensure_temp_region_dir(&self, id: &RegionId) -> Result<PathBuf, PackageError> {
        let dir = self.paths.tmp_region_dir(id)?;
        self.ops.ensure_dir(&dir).await?;
        Ok(dir)
    }

    /// Create the final directory for a region and return its path.
    pub async fn ensure_final_region_dir(&self, id: &RegionId) -> Result<PathBuf, PackageError> {
        let dir = self.paths.region_dir(id)?;
        self.ops.ensure_dir(&dir).await?;
        Ok(dir)
    }

    /// Atomically write `value` as pretty JSON into staging.
    pub async fn write_temp_json(
        &self,
        id: &RegionId,
        filename: &str,
        value: &Value,
    ) -> Result<(), PackageError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| PackageError::InvalidJson {
            name: filename.to_string(),
            message: e.to_string(),
        })?;
        self.write_temp_file(id, filename, &bytes).await
    }

    /// Atomically write raw bytes into staging.
    pub async fn write_temp_file(
        &self,
        id: &RegionId,
        filename: &str,
        data: &[u8],
    ) -> Result<(), PackageError> {
        validate_filename(filename)?;
        let dir = self.ensure_temp_region_dir(id).await?;
        self.ops.write_file_atomic(&dir.join(filename), data).await?;
        Ok(())
    }

    /// Read and parse a staged JSON file; `None` if it does not exist.
    pub async fn read_temp_json(
        &self,
        id: &RegionId,
        filename: &str,
    ) -> Result<Option<Value>, PackageError> {
        validate_filename(filename)?;
        let path = self.paths.tmp_region_dir(id)?.join(filename);
        let bytes = match self.ops.read_file(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        parse_json(filename, &bytes).map(Some)
    }

    /// Remove the final package of a region. Missing is success.
    pub async fn delete_region(&self, id: &RegionId) -> Result<(), PackageError> {
        let dir = self.paths.region_dir(id)?;
        self.ops.remove(&dir).await?;
        info!(target: "ridgeline.storage", region_id = %id, "Deleted region package");
        Ok(())
    }

    /// Remove the staging directory of a region. Missing is success.
    pub async fn delete_temp(&self, id: &RegionId) -> Result<(), PackageError> {
        let dir = self.paths.tmp_region_dir(id)?;
        self.ops.remove(&dir).await?;
        debug!(target: "ridgeline.storage", region_id = %id, "Deleted staging directory");
        Ok(())
    }

    /// Bytes under the staging directory; 0 if absent.
    pub async fn get_temp_size_bytes(&self, id: &RegionId) -> Result<u64, PackageError> {
        let dir = self.paths.tmp_region_dir(id)?;
        Ok(self.ops.dir_size(&dir).await?)
    }

    /// Bytes under the final directory; 0 if absent.
    pub async fn get_final_size_bytes(&self, id: &RegionId) -> Result<u64, PackageError> {
        let dir = self.paths.region_dir(id)?;
        Ok(self.ops.dir_size(&dir).await?)
    }

    /// Ids of finalised regions, sorted.
    ///
    /// Backups are dot-prefixed, so they fail id validation like any other
    /// stray entry.
    pub async fn list_regions(&self) -> Result<Vec<RegionId>, PackageError> {
        let root = self.paths.regions_dir();
        let names = self.list_or_empty(&root).await?;

        let mut regions = Vec::new();
        for name in names {
            let Ok(id) = RegionId::new(name.as_str()) else {
                continue;
            };
            if self.ops.stat(&root.join(&name)).await?.is_dir {
                regions.push(id);
            }
        }
        Ok(regions)
    }

    async fn list_or_empty(&self, dir: &Path) -> Result<Vec<String>, FsError> {
        match self.ops.list_dir(dir).await {
            Ok(names) => Ok(names),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

fn parse_json(name: &str, bytes: &[u8]) -> Result<Value, PackageError> {
    serde_json::from_slice(bytes).map_err(|e| PackageError::InvalidJson {
        name: name.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl RegionPackagePort for RegionPackageStore {
    async fn ensure_temp_region_dir(&self, id: &RegionId) -> Result<(), PackageError> {
        Self::ensure_temp_region_dir(self, id).await.map(|_| ())
    }

    async fn read_temp_json(
        &self,
        id: &RegionId,
        filename: &str,
    ) -> Result<Option<Value>, PackageError> {
        Self::read_temp_json(self, id, filename).await
    }

    async fn write_temp_json(
        &self,
        id: &RegionId,
        filename: &str,
        value: &Value,
    ) -> Result<(), PackageError> {
        Self::write_temp_json(self, id, filename, value).await
    }

    async fn write_temp_file(
        &self,
        id: &RegionId,
        filename: &str,
        data: &[u8],
    ) -> Result<(), PackageError> {
        Self::write_temp_file(self, id, filename, data).await
    }

    async fn finalise_temp_to_final(&self, id: &RegionId) -> Result<(), PackageError> {
        Self::finalise_temp_to_final(self, id).await
    }
}
