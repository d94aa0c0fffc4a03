//! Pure mapping from region ids to on-disk package paths.
//!
//! Layout:
//!
//! ```text
//! <base>/regions/<id>/{region.json, tiles.mbtiles, ..., manifest.json}
//! <base>/tmp/<id>/{...same names..., download_state.json}
//! ```
//!
//! Every accessor re-validates the id before joining, even though
//! `RegionId` is validated on construction.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::region::{RegionId, ValidationError, validate_region_id};

/// Name of the finalised regions root under the base directory.
pub const REGIONS_DIR_NAME: &str = "regions";

/// Name of the staging root under the base directory.
pub const TMP_DIR_NAME: &str = "tmp";

/// Download progress file kept in a region's staging directory.
///
/// It belongs to the download job, not the package: manifests never list
/// it and it is not promoted with the package.
pub const DOWNLOAD_STATE_FILE: &str = "download_state.json";

/// Artifact kinds that make up a region package.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Artifact {
    Region,
    Tiles,
    Dem,
    Water,
    Cities,
    Roads,
    Index,
    Manifest,
}

impl Artifact {
    /// All artifact kinds.
    pub const ALL: [Self; 8] = [
        Self::Region,
        Self::Tiles,
        Self::Dem,
        Self::Water,
        Self::Cities,
        Self::Roads,
        Self::Index,
        Self::Manifest,
    ];

    /// Artifacts a package cannot be promoted without.
    pub const REQUIRED: [Self; 5] = [
        Self::Region,
        Self::Tiles,
        Self::Water,
        Self::Cities,
        Self::Roads,
    ];

    /// On-disk filename.
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Region => "region.json",
            Self::Tiles => "tiles.mbtiles",
            Self::Dem => "elevation.dem",
            Self::Water => "water.json",
            Self::Cities => "cities.json",
            Self::Roads => "roads.json",
            Self::Index => "index.sqlite",
            Self::Manifest => "manifest.json",
        }
    }

    /// Whether the package is valid without this artifact.
    pub const fn is_optional(self) -> bool {
        matches!(self, Self::Dem | Self::Index | Self::Manifest)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Path resolver rooted at a base directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionPaths {
    base_dir: PathBuf,
}

impl RegionPaths {
    /// Create a resolver rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Root holding finalised region packages.
    pub fn regions_dir(&self) -> PathBuf {
        self.base_dir.join(REGIONS_DIR_NAME)
    }

    /// Root holding staging directories.
    pub fn tmp_dir(&self) -> PathBuf {
        self.base_dir.join(TMP_DIR_NAME)
    }

    /// Final package directory for a region.
    pub fn region_dir(&self, id: &RegionId) -> Result<PathBuf, ValidationError> {
        validate_region_id(id.as_str())?;
        Ok(self.regions_dir().join(id.as_str()))
    }

    /// Staging directory for a region.
    pub fn tmp_region_dir(&self, id: &RegionId) -> Result<PathBuf, ValidationError> {
        validate_region_id(id.as_str())?;
        Ok(self.tmp_dir().join(id.as_str()))
    }

    /// Final path of an artifact.
    pub fn artifact(&self, id: &RegionId, artifact: Artifact) -> Result<PathBuf, ValidationError> {
        Ok(self.region_dir(id)?.join(artifact.file_name()))
    }

    /// Staging path of an artifact.
    pub fn tmp_artifact(
        &self,
        id: &RegionId,
        artifact: Artifact,
    ) -> Result<PathBuf, ValidationError> {
        Ok(self.tmp_region_dir(id)?.join(artifact.file_name()))
    }

    /// Persisted download state for jobs on a region.
    pub fn download_state(&self, id: &RegionId) -> Result<PathBuf, ValidationError> {
        Ok(self.tmp_region_dir(id)?.join(DOWNLOAD_STATE_FILE))
    }
}
