//! Elevation provider port definition.
//!
//! The DEM phase asks a provider for an elevation grid covering a region's
//! bounds. Real providers fetch from a network service; the workspace ships
//! an unconfigured placeholder and a deterministic synthetic generator.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::download::DownloadError;
use crate::region::RegionId;

/// Geographic bounding box in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl Bounds {
    /// Whether the box is well-formed and inside WGS84 limits.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.min_lat)
            && (-90.0..=90.0).contains(&self.max_lat)
            && (-180.0..=180.0).contains(&self.min_lon)
            && (-180.0..=180.0).contains(&self.max_lon)
            && self.min_lat < self.max_lat
            && self.min_lon < self.max_lon
    }
}

/// Sample encoding of a DEM payload. Always little-endian.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemEncoding {
    /// Signed 16-bit integer metres.
    #[default]
    Int16Le,
    /// IEEE-754 32-bit float metres.
    Float32Le,
}

impl DemEncoding {
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::Int16Le => 2,
            Self::Float32Le => 4,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int16Le => "int16_le",
            Self::Float32Le => "float32_le",
        }
    }
}

impl fmt::Display for DemEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DemEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int16" | "int16_le" => Ok(Self::Int16Le),
            "float32" | "float32_le" => Ok(Self::Float32Le),
            other => Err(format!("unknown DEM encoding: {other}")),
        }
    }
}

/// Request for an elevation grid.
#[derive(Clone, Debug, PartialEq)]
pub struct DemRequest {
    pub region_id: RegionId,
    pub bounds: Bounds,
    pub encoding: DemEncoding,
    pub target_resolution_meters: Option<f64>,
}

/// Description of a DEM payload, merged into `region.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemMetadata {
    pub encoding: DemEncoding,
    pub width: u32,
    pub height: u32,
    pub bounds: Bounds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_meters: Option<f64>,
    pub min_elevation: f64,
    pub max_elevation: f64,
}

impl DemMetadata {
    /// Byte length a payload with this metadata must have.
    pub const fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.encoding.bytes_per_sample()
    }
}

/// Elevation grid returned by a provider.
#[derive(Clone, Debug, PartialEq)]
pub struct DemResult {
    pub metadata: DemMetadata,
    pub data: Vec<u8>,
}

/// Byte-level progress of a DEM fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DemProgress {
    pub downloaded: u64,
    pub total: Option<u64>,
}

/// Port for fetching elevation data.
#[async_trait]
pub trait ElevationProviderPort: Send + Sync {
    /// Fetch an elevation grid, reporting progress through `on_progress`.
    async fn fetch_dem(
        &self,
        request: &DemRequest,
        on_progress: &(dyn Fn(DemProgress) + Send + Sync),
    ) -> Result<DemResult, DownloadError>;
}
