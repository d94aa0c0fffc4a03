//! Core download types: job identity, pipeline phases, and persisted state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::region::RegionId;

/// Current schema version of the persisted download state.
pub const DOWNLOAD_STATE_SCHEMA_VERSION: u32 = 1;

/// Identifier of a download job.
///
/// Chosen by the caller; a job id may only be active once at a time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One step of the region download pipeline, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Size estimation and `region.json` seeding.
    Estimating,
    /// Map tile download into `tiles.mbtiles`.
    Tiles,
    /// Elevation model download into `elevation.dem`.
    Dem,
    /// Water, cities, and roads overlays.
    Overlays,
    /// Search index build.
    Index,
    /// Validation and promotion of the staged package.
    Finalise,
}

impl Phase {
    /// The fixed phase order.
    pub const ALL: [Self; 6] = [
        Self::Estimating,
        Self::Tiles,
        Self::Dem,
        Self::Overlays,
        Self::Index,
        Self::Finalise,
    ];

    /// Number of phases in the pipeline.
    pub const COUNT: usize = Self::ALL.len();

    /// Position of this phase in [`Phase::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::Estimating => 0,
            Self::Tiles => 1,
            Self::Dem => 2,
            Self::Overlays => 3,
            Self::Index => 4,
            Self::Finalise => 5,
        }
    }

    /// Phase at `index`, if in range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Convert to the string stored on disk.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Estimating => "estimating",
            Self::Tiles => "tiles",
            Self::Dem => "dem",
            Self::Overlays => "overlays",
            Self::Index => "index",
            Self::Finalise => "finalise",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a download job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Paused,
    Cancelled,
    Completed,
    Error,
}

impl JobStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error details recorded when a phase fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedError {
    pub message: String,
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Resumable progress of a single download job, as stored on disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDownloadState {
    pub schema_version: u32,
    pub job_id: JobId,
    pub region_id: RegionId,
    pub status: JobStatus,
    pub current_phase: Phase,
    pub phase_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PersistedError>,
}

impl PersistedDownloadState {
    /// Fresh state for a job that has not run any phase yet.
    pub fn new(job_id: JobId, region_id: RegionId) -> Self {
        Self {
            schema_version: DOWNLOAD_STATE_SCHEMA_VERSION,
            job_id,
            region_id,
            status: JobStatus::Running,
            current_phase: Phase::ALL[0],
            phase_index: 0,
            downloaded_bytes: None,
            total_bytes: None,
            updated_at: Utc::now(),
            error: None,
        }
    }

    /// Copy of this state with `updated_at` set to now.
    #[must_use]
    pub fn stamped(&self) -> Self {
        Self {
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    /// Phase to re-enter on resume, clamped to the pipeline bounds.
    pub fn resume_phase(&self) -> Phase {
        Phase::from_index(self.phase_index).unwrap_or(Phase::Finalise)
    }
}
