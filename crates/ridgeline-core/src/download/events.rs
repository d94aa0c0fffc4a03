//! Progress events delivered to download subscribers.

use serde::{Deserialize, Serialize};

use super::types::{JobId, JobStatus, Phase};

/// A single progress notification for a job.
///
/// `percent` is only present when both byte counts are known.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub phase: Phase,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Partial progress reported by a phase handler.
///
/// Fields left as `None` keep their previous value in the job state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgressPatch {
    pub downloaded_bytes: Option<u64>,
    pub total_bytes: Option<u64>,
    pub message: Option<String>,
}

impl ProgressPatch {
    /// Patch carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Patch carrying byte counts.
    pub const fn bytes(downloaded: u64, total: Option<u64>) -> Self {
        Self {
            downloaded_bytes: Some(downloaded),
            total_bytes: total,
            message: None,
        }
    }
}

/// Percentage complete, or `None` unless both totals are known and non-zero.
#[allow(clippy::cast_precision_loss)]
pub fn compute_percent(downloaded: Option<u64>, total: Option<u64>) -> Option<f64> {
    match (downloaded, total) {
        (Some(done), Some(total)) if total > 0 => {
            Some(((done as f64 / total as f64) * 100.0).clamp(0.0, 100.0))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_requires_both_totals() {
        assert_eq!(compute_percent(Some(50), Some(200)), Some(25.0));
        assert_eq!(compute_percent(Some(50), None), None);
        assert_eq!(compute_percent(None, Some(200)), None);
        assert_eq!(compute_percent(Some(0), Some(0)), None);
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(compute_percent(Some(300), Some(200)), Some(100.0));
    }

    #[test]
    fn event_omits_unknown_fields() {
        let event = ProgressEvent {
            job_id: JobId::new("j1"),
            phase: Phase::Tiles,
            status: JobStatus::Running,
            downloaded_bytes: None,
            total_bytes: None,
            percent: None,
            message: Some("Starting tiles".into()),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["phase"], "tiles");
        assert!(value.get("percent").is_none());
        assert_eq!(value["message"], "Starting tiles");
    }
}
