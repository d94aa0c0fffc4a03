//! Terminal formatting helpers shared by handlers.

use std::fmt::Write as _;

use ridgeline_core::download::{Phase, PersistedDownloadState, compute_percent};

const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Human-readable byte count, e.g. `1.5 MiB`.
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// `key = value` lines describing a persisted job.
pub fn format_state(state: &PersistedDownloadState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "job        = {}", state.job_id);
    let _ = writeln!(out, "region     = {}", state.region_id);
    let _ = writeln!(out, "status     = {}", state.status);
    let _ = writeln!(
        out,
        "phase      = {} ({}/{})",
        state.current_phase,
        state.phase_index + 1,
        Phase::COUNT
    );
    match (state.downloaded_bytes, state.total_bytes) {
        (Some(done), Some(total)) => {
            let percent = compute_percent(Some(done), Some(total)).unwrap_or_default();
            let _ = writeln!(
                out,
                "progress   = {} / {} ({percent:.1}%)",
                format_bytes(done),
                format_bytes(total)
            );
        }
        (Some(done), None) => {
            let _ = writeln!(out, "progress   = {}", format_bytes(done));
        }
        _ => {}
    }
    let _ = writeln!(out, "updated_at = {}", state.updated_at.to_rfc3339());
    if let Some(error) = &state.error {
        let code = error
            .code
            .as_deref()
            .map(|c| format!(", code {c}"))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "error      = {} (phase {}{code})",
            error.message, error.phase
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridgeline_core::download::{JobId, JobStatus, PersistedError};
    use ridgeline_core::region::RegionId;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_format_state_includes_error_and_progress() {
        let mut state = PersistedDownloadState::new(JobId::new("j1"), RegionId::new("alps").unwrap());
        state.status = JobStatus::Error;
        state.current_phase = Phase::Dem;
        state.phase_index = Phase::Dem.index();
        state.downloaded_bytes = Some(512);
        state.total_bytes = Some(2048);
        state.error = Some(PersistedError {
            message: "connection reset".to_string(),
            phase: Phase::Dem,
            code: Some("ECONNRESET".to_string()),
        });

        let text = format_state(&state);
        assert!(text.contains("status     = error"), "{text}");
        assert!(text.contains("phase      = dem (3/6)"), "{text}");
        assert!(text.contains("512 B / 2.0 KiB (25.0%)"), "{text}");
        assert!(text.contains("connection reset (phase dem, code ECONNRESET)"), "{text}");
    }
}
