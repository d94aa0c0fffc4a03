//! Platform data directory resolution.

use std::ffi::OsString;
use std::path::PathBuf;

use super::error::PathError;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "RIDGELINE_DATA_DIR";

/// Get the root directory for offline region data.
///
/// Resolution order:
/// 1. `RIDGELINE_DATA_DIR` environment variable (highest priority)
/// 2. System data directory (e.g., `~/.local/share/ridgeline`)
pub fn data_root() -> Result<PathBuf, PathError> {
    resolve_data_root(std::env::var_os(DATA_DIR_ENV), dirs::data_dir())
}

/// Pure form of [`data_root`] for callers that already hold the inputs.
pub fn resolve_data_root(
    env_override: Option<OsString>,
    system_data_dir: Option<PathBuf>,
) -> Result<PathBuf, PathError> {
    if let Some(value) = env_override {
        if value.is_empty() {
            return Err(PathError::EmptyPath);
        }
        return Ok(PathBuf::from(value));
    }

    system_data_dir
        .map(|dir| dir.join("ridgeline"))
        .ok_or(PathError::NoDataDir)
}
