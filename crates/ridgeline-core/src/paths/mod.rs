//! Path utilities for ridgeline data directories and region packages.
//!
//! # Design
//!
//! - Pure functions returning `PathBuf`; no filesystem access
//! - Region ids are re-validated at every join
//! - OS-specific lookup is kept in `platform`

mod error;
mod layout;
mod platform;

pub use error::PathError;
pub use layout::{Artifact, DOWNLOAD_STATE_FILE, REGIONS_DIR_NAME, RegionPaths, TMP_DIR_NAME};
pub use platform::{DATA_DIR_ENV, data_root, resolve_data_root};
