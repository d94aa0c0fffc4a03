//! Region identity, package manifests, and package errors.

mod error;
mod id;
mod manifest;

pub use error::PackageError;
pub use id::{
    RegionId, ValidationError, validate_filename, validate_path_segment, validate_region_id,
};
pub use manifest::{MANIFEST_SCHEMA_VERSION, Manifest, ManifestFile};
