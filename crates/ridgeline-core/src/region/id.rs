//! Region identifiers and path-segment validation.
//!
//! A region id and every filename written into a package end up as a single
//! path component. Both go through the same check so that no caller can
//! escape the region root, whatever the source of the value.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a region id or filename is rejected.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ValidationError {
    /// The value was empty.
    #[error("{field} must not be empty")]
    Empty { field: String },

    /// The value contained `/` or `\`.
    #[error("{field} must not contain path separators: {value:?}")]
    PathSeparator { field: String, value: String },

    /// The value contained `..`.
    #[error("{field} must not contain '..': {value:?}")]
    ParentTraversal { field: String, value: String },

    /// The value started with `.`.
    #[error("{field} must not start with '.': {value:?}")]
    LeadingDot { field: String, value: String },

    /// The value contained a NUL byte.
    #[error("{field} must not contain a null byte")]
    NullByte { field: String },
}

/// Validate a single path segment.
///
/// `field` names the value in the error message (`"region id"`, `"filename"`).
pub fn validate_path_segment(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty {
            field: field.to_string(),
        });
    }
    if value.contains('\0') {
        return Err(ValidationError::NullByte {
            field: field.to_string(),
        });
    }
    if value.contains('/') || value.contains('\\') {
        return Err(ValidationError::PathSeparator {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    if value.contains("..") {
        return Err(ValidationError::ParentTraversal {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    if value.starts_with('.') {
        return Err(ValidationError::LeadingDot {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Validate a raw region id string.
pub fn validate_region_id(value: &str) -> Result<(), ValidationError> {
    validate_path_segment("region id", value)
}

/// Validate a filename written into a staging directory.
pub fn validate_filename(value: &str) -> Result<(), ValidationError> {
    validate_path_segment("filename", value)
}

/// Opaque, validated identifier of an offline region.
///
/// Construction (including deserialization) always validates, so a
/// `RegionId` in hand is safe to join onto a directory.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegionId(String);

impl RegionId {
    /// Parse and validate a region id.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        validate_region_id(&value)?;
        Ok(Self(value))
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RegionId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RegionId> for String {
    fn from(id: RegionId) -> Self {
        id.0
    }
}

impl AsRef<str> for RegionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RegionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
