//! Package manifest: the list of files and byte sizes a region ships with.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::PackageError;
use super::id::RegionId;

/// Current manifest schema version.
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// One file entry in a manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFile {
    pub name: String,
    pub size_bytes: u64,
}

/// `manifest.json` contents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub schema_version: u32,
    /// RFC 3339 timestamp of generation.
    pub generated_at: String,
    pub region_id: String,
    pub files: Vec<ManifestFile>,
}

impl Manifest {
    /// Build a manifest from a staged file listing.
    ///
    /// Entries are sorted by name so the same directory always produces the
    /// same file list.
    pub fn build(region_id: &RegionId, files: impl IntoIterator<Item = ManifestFile>) -> Self {
        let mut files: Vec<ManifestFile> = files.into_iter().collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            schema_version: MANIFEST_SCHEMA_VERSION,
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            region_id: region_id.to_string(),
            files,
        }
    }

    /// Check the shape of a parsed `manifest.json` and convert it.
    ///
    /// Every error names the field that was wrong.
    pub fn from_value(value: &Value) -> Result<Self, PackageError> {
        let obj = value
            .as_object()
            .ok_or_else(|| PackageError::invalid_manifest("expected a JSON object"))?;

        if !obj.get("schemaVersion").is_some_and(Value::is_number) {
            return Err(PackageError::invalid_manifest("schemaVersion must be a number"));
        }
        if !obj.get("generatedAt").is_some_and(Value::is_string) {
            return Err(PackageError::invalid_manifest("generatedAt must be a string"));
        }
        if !obj.get("regionId").is_some_and(Value::is_string) {
            return Err(PackageError::invalid_manifest("regionId must be a string"));
        }
        let files = obj
            .get("files")
            .and_then(Value::as_array)
            .ok_or_else(|| PackageError::invalid_manifest("files must be an array"))?;

        for (index, entry) in files.iter().enumerate() {
            if !entry.get("name").is_some_and(Value::is_string) {
                return Err(PackageError::invalid_manifest(format!(
                    "files[{index}].name must be a string"
                )));
            }
            if !entry.get("sizeBytes").is_some_and(Value::is_number) {
                return Err(PackageError::invalid_manifest(format!(
                    "files[{index}].sizeBytes must be a number"
                )));
            }
        }

        serde_json::from_value(value.clone())
            .map_err(|e| PackageError::invalid_manifest(e.to_string()))
    }

    /// Ensure the manifest belongs to `region_id`.
    pub fn ensure_region(&self, region_id: &RegionId) -> Result<(), PackageError> {
        if self.region_id == region_id.as_str() {
            Ok(())
        } else {
            Err(PackageError::ManifestRegionMismatch {
                expected: region_id.to_string(),
                found: self.region_id.clone(),
            })
        }
    }

    /// Sum of all listed file sizes.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn region() -> RegionId {
        RegionId::new("r1").unwrap()
    }

    #[test]
    fn build_sorts_entries_and_stamps_schema() {
        let manifest = Manifest::build(
            &region(),
            [
                ManifestFile {
                    name: "water.json".into(),
                    size_bytes: 3,
                },
                ManifestFile {
                    name: "cities.json".into(),
                    size_bytes: 5,
                },
            ],
        );
        assert_eq!(manifest.schema_version, MANIFEST_SCHEMA_VERSION);
        assert_eq!(manifest.files[0].name, "cities.json");
        assert_eq!(manifest.total_bytes(), 8);
        assert!(manifest.generated_at.ends_with('Z'));
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let manifest = Manifest::build(
            &region(),
            [ManifestFile {
                name: "region.json".into(),
                size_bytes: 2,
            }],
        );
        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(value["regionId"], "r1");
        assert_eq!(value["files"][0]["sizeBytes"], 2);
        assert_eq!(Manifest::from_value(&value).unwrap(), manifest);
    }

    #[test]
    fn shape_errors_name_the_field() {
        let cases = [
            (json!([]), "JSON object"),
            (
                json!({"generatedAt": "x", "regionId": "r1", "files": []}),
                "schemaVersion",
            ),
            (
                json!({"schemaVersion": 1, "generatedAt": 5, "regionId": "r1", "files": []}),
                "generatedAt",
            ),
            (
                json!({"schemaVersion": 1, "generatedAt": "x", "files": []}),
                "regionId",
            ),
            (
                json!({"schemaVersion": 1, "generatedAt": "x", "regionId": "r1", "files": {}}),
                "files must be an array",
            ),
            (
                json!({"schemaVersion": 1, "generatedAt": "x", "regionId": "r1",
                       "files": [{"name": "a", "sizeBytes": "2"}]}),
                "files[0].sizeBytes",
            ),
        ];
        for (value, needle) in cases {
            let err = Manifest::from_value(&value).unwrap_err();
            assert!(err.to_string().contains(needle), "{needle}: {err}");
        }
    }

    #[test]
    fn region_mismatch_is_reported() {
        let mut manifest = Manifest::build(&region(), Vec::new());
        manifest.region_id = "other".into();
        let err = manifest.ensure_region(&region()).unwrap_err();
        assert!(matches!(err, PackageError::ManifestRegionMismatch { .. }));
    }
}
