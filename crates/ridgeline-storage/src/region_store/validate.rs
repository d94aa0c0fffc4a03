//! Staged package validation.

use std::collections::BTreeMap;
use std::path::Path;

use ridgeline_core::paths::{Artifact, DOWNLOAD_STATE_FILE};
use ridgeline_core::region::{Manifest, PackageError, RegionId, validate_filename};
use serde_json::Value;

use super::{RegionPackageStore, parse_json};

impl RegionPackageStore {
    /// Check a staged package, failing on the first problem found.
    ///
    /// Order: staging directory, required files (present, regular,
    /// non-empty), JSON syntax of every `*.json`, then the manifest if one
    /// is present.
    pub async fn validate_temp_package(&self, id: &RegionId) -> Result<(), PackageError> {
        self.validate_staged(id).await.map(|_| ())
    }

    /// Validate and return the staged manifest, if there is one.
    pub(super) async fn validate_staged(
        &self,
        id: &RegionId,
    ) -> Result<Option<Manifest>, PackageError> {
        let dir = self.paths.tmp_region_dir(id)?;

        match self.ops.stat(&dir).await {
            Ok(stat) if stat.is_dir => {}
            Ok(_) => return Err(missing_staging(&dir)),
            Err(e) if e.is_not_found() => return Err(missing_staging(&dir)),
            Err(e) => return Err(e.into()),
        }

        for artifact in Artifact::REQUIRED {
            let name = artifact.file_name();
            let stat = match self.ops.stat(&dir.join(name)).await {
                Ok(stat) => stat,
                Err(e) if e.is_not_found() => {
                    return Err(PackageError::MissingFile {
                        name: name.to_string(),
                    });
                }
                Err(e) => return Err(e.into()),
            };
            if !stat.is_file {
                return Err(PackageError::NotAFile {
                    name: name.to_string(),
                });
            }
            if stat.size == 0 {
                return Err(PackageError::EmptyFile {
                    name: name.to_string(),
                });
            }
        }

        let documents = self.parse_json_files(&dir).await?;

        let Some(value) = documents.get(Artifact::Manifest.file_name()) else {
            return Ok(None);
        };
        let manifest = Manifest::from_value(value)?;
        manifest.ensure_region(id)?;

        for (index, file) in manifest.files.iter().enumerate() {
            validate_filename(&file.name).map_err(|e| {
                PackageError::invalid_manifest(format!("files[{index}].name: {e}"))
            })?;
            let stat = match self.ops.stat(&dir.join(&file.name)).await {
                Ok(stat) if stat.is_file => stat,
                Ok(_) => {
                    return Err(PackageError::NotAFile {
                        name: file.name.clone(),
                    });
                }
                Err(e) if e.is_not_found() => {
                    return Err(PackageError::ManifestFileMissing {
                        name: file.name.clone(),
                    });
                }
                Err(e) => return Err(e.into()),
            };
            if stat.size != file.size_bytes {
                return Err(PackageError::ManifestSizeMismatch {
                    name: file.name.clone(),
                    expected: file.size_bytes,
                    actual: stat.size,
                });
            }
        }

        Ok(Some(manifest))
    }

    /// Parse every top-level `*.json` file except the reserved state file.
    async fn parse_json_files(&self, dir: &Path) -> Result<BTreeMap<String, Value>, PackageError> {
        let mut documents = BTreeMap::new();
        for name in self.ops.list_dir(dir).await? {
            if !name.ends_with(".json") || name == DOWNLOAD_STATE_FILE {
                continue;
            }
            let path = dir.join(&name);
            if !self.ops.stat(&path).await?.is_file {
                continue;
            }
            let bytes = self.ops.read_file(&path).await?;
            let value = parse_json(&name, &bytes)?;
            documents.insert(name, value);
        }
        Ok(documents)
    }
}

fn missing_staging(dir: &Path) -> PackageError {
    PackageError::MissingStagingDir {
        path: dir.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridgeline_core::paths::RegionPaths;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    const REQUIRED: [(&str, &[u8]); 5] = [
        ("region.json", br#"{"name":"Alps"}"#),
        ("tiles.mbtiles", b"SQLite format 3\0"),
        ("water.json", b"[]"),
        ("cities.json", b"[]"),
        ("roads.json", b"[]"),
    ];

    fn staged(dir: &TempDir) -> (RegionPackageStore, RegionId) {
        let staging = dir.path().join("tmp/alps");
        fs::create_dir_all(&staging).unwrap();
        for (name, data) in REQUIRED {
            fs::write(staging.join(name), data).unwrap();
        }
        (
            RegionPackageStore::new(RegionPaths::new(dir.path())),
            RegionId::new("alps").unwrap(),
        )
    }

    #[tokio::test]
    async fn complete_package_passes() {
        let dir = TempDir::new().unwrap();
        let (store, id) = staged(&dir);
        store.validate_temp_package(&id).await.unwrap();
    }

    #[tokio::test]
    async fn missing_staging_dir_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = RegionPackageStore::new(RegionPaths::new(dir.path()));
        let err = store
            .validate_temp_package(&RegionId::new("alps").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PackageError::MissingStagingDir { .. }));
    }

    #[tokio::test]
    async fn each_missing_required_file_is_named() {
        for (name, _) in REQUIRED {
            let dir = TempDir::new().unwrap();
            let (store, id) = staged(&dir);
            fs::remove_file(dir.path().join("tmp/alps").join(name)).unwrap();

            let err = store.validate_temp_package(&id).await.unwrap_err();
            assert!(err.to_string().contains(name), "{err}");
            assert!(matches!(err, PackageError::MissingFile { .. }));
        }
    }

    #[tokio::test]
    async fn empty_and_invalid_json_are_rejected() {
        let dir = TempDir::new().unwrap();
        let (store, id) = staged(&dir);
        fs::write(dir.path().join("tmp/alps/cities.json"), b"").unwrap();
        let err = store.validate_temp_package(&id).await.unwrap_err();
        assert!(err.to_string().contains("is empty"), "{err}");

        fs::write(dir.path().join("tmp/alps/cities.json"), b"{not json").unwrap();
        let err = store.validate_temp_package(&id).await.unwrap_err();
        assert!(err.to_string().contains("not valid JSON"), "{err}");
        assert!(err.to_string().contains("cities.json"), "{err}");
    }

    #[tokio::test]
    async fn manifest_must_match_region_and_sizes() {
        let dir = TempDir::new().unwrap();
        let (store, id) = staged(&dir);
        let manifest_path = dir.path().join("tmp/alps/manifest.json");

        let foreign = json!({
            "schemaVersion": 1,
            "generatedAt": "2026-01-01T00:00:00.000Z",
            "regionId": "tatra",
            "files": []
        });
        fs::write(&manifest_path, foreign.to_string()).unwrap();
        let err = store.validate_temp_package(&id).await.unwrap_err();
        assert!(matches!(err, PackageError::ManifestRegionMismatch { .. }));

        let wrong_size = json!({
            "schemaVersion": 1,
            "generatedAt": "2026-01-01T00:00:00.000Z",
            "regionId": "alps",
            "files": [{"name": "water.json", "sizeBytes": 99}]
        });
        fs::write(&manifest_path, wrong_size.to_string()).unwrap();
        let err = store.validate_temp_package(&id).await.unwrap_err();
        assert_eq!(
            err,
            PackageError::ManifestSizeMismatch {
                name: "water.json".into(),
                expected: 99,
                actual: 2,
            }
        );

        let escaping = json!({
            "schemaVersion": 1,
            "generatedAt": "2026-01-01T00:00:00.000Z",
            "regionId": "alps",
            "files": [{"name": "../../etc/passwd", "sizeBytes": 1}]
        });
        fs::write(&manifest_path, escaping.to_string()).unwrap();
        let err = store.validate_temp_package(&id).await.unwrap_err();
        assert!(matches!(err, PackageError::InvalidManifest { .. }));
    }

    #[tokio::test]
    async fn malformed_manifest_shape_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (store, id) = staged(&dir);
        fs::write(
            dir.path().join("tmp/alps/manifest.json"),
            br#"{"schemaVersion": "one", "regionId": "alps", "files": []}"#,
        )
        .unwrap();

        let err = store.validate_temp_package(&id).await.unwrap_err();
        assert!(matches!(err, PackageError::InvalidManifest { .. }), "{err}");
    }
}
