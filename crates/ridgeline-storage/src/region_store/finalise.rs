//! Promotion of a staged package to its final location.

use std::path::Path;

use ridgeline_core::paths::{Artifact, DOWNLOAD_STATE_FILE};
use ridgeline_core::region::{Manifest, ManifestFile, PackageError, RegionId};
use tracing::{error, info, warn};

use super::RegionPackageStore;
use crate::fs::{FsError, TMP_SUFFIX};

impl RegionPackageStore {
    /// Validate the staged package and promote it to the final location.
    ///
    /// 1. Validate staging; the final directory is untouched on failure.
    /// 2. Write `manifest.json` if staging has none.
    /// 3. Drop the reserved `download_state.json` from staging.
    /// 4. Move staging over the final directory. An existing package is
    ///    renamed to `.<id>.bak.<millis>` first and deleted on success.
    ///
    /// If the move fails the backup is put back and the error is
    /// [`PackageError::FinaliseFailed`]. If putting it back fails as well the
    /// error is [`PackageError::RestoreFailed`] and the backup stays on disk
    /// for [`reconcile_backups`](Self::reconcile_backups).
    pub async fn finalise_temp_to_final(&self, id: &RegionId) -> Result<(), PackageError> {
        let manifest = self.validate_staged(id).await?;
        let staging = self.paths.tmp_region_dir(id)?;

        if manifest.is_none() {
            let generated = self.build_manifest(id, &staging).await?;
            let bytes = serde_json::to_vec_pretty(&generated).map_err(|e| {
                PackageError::invalid_manifest(format!("could not encode manifest: {e}"))
            })?;
            self.ops
                .write_file_atomic(&staging.join(Artifact::Manifest.file_name()), &bytes)
                .await?;
        }

        self.ops.remove(&staging.join(DOWNLOAD_STATE_FILE)).await?;
        self.ops.ensure_dir(&self.paths.regions_dir()).await?;

        let final_dir = self.paths.region_dir(id)?;
        match self.ops.move_atomic(&staging, &final_dir).await {
            Ok(()) => {
                info!(
                    target: "ridgeline.storage",
                    region_id = %id,
                    path = %final_dir.display(),
                    "Region package finalised"
                );
                Ok(())
            }
            Err(FsError::RestoreFailed {
                backup,
                source,
                restore,
                ..
            }) => {
                error!(
                    target: "ridgeline.storage",
                    region_id = %id,
                    backup = %backup.display(),
                    "Finalisation failed and the previous package could not be restored"
                );
                Err(PackageError::RestoreFailed {
                    region_id: id.to_string(),
                    message: source.to_string(),
                    backup_path: backup.display().to_string(),
                    restore_message: restore.to_string(),
                })
            }
            Err(err) => {
                warn!(
                    target: "ridgeline.storage",
                    region_id = %id,
                    error = %err,
                    "Finalisation failed, previous package left in place"
                );
                Err(PackageError::FinaliseFailed {
                    region_id: id.to_string(),
                    message: err.to_string(),
                })
            }
        }
    }

    /// Manifest describing the regular files at the top of `staging`.
    ///
    /// The manifest itself, the reserved state file and `*.tmp` residue are
    /// not listed.
    async fn build_manifest(&self, id: &RegionId, staging: &Path) -> Result<Manifest, PackageError> {
        let mut files = Vec::new();
        for name in self.ops.list_dir(staging).await? {
            if name == Artifact::Manifest.file_name()
                || name == DOWNLOAD_STATE_FILE
                || name.ends_with(TMP_SUFFIX)
            {
                continue;
            }
            let stat = self.ops.stat(&staging.join(&name)).await?;
            if stat.is_file {
                files.push(ManifestFile {
                    name,
                    size_bytes: stat.size,
                });
            }
        }
        Ok(Manifest::build(id, files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridgeline_core::paths::RegionPaths;
    use std::fs;
    use tempfile::TempDir;

    fn stage(root: &Path, marker: &str) {
        let staging = root.join("tmp/alps");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("region.json"), format!(r#"{{"marker":"{marker}"}}"#)).unwrap();
        fs::write(staging.join("tiles.mbtiles"), [7u8; 128]).unwrap();
        for overlay in ["water.json", "cities.json", "roads.json"] {
            fs::write(staging.join(overlay), b"[]").unwrap();
        }
        fs::write(staging.join("download_state.json"), b"{}").unwrap();
    }

    fn setup() -> (TempDir, RegionPackageStore, RegionId) {
        let dir = TempDir::new().unwrap();
        let store = RegionPackageStore::new(RegionPaths::new(dir.path()));
        (dir, store, RegionId::new("alps").unwrap())
    }

    #[tokio::test]
    async fn promotes_package_with_generated_manifest() {
        let (dir, store, id) = setup();
        stage(dir.path(), "v1");

        store.finalise_temp_to_final(&id).await.unwrap();

        let final_dir = dir.path().join("regions/alps");
        assert!(!dir.path().join("tmp/alps").exists());
        assert!(!final_dir.join("download_state.json").exists());

        let manifest: Manifest =
            serde_json::from_slice(&fs::read(final_dir.join("manifest.json")).unwrap()).unwrap();
        assert_eq!(manifest.region_id, "alps");
        let names: Vec<_> = manifest.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "cities.json",
                "region.json",
                "roads.json",
                "tiles.mbtiles",
                "water.json"
            ]
        );
        assert_eq!(
            manifest
                .files
                .iter()
                .find(|f| f.name == "tiles.mbtiles")
                .map(|f| f.size_bytes),
            Some(128)
        );
    }

    #[tokio::test]
    async fn replaces_existing_package_and_leaves_no_backup() {
        let (dir, store, id) = setup();
        stage(dir.path(), "v1");
        store.finalise_temp_to_final(&id).await.unwrap();

        stage(dir.path(), "v2");
        store.finalise_temp_to_final(&id).await.unwrap();

        let region =
            fs::read_to_string(dir.path().join("regions/alps/region.json")).unwrap();
        assert!(region.contains("v2"));
        let entries: Vec<_> = fs::read_dir(dir.path().join("regions"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["alps".to_string()]);
    }

    #[tokio::test]
    async fn invalid_staging_leaves_final_untouched() {
        let (dir, store, id) = setup();
        stage(dir.path(), "v1");
        store.finalise_temp_to_final(&id).await.unwrap();

        stage(dir.path(), "v2");
        fs::remove_file(dir.path().join("tmp/alps/roads.json")).unwrap();

        let err = store.finalise_temp_to_final(&id).await.unwrap_err();
        assert!(matches!(err, PackageError::MissingFile { .. }));

        let region =
            fs::read_to_string(dir.path().join("regions/alps/region.json")).unwrap();
        assert!(region.contains("v1"));
        assert!(dir.path().join("tmp/alps/download_state.json").exists());
    }
}
