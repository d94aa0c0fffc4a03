//! Cleanup of backups and temp files left behind by interrupted runs.

use std::collections::BTreeMap;
use std::path::PathBuf;

use ridgeline_core::region::{PackageError, RegionId};
use tracing::{debug, info, warn};

use super::RegionPackageStore;
use crate::fs::{BACKUP_INFIX, BACKUP_PREFIX, TMP_SUFFIX};

/// What [`RegionPackageStore::reconcile_backups`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Regions whose final directory was restored from a backup.
    pub restored: Vec<RegionId>,
    /// Backups and temp files that were deleted.
    pub removed: Vec<PathBuf>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.restored.is_empty() && self.removed.is_empty()
    }
}

impl RegionPackageStore {
    /// Resolve `.<id>.bak.<millis>` directories in the regions root.
    ///
    /// When `<id>` itself is missing the newest backup is renamed into place;
    /// all other backups are deleted. `*.tmp` files in staging directories
    /// are deleted too. Run this at startup, before any job touches the
    /// store.
    pub async fn reconcile_backups(&self) -> Result<ReconcileReport, PackageError> {
        let mut report = ReconcileReport::default();
        let regions_dir = self.paths.regions_dir();

        let mut backups: BTreeMap<RegionId, Vec<(i64, String)>> = BTreeMap::new();
        for name in self.list_or_empty(&regions_dir).await? {
            if let Some((id, stamp)) = parse_backup_name(&name) {
                backups.entry(id).or_default().push((stamp, name));
            }
        }

        for (id, mut entries) in backups {
            entries.sort_unstable_by(|a, b| b.0.cmp(&a.0));
            let final_dir = self.paths.region_dir(&id)?;

            let mut entries = entries.into_iter();
            if !self.ops.exists(&final_dir).await? {
                if let Some((_, newest)) = entries.next() {
                    self.ops.move_atomic(&regions_dir.join(&newest), &final_dir).await?;
                    info!(
                        target: "ridgeline.storage",
                        region_id = %id,
                        backup = %newest,
                        "Restored region package from backup"
                    );
                    report.restored.push(id.clone());
                }
            }

            for (_, name) in entries {
                let path = regions_dir.join(&name);
                self.ops.remove(&path).await?;
                debug!(target: "ridgeline.storage", path = %path.display(), "Removed stale backup");
                report.removed.push(path);
            }
        }

        let tmp_dir = self.paths.tmp_dir();
        for staging in self.list_or_empty(&tmp_dir).await? {
            let staging_dir = tmp_dir.join(&staging);
            if !self.ops.stat(&staging_dir).await?.is_dir {
                continue;
            }
            for name in self.ops.list_dir(&staging_dir).await? {
                if !name.ends_with(TMP_SUFFIX) {
                    continue;
                }
                let path = staging_dir.join(&name);
                if let Err(e) = self.ops.remove(&path).await {
                    warn!(
                        target: "ridgeline.storage",
                        path = %path.display(),
                        error = %e,
                        "Failed to remove temp file"
                    );
                    continue;
                }
                report.removed.push(path);
            }
        }

        if !report.is_empty() {
            info!(
                target: "ridgeline.storage",
                restored = report.restored.len(),
                removed = report.removed.len(),
                "Backup reconciliation complete"
            );
        }
        Ok(report)
    }
}

/// Split `.<id>.bak.<millis>` into its region id and timestamp.
fn parse_backup_name(name: &str) -> Option<(RegionId, i64)> {
    let (id, stamp) = name.strip_prefix(BACKUP_PREFIX)?.rsplit_once(BACKUP_INFIX)?;
    let stamp = stamp.parse::<i64>().ok()?;
    let id = RegionId::new(id).ok()?;
    Some((id, stamp))
}
