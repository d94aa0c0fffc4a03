//! Idempotent and atomic file operations.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, warn};

use super::{FileStat, Filesystem, FsError, TokioFilesystem};

/// Suffix of the temporary file written by [`FileOps::write_file_atomic`].
pub(crate) const TMP_SUFFIX: &str = ".tmp";

/// Prefix of the sibling backup created by [`FileOps::move_atomic`].
///
/// A leading dot keeps backup names disjoint from valid region ids.
pub(crate) const BACKUP_PREFIX: &str = ".";

/// Infix between the original name and the timestamp of a backup.
pub(crate) const BACKUP_INFIX: &str = ".bak.";

/// Crash-safe file operations over a [`Filesystem`].
#[derive(Clone)]
pub struct FileOps {
    fs: Arc<dyn Filesystem>,
}

impl fmt::Debug for FileOps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileOps").finish_non_exhaustive()
    }
}

impl Default for FileOps {
    fn default() -> Self {
        Self::new(Arc::new(TokioFilesystem))
    }
}

impl FileOps {
    pub fn new(fs: Arc<dyn Filesystem>) -> Self {
        Self { fs }
    }

    /// Create a directory and its parents. Present directories are fine.
    pub async fn ensure_dir(&self, path: &Path) -> Result<(), FsError> {
        self.fs
            .create_dir_all(path)
            .await
            .map_err(|e| FsError::io("create_dir_all", path, e))
    }

    pub async fn exists(&self, path: &Path) -> Result<bool, FsError> {
        match self.fs.metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FsError::io("stat", path, e)),
        }
    }

    /// Delete a file or a directory tree. A missing path is success.
    pub async fn remove(&self, path: &Path) -> Result<(), FsError> {
        let stat = match self.fs.metadata(path).await {
            Ok(stat) => stat,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(FsError::io("stat", path, e)),
        };

        let result = if stat.is_dir {
            self.fs.remove_dir_all(path).await
        } else {
            self.fs.remove_file(path).await
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FsError::io("remove", path, e)),
        }
    }

    /// Rename `from` to `to`, keeping any existing `to` recoverable.
    ///
    /// An existing `to` is first renamed to a unique sibling
    /// `.<name>.bak.<millis>`. The backup is deleted after a successful move
    /// and renamed back if the move fails. When that restore fails too the
    /// error is [`FsError::RestoreFailed`] and the backup is left in place.
    pub async fn move_atomic(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let backup = if self.exists(to).await? {
            let backup = self.unique_backup_path(to).await?;
            self.fs
                .rename(to, &backup)
                .await
                .map_err(|e| FsError::io("rename", to, e))?;
            debug!(
                target: "ridgeline.storage",
                path = %to.display(),
                backup = %backup.display(),
                "Moved existing entry aside"
            );
            Some(backup)
        } else {
            None
        };

        let err = match self.fs.rename(from, to).await {
            Ok(()) => {
                if let Some(backup) = backup {
                    if let Err(e) = self.remove(&backup).await {
                        warn!(
                            target: "ridgeline.storage",
                            backup = %backup.display(),
                            error = %e,
                            "Failed to delete backup after move"
                        );
                    }
                }
                return Ok(());
            }
            Err(err) => err,
        };

        let Some(backup) = backup else {
            return Err(FsError::io("rename", from, err));
        };

        match self.fs.rename(&backup, to).await {
            Ok(()) => {
                warn!(
                    target: "ridgeline.storage",
                    path = %to.display(),
                    error = %err,
                    "Move failed, previous entry restored"
                );
                Err(FsError::io("rename", from, err))
            }
            Err(restore) => {
                error!(
                    target: "ridgeline.storage",
                    path = %to.display(),
                    backup = %backup.display(),
                    error = %err,
                    restore_error = %restore,
                    "Move failed and backup could not be restored"
                );
                Err(FsError::RestoreFailed {
                    from: from.to_path_buf(),
                    to: to.to_path_buf(),
                    backup,
                    source: err,
                    restore,
                })
            }
        }
    }

    /// Write `data` to `<path>.tmp`, then [`move_atomic`](Self::move_atomic)
    /// it over `path`. The temp file is removed on failure.
    pub async fn write_file_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        let tmp = with_suffix(path, TMP_SUFFIX);

        let result = match self.fs.write(&tmp, data).await {
            Ok(()) => self.move_atomic(&tmp, path).await,
            Err(e) => Err(FsError::io("write", &tmp, e)),
        };

        if result.is_err() {
            if let Err(e) = self.remove(&tmp).await {
                debug!(
                    target: "ridgeline.storage",
                    path = %tmp.display(),
                    error = %e,
                    "Failed to remove temp file"
                );
            }
        }
        result
    }

    pub async fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        self.fs
            .read(path)
            .await
            .map_err(|e| FsError::io("read", path, e))
    }

    /// Read a UTF-8 text file.
    pub async fn read_text(&self, path: &Path) -> Result<String, FsError> {
        let bytes = self.read_file(path).await?;
        String::from_utf8(bytes).map_err(|e| {
            FsError::io("read", path, io::Error::new(io::ErrorKind::InvalidData, e))
        })
    }

    /// Entry names in a directory, sorted.
    pub async fn list_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let mut names = self
            .fs
            .read_dir(path)
            .await
            .map_err(|e| FsError::io("read_dir", path, e))?;
        names.sort();
        Ok(names)
    }

    pub async fn stat(&self, path: &Path) -> Result<FileStat, FsError> {
        self.fs
            .metadata(path)
            .await
            .map_err(|e| FsError::io("stat", path, e))
    }

    /// Total size of the regular files under `path`. Missing paths are 0.
    pub async fn dir_size(&self, path: &Path) -> Result<u64, FsError> {
        let mut total = 0u64;
        let mut pending = vec![path.to_path_buf()];

        while let Some(current) = pending.pop() {
            let stat = match self.stat(&current).await {
                Ok(stat) => stat,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };

            if stat.is_dir {
                match self.list_dir(&current).await {
                    Ok(names) => pending.extend(names.into_iter().map(|n| current.join(n))),
                    Err(e) if e.is_not_found() => {}
                    Err(e) => return Err(e),
                }
            } else if stat.is_file {
                total = total.saturating_add(stat.size);
            }
        }

        Ok(total)
    }

    async fn unique_backup_path(&self, path: &Path) -> Result<PathBuf, FsError> {
        let mut stamp = chrono::Utc::now().timestamp_millis();
        loop {
            let candidate = backup_path(path, stamp);
            if !self.exists(&candidate).await? {
                return Ok(candidate);
            }
            stamp += 1;
        }
    }
}

/// Sibling `.<name>.bak.<stamp>` of `path`.
fn backup_path(path: &Path, stamp: i64) -> PathBuf {
    let mut name = OsString::from(BACKUP_PREFIX);
    name.push(path.file_name().unwrap_or_default());
    name.push(format!("{BACKUP_INFIX}{stamp}"));
    path.with_file_name(name)
}

/// `path` with `suffix` appended to its final component.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn ops() -> FileOps {
        FileOps::default()
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("f"), b"x").unwrap();

        ops().remove(&dir.path().join("a")).await.unwrap();
        assert!(!dir.path().join("a").exists());

        ops().remove(&dir.path().join("a")).await.unwrap();
    }

    #[tokio::test]
    async fn move_atomic_replaces_directory_and_drops_backup() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("new");
        let to = dir.path().join("current");
        fs::create_dir_all(&from).unwrap();
        fs::create_dir_all(&to).unwrap();
        fs::write(from.join("v"), b"2").unwrap();
        fs::write(to.join("v"), b"1").unwrap();

        ops().move_atomic(&from, &to).await.unwrap();

        assert_eq!(fs::read(to.join("v")).unwrap(), b"2");
        assert!(!from.exists());
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![OsString::from("current")]);
    }

    #[tokio::test]
    async fn move_atomic_missing_source_keeps_destination() {
        let dir = TempDir::new().unwrap();
        let to = dir.path().join("current");
        fs::write(&to, b"keep").unwrap();

        let err = ops()
            .move_atomic(&dir.path().join("absent"), &to)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(fs::read(&to).unwrap(), b"keep");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn write_file_atomic_overwrites_without_residue() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");

        ops().write_file_atomic(&path, b"{\"v\":1}").await.unwrap();
        ops().write_file_atomic(&path, b"{\"v\":2}").await.unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"v\":2}");
        let names = ops().list_dir(dir.path()).await.unwrap();
        assert_eq!(names, vec!["data.json".to_string()]);
    }

    #[tokio::test]
    async fn write_file_atomic_cleans_up_when_parent_is_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing/data.json");

        let err = ops().write_file_atomic(&path, b"x").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!dir.path().join("missing").exists());
    }

    #[tokio::test]
    async fn dir_size_sums_nested_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("top"), [0u8; 10]).unwrap();
        fs::write(dir.path().join("a/mid"), [0u8; 5]).unwrap();
        fs::write(dir.path().join("a/b/deep"), [0u8; 7]).unwrap();

        assert_eq!(ops().dir_size(dir.path()).await.unwrap(), 22);
        assert_eq!(ops().dir_size(&dir.path().join("nope")).await.unwrap(), 0);
    }

    #[test]
    fn backup_path_is_a_hidden_sibling() {
        assert_eq!(
            backup_path(Path::new("/data/regions/alps"), 17),
            PathBuf::from("/data/regions/.alps.bak.17")
        );
    }

    #[tokio::test]
    async fn move_atomic_leaves_bak_named_neighbours_alone() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("new");
        let to = dir.path().join("alps");
        let lookalike = dir.path().join("alps.bak.2024");
        for d in [&from, &to, &lookalike] {
            fs::create_dir_all(d).unwrap();
        }

        ops().move_atomic(&from, &to).await.unwrap();

        assert!(lookalike.is_dir());
        let mut names = ops().list_dir(dir.path()).await.unwrap();
        names.sort();
        assert_eq!(names, vec!["alps".to_string(), "alps.bak.2024".to_string()]);
    }

    #[test]
    fn suffix_is_appended_to_file_name() {
        assert_eq!(
            with_suffix(Path::new("/x/data.json"), ".tmp"),
            PathBuf::from("/x/data.json.tmp")
        );
    }
}
