//! Crash-safe filesystem operations.
//!
//! [`Filesystem`] is the seam between the package store and the operating
//! system: a handful of primitive async calls with no policy. [`FileOps`]
//! layers the idempotent and atomic operations on top of it.
//!
//! Tests substitute a `Filesystem` that fails chosen calls to exercise the
//! backup/restore paths.

mod ops;

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ridgeline_core::PackageError;
use thiserror::Error;

pub use ops::FileOps;
pub(crate) use ops::{BACKUP_INFIX, BACKUP_PREFIX, TMP_SUFFIX};

/// Size and kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub is_dir: bool,
    pub is_file: bool,
}

/// Primitive filesystem calls.
///
/// Implementations report errors verbatim; retry and idempotence policy
/// lives in [`FileOps`].
#[async_trait]
pub trait Filesystem: Send + Sync {
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    async fn remove_file(&self, path: &Path) -> io::Result<()>;

    async fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Entry names in a directory, unsorted.
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Metadata of the entry itself; symlinks are not followed.
    async fn metadata(&self, path: &Path) -> io::Result<FileStat>;
}

/// [`Filesystem`] backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFilesystem;

#[async_trait]
impl Filesystem for TokioFilesystem {
    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        tokio::fs::rename(from, to).await
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    async fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_dir_all(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        tokio::fs::write(path, data).await
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    async fn metadata(&self, path: &Path) -> io::Result<FileStat> {
        let meta = tokio::fs::symlink_metadata(path).await?;
        Ok(FileStat {
            size: meta.len(),
            is_dir: meta.is_dir(),
            is_file: meta.is_file(),
        })
    }
}

/// Errors from [`FileOps`].
#[derive(Debug, Error)]
pub enum FsError {
    /// A primitive call failed.
    #[error("{op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A move failed and putting the backup back also failed.
    ///
    /// `to` may now be missing; its previous content is at `backup`.
    #[error(
        "moving {} to {} failed: {source}; restoring backup {} also failed: {restore}",
        .from.display(),
        .to.display(),
        .backup.display()
    )]
    RestoreFailed {
        from: PathBuf,
        to: PathBuf,
        backup: PathBuf,
        #[source]
        source: io::Error,
        restore: io::Error,
    },
}

impl FsError {
    pub(crate) fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Kind of the triggering I/O error.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::Io { source, .. } | Self::RestoreFailed { source, .. } => source.kind(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

impl From<FsError> for PackageError {
    fn from(err: FsError) -> Self {
        match &err {
            FsError::Io { path, source, .. } => Self::io(
                format!("{:?}", source.kind()),
                path.display().to_string(),
                err.to_string(),
            ),
            FsError::RestoreFailed { to, .. } => {
                Self::io("RestoreFailed", to.display().to_string(), err.to_string())
            }
        }
    }
}
