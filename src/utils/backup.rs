use chrono::{DateTime, Local};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Give up after this many name collisions for one timestamp.
const MAX_SUFFIX: u32 = 10_000;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Failed to create backup directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot back up {}: path has no file name", .0.display())]
    NoFileName(PathBuf),
    #[error("Failed to read {}: {source}", .path.display())]
    ReadOriginal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to reserve backup file {}: {source}", .path.display())]
    Reserve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Backup {} is incomplete: expected {expected} bytes, found {actual}", .path.display())]
    Verify {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },
}

/// Timestamped copies taken before destructive operations.
#[derive(Debug, Clone)]
pub struct BackupManager {
    backup_dir: PathBuf,
}

impl BackupManager {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// `<file name>.backup_<YYYYmmdd_HHMMSS>`
    pub fn backup_stem(&self, original: &Path, now: DateTime<Local>) -> Result<String, BackupError> {
        let file_name = original
            .file_name()
            .ok_or_else(|| BackupError::NoFileName(original.to_path_buf()))?
            .to_string_lossy();
        Ok(format!("{}.backup_{}", file_name, now.format("%Y%m%d_%H%M%S")))
    }

    /// Create a new, empty backup file named `<stem>`, or `<stem>_1`,
    /// `<stem>_2`... when taken. Creation is exclusive, so concurrent callers
    /// never share a file.
    pub async fn reserve(&self, stem: &str) -> Result<(PathBuf, File), BackupError> {
        let mut counter = 0;
        loop {
            let candidate = if counter == 0 {
                self.backup_dir.join(stem)
            } else {
                self.backup_dir.join(format!("{stem}_{counter}"))
            };

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await
            {
                Ok(file) => return Ok((candidate, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists && counter < MAX_SUFFIX => {
                    counter += 1;
                }
                Err(source) => {
                    return Err(BackupError::Reserve {
                        path: candidate,
                        source,
                    })
                }
            }
        }
    }

    /// Copy `original` into a freshly reserved backup file and verify the
    /// copy. Only a verified backup is returned; on failure the reserved
    /// file is removed.
    pub async fn create_backup(&self, original: &Path) -> Result<PathBuf, BackupError> {
        tokio::fs::create_dir_all(&self.backup_dir)
            .await
            .map_err(|source| BackupError::CreateDir {
                path: self.backup_dir.clone(),
                source,
            })?;

        let read_error = |source| BackupError::ReadOriginal {
            path: original.to_path_buf(),
            source,
        };
        let mut source = File::open(original).await.map_err(read_error)?;
        let expected = source.metadata().await.map_err(read_error)?.len();

        let stem = self.backup_stem(original, Local::now())?;
        let (backup_path, mut target) = self.reserve(&stem).await?;

        let copied = copy_into(&mut source, &mut target).await;
        drop(target);

        match copied {
            Ok(actual) if actual == expected => {
                info!(
                    "Created backup {} for {}",
                    backup_path.display(),
                    original.display()
                );
                Ok(backup_path)
            }
            Ok(actual) => {
                discard(&backup_path).await;
                Err(BackupError::Verify {
                    path: backup_path,
                    expected,
                    actual,
                })
            }
            Err(source) => {
                discard(&backup_path).await;
                Err(BackupError::Copy {
                    from: original.to_path_buf(),
                    to: backup_path,
                    source,
                })
            }
        }
    }
}

/// Returns the size of the written copy as seen through its own handle.
async fn copy_into(source: &mut File, target: &mut File) -> std::io::Result<u64> {
    tokio::io::copy(source, target).await?;
    target.flush().await?;
    target.sync_all().await?;
    Ok(target.metadata().await?.len())
}

/// Only ever called on a file this process reserved itself.
async fn discard(backup_path: &Path) {
    if let Err(e) = tokio::fs::remove_file(backup_path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(
                "Could not remove incomplete backup {}: {}",
                backup_path.display(),
                e
            );
        }
    }
}
