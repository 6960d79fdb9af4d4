//! Inter-process advisory lock on a cache version directory
//!
//! The lock is an exclusive `flock`-style lock on the version's `lock` marker
//! file. It is held by a [`LockGuard`] and released when the guard is dropped,
//! on every exit path.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::errors::{FetchError, FetchResult};

/// Factory for exclusive locks on lock marker files
pub struct FileLock;

impl FileLock {
    /// Touch `path` and block until an exclusive lock on it is held
    ///
    /// The wait happens on tokio's blocking pool. Every call opens its own
    /// descriptor, so two guards on the same file exclude each other even
    /// inside one process.
    ///
    /// # Errors
    ///
    /// `FetchError::Io` if the marker file cannot be created or opened,
    /// `FetchError::LockAcquisitionFailed` if the OS refuses the lock.
    pub async fn acquire(path: &Path) -> FetchResult<LockGuard> {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::acquire_blocking(owned))
            .await
            .map_err(|e| FetchError::LockAcquisitionFailed {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::Other, e),
            })?
    }

    /// Blocking variant of [`FileLock::acquire`]
    pub fn acquire_blocking(path: PathBuf) -> FetchResult<LockGuard> {
        let file = Self::touch(&path)?;

        file.lock_exclusive()
            .map_err(|source| FetchError::LockAcquisitionFailed {
                path: path.clone(),
                source,
            })?;

        debug!("Acquired lock: {}", path.display());
        Ok(LockGuard { file, path })
    }

    // Never truncates: the marker is shared with other holders.
    fn touch(path: &Path) -> FetchResult<File> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                FetchError::io(format!("Failed to touch lock file {}", path.display()), e)
            })
    }
}

/// Held exclusive lock; released on drop
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock too; unlock explicitly so
        // the release does not depend on when the file is closed.
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to release lock {}: {}", self.path.display(), e);
        } else {
            debug!("Released lock: {}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_acquire_creates_empty_marker() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("lock");

        let guard = FileLock::acquire(&lock_path).await.unwrap();
        assert_eq!(guard.path(), lock_path.as_path());
        assert!(lock_path.exists());
        assert_eq!(std::fs::metadata(&lock_path).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_marker_is_not_truncated() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("lock");
        std::fs::write(&lock_path, b"foreign").unwrap();

        drop(FileLock::acquire(&lock_path).await.unwrap());
        assert_eq!(std::fs::read(&lock_path).unwrap(), b"foreign");
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_until_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("lock");

        let guard = FileLock::acquire(&lock_path).await.unwrap();

        // A second descriptor cannot take the lock while the guard lives
        let probe = File::open(&lock_path).unwrap();
        assert!(probe.try_lock_exclusive().is_err());

        drop(guard);
        assert!(probe.try_lock_exclusive().is_ok());
        FileExt::unlock(&probe).unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_waiter_blocks_until_release() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("lock");
        let released = Arc::new(AtomicBool::new(false));

        let guard = FileLock::acquire(&lock_path).await.unwrap();

        let waiter = {
            let lock_path = lock_path.clone();
            let released = Arc::clone(&released);
            tokio::spawn(async move {
                let _guard = FileLock::acquire(&lock_path).await.unwrap();
                released.load(Ordering::SeqCst)
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        released.store(true, Ordering::SeqCst);
        drop(guard);

        assert!(waiter.await.unwrap(), "waiter acquired before release");
    }

    #[tokio::test]
    async fn test_missing_directory_is_io_failure() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("missing").join("lock");

        let result = FileLock::acquire(&lock_path).await;
        assert!(matches!(result, Err(FetchError::Io { .. })));
    }
}
