//! Stale version reaper
//!
//! After a version of a resource has been fetched successfully, every strictly
//! older version of the same resource is deleted in the background. Each
//! version is deleted under its own lock so a version that another process is
//! still populating is never pulled out from under it.
//!
//! Reaping is best-effort: failures are logged and never reach the caller
//! whose fetch triggered the cleanup.

use std::io;
use std::path::Path;

use tokio::fs;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::{FetchError, FetchResult};

use super::key::{ResourceKey, Version};
use super::lock::FileLock;
use super::path::CacheLayout;

/// Outcome of one reaping pass over a resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Versions whose payload files were deleted
    pub removed: usize,
    /// Entries ignored because they are not version directories
    pub skipped: usize,
    /// Versions that could not be cleaned up
    pub failed: usize,
}

/// Delete the payload of every version of `key` strictly older than `keep`
///
/// Entries whose names do not parse as a version are logged and left alone.
/// Version directories and their lock markers are kept.
pub async fn reap_older_versions(
    layout: &CacheLayout,
    key: &ResourceKey,
    keep: Version,
) -> ReapReport {
    let resource_dir = layout.resource_dir(key);
    let mut report = ReapReport::default();

    let mut entries = match fs::read_dir(&resource_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return report,
        Err(e) => {
            error!("Failed to list {}: {}", resource_dir.display(), e);
            report.failed += 1;
            return report;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to list {}: {}", resource_dir.display(), e);
                report.failed += 1;
                break;
            }
        };

        let path = entry.path();
        let version = match entry.file_name().to_str().map(str::parse::<Version>) {
            Some(Ok(version)) => version,
            _ => {
                warn!(
                    "Encountered a dir name which is not a version. Ignoring {}",
                    path.display()
                );
                report.skipped += 1;
                continue;
            }
        };

        if version >= keep {
            continue;
        }

        match entry.file_type().await {
            Ok(file_type) if file_type.is_dir() => {}
            Ok(_) => {
                warn!("Not a version directory. Ignoring {}", path.display());
                report.skipped += 1;
                continue;
            }
            Err(e) => {
                error!("Failed to inspect {}: {}", path.display(), e);
                report.failed += 1;
                continue;
            }
        }

        match reap_version(&path).await {
            Ok(()) => {
                debug!("Removed version {} of {}", version, key);
                report.removed += 1;
            }
            Err(e) => {
                error!(
                    "Error cleaning up old resource {} version {}: {}",
                    key, version, e
                );
                report.failed += 1;
            }
        }
    }

    report
}

async fn reap_version(version_dir: &Path) -> FetchResult<()> {
    let _guard = FileLock::acquire(&CacheLayout::lock_file(version_dir)).await?;

    // data.tmp can outlive a failed download that was later superseded
    remove_if_exists(&CacheLayout::data_file(version_dir)).await?;
    remove_if_exists(&CacheLayout::download_file(version_dir)).await?;
    Ok(())
}

async fn remove_if_exists(path: &Path) -> FetchResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FetchError::io(
            format!("Failed to delete {}", path.display()),
            e,
        )),
    }
}

/// A request to reap versions of `key` older than `keep`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReapJob {
    pub key: ResourceKey,
    pub keep: Version,
}

/// Background worker draining a bounded queue of reap jobs
#[derive(Debug)]
pub struct Reaper {
    sender: mpsc::Sender<ReapJob>,
    handle: JoinHandle<()>,
}

impl Reaper {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn(layout: CacheLayout, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<ReapJob>(capacity.max(1));

        let handle = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let report = reap_older_versions(&layout, &job.key, job.keep).await;
                if report.removed > 0 || report.failed > 0 {
                    info!(
                        "Reaped {} (keeping {}): {} removed, {} skipped, {} failed",
                        job.key, job.keep, report.removed, report.skipped, report.failed
                    );
                }
            }
            debug!("Reaper queue closed");
        });

        Self { sender, handle }
    }

    /// Queue a cleanup without waiting for it
    ///
    /// A full or closed queue drops the job; cleanup is advisory.
    pub fn schedule(&self, key: ResourceKey, keep: Version) {
        match self.sender.try_send(ReapJob { key, keep }) {
            Ok(()) => debug!("Scheduled cleanup of {} older than {}", key, keep),
            Err(TrySendError::Full(job)) => {
                warn!("Reaper queue full, dropping cleanup of {}", job.key)
            }
            Err(TrySendError::Closed(job)) => {
                warn!("Reaper stopped, dropping cleanup of {}", job.key)
            }
        }
    }

    /// Stop accepting jobs and wait for queued ones to finish
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.handle.await {
            error!("Reaper task failed: {}", e);
        }
    }
}
