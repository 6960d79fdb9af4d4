//! Bulk download orchestration
//!
//! `DownloadService` is the entry point for callers staging a set of
//! resources: it checks the manifest against the live filesystem, then drives
//! the cache over every entry.

use std::io;
use std::path::Path;

use tokio::fs;
use tracing::{debug, info};

use crate::app::cache::FetchingCache;
use crate::app::manifest::{Manifest, ManifestBuilder};
use crate::errors::{DownloadError, DownloadResult};

/// Stages manifests through a [`FetchingCache`]
#[derive(Debug)]
pub struct DownloadService {
    cache: FetchingCache,
}

impl DownloadService {
    pub fn new(cache: FetchingCache) -> Self {
        Self { cache }
    }

    pub fn new_manifest_builder(&self) -> ManifestBuilder {
        ManifestBuilder::new()
    }

    pub fn cache(&self) -> &FetchingCache {
        &self.cache
    }

    /// Download every entry of `manifest` to its target file
    ///
    /// Nothing is fetched unless every target directory exists and no target
    /// file does. Entries are then fetched in order, stopping at the first
    /// failure; entries already staged at that point stay in place.
    ///
    /// # Errors
    ///
    /// - `PreconditionFailed` naming the offending path
    /// - `Fetch` naming the first failed entry and wrapping its error
    pub async fn download(&self, manifest: &Manifest) -> DownloadResult<()> {
        self.check_preconditions(manifest).await?;

        debug!("Downloading {} manifest entries", manifest.len());
        for (uri, target) in manifest.entries() {
            self.cache
                .fetch(uri, target)
                .await
                .map_err(|source| DownloadError::Fetch {
                    uri: uri.clone(),
                    source,
                })?;
        }

        info!("Downloaded {} manifest entries", manifest.len());
        Ok(())
    }

    async fn check_preconditions(&self, manifest: &Manifest) -> DownloadResult<()> {
        for directory in manifest.target_directories() {
            match fs::metadata(directory).await {
                Ok(metadata) if metadata.is_dir() => {}
                Ok(_) => return Err(precondition(directory, "target directory is not a directory")),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(precondition(directory, "target directory does not exist"))
                }
                Err(e) => {
                    return Err(precondition(
                        directory,
                        &format!("target directory is not accessible: {}", e),
                    ))
                }
            }
        }

        for file in manifest.target_files() {
            match fs::symlink_metadata(file).await {
                Ok(_) => return Err(precondition(file, "target file already exists")),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(precondition(
                        file,
                        &format!("target file is not accessible: {}", e),
                    ))
                }
            }
        }

        Ok(())
    }

    /// Shut down the underlying cache, waiting for queued cleanups
    pub async fn shutdown(self) {
        self.cache.shutdown().await;
    }
}

fn precondition(path: &Path, reason: &str) -> DownloadError {
    DownloadError::PreconditionFailed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
