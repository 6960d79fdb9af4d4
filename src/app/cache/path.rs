//! Cache directory layout
//!
//! Maps `(key, version)` to the on-disk entry shared by every process using
//! the same cache root:
//!
//! ```text
//! {cache_root}/{resource_key}/{version}/lock
//! {cache_root}/{resource_key}/{version}/data
//! {cache_root}/{resource_key}/{version}/data.tmp
//! ```

use std::path::{Path, PathBuf};

use crate::constants::files;

use super::key::{ResourceKey, Version};

/// Path generation for cache entries under a single root
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every cached version of a resource
    pub fn resource_dir(&self, key: &ResourceKey) -> PathBuf {
        self.root.join(key.to_string())
    }

    /// Directory of one cached version
    pub fn version_dir(&self, key: &ResourceKey, version: Version) -> PathBuf {
        self.resource_dir(key).join(version.to_string())
    }

    /// Lock marker of a version directory
    pub fn lock_file(version_dir: &Path) -> PathBuf {
        version_dir.join(files::LOCK_FILE_NAME)
    }

    /// Committed payload of a version directory
    pub fn data_file(version_dir: &Path) -> PathBuf {
        version_dir.join(files::DATA_FILE_NAME)
    }

    /// In-flight payload of a version directory
    pub fn download_file(version_dir: &Path) -> PathBuf {
        version_dir.join(files::DATA_DOWNLOAD_FILE_NAME)
    }
}
