//! Cache statistics and disk usage
//!
//! Walks the cache root to report which resources and versions are stored,
//! whether each version is committed, and how much space it takes.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

use super::key::{ResourceKey, Version};
use super::path::CacheLayout;

/// One cached version of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub version: Version,
    /// `data` is present
    pub committed: bool,
    /// `data.tmp` is present
    pub partial: bool,
    /// Combined size of `data` and `data.tmp` in bytes
    pub size: u64,
}

/// Every cached version of one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntryInfo {
    pub key: ResourceKey,
    /// Sorted oldest first
    pub versions: Vec<VersionInfo>,
}

impl CacheEntryInfo {
    pub fn newest_version(&self) -> Option<Version> {
        self.versions.last().map(|v| v.version)
    }

    /// Newest version whose `data` is present
    pub fn newest_committed_version(&self) -> Option<Version> {
        self.versions
            .iter()
            .rev()
            .find(|v| v.committed)
            .map(|v| v.version)
    }

    pub fn size(&self) -> u64 {
        self.versions.iter().map(|v| v.size).sum()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Cache root directory
    pub cache_root: PathBuf,
    /// Cached resources, sorted by key
    pub entries: Vec<CacheEntryInfo>,
    /// Total size of payload files in bytes
    pub total_size: u64,
}

impl CacheStats {
    pub fn new(cache_root: PathBuf) -> Self {
        Self {
            cache_root,
            entries: Vec::new(),
            total_size: 0,
        }
    }

    pub fn resource_count(&self) -> usize {
        self.entries.len()
    }

    pub fn version_count(&self) -> usize {
        self.entries.iter().map(|e| e.versions.len()).sum()
    }

    /// Versions with a `data.tmp` left over from an unfinished download
    pub fn partial_count(&self) -> usize {
        self.entries
            .iter()
            .flat_map(|e| &e.versions)
            .filter(|v| v.partial)
            .count()
    }

    /// Format cache size in human-readable format
    pub fn format_total_size(&self) -> String {
        format_bytes(self.total_size)
    }
}

/// Scan the cache root without taking any locks
///
/// Directories that are not named like keys or versions are ignored. The
/// result is a snapshot; concurrent fetches may change the cache under it.
pub async fn scan_cache(layout: &CacheLayout) -> CacheStats {
    let root = layout.root().to_path_buf();

    tokio::task::spawn_blocking(move || scan_cache_blocking(&root))
        .await
        .unwrap_or_else(|e| {
            warn!("Failed to scan cache directory: {}", e);
            CacheStats::new(layout.root().to_path_buf())
        })
}

fn scan_cache_blocking(root: &Path) -> CacheStats {
    let mut stats = CacheStats::new(root.to_path_buf());

    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read cache directory {}: {}", root.display(), e);
            return stats;
        }
    };

    for entry in entries.flatten() {
        let key = match entry.file_name().to_str().map(str::parse::<ResourceKey>) {
            Some(Ok(key)) if entry.path().is_dir() => key,
            _ => continue,
        };

        let versions = scan_versions(&entry.path());
        stats.total_size += versions.iter().map(|v| v.size).sum::<u64>();
        stats.entries.push(CacheEntryInfo { key, versions });
    }

    stats.entries.sort_by(|a, b| a.key.cmp(&b.key));
    stats
}

fn scan_versions(resource_dir: &Path) -> Vec<VersionInfo> {
    let mut versions = Vec::new();

    let entries = match std::fs::read_dir(resource_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read {}: {}", resource_dir.display(), e);
            return versions;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let version = match entry.file_name().to_str().map(str::parse::<Version>) {
            Some(Ok(version)) if path.is_dir() => version,
            _ => continue,
        };

        let data_size = file_size(&CacheLayout::data_file(&path));
        let partial_size = file_size(&CacheLayout::download_file(&path));

        versions.push(VersionInfo {
            version,
            committed: data_size.is_some(),
            partial: partial_size.is_some(),
            size: data_size.unwrap_or(0) + partial_size.unwrap_or(0),
        });
    }

    versions.sort_by_key(|v| v.version);
    versions
}

fn file_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: u64 = 1024;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD as f64 && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD as f64;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use url::Url;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
        assert_eq!(format_bytes(1024_u64.pow(4)), "1.00 TB");
    }

    #[tokio::test]
    async fn test_scan_empty_cache() {
        let temp_dir = TempDir::new().unwrap();
        let stats = scan_cache(&CacheLayout::new(temp_dir.path())).await;

        assert_eq!(stats.resource_count(), 0);
        assert_eq!(stats.total_size, 0);
        assert_eq!(stats.format_total_size(), "0 B");
    }

    #[tokio::test]
    async fn test_scan_versions() {
        let temp_dir = TempDir::new().unwrap();
        let layout = CacheLayout::new(temp_dir.path());
        let key = ResourceKey::derive(&Url::parse("https://my-server.com/app.jar").unwrap());

        let v2 = layout.version_dir(&key, Version::new(2000));
        std::fs::create_dir_all(&v2).unwrap();
        std::fs::write(CacheLayout::data_file(&v2), b"0123456789").unwrap();

        let v1 = layout.version_dir(&key, Version::new(1000));
        std::fs::create_dir_all(&v1).unwrap();
        std::fs::write(CacheLayout::download_file(&v1), b"012").unwrap();

        std::fs::create_dir_all(layout.resource_dir(&key).join("junk")).unwrap();
        std::fs::create_dir_all(temp_dir.path().join("not-a-key")).unwrap();

        let stats = scan_cache(&layout).await;
        assert_eq!(stats.resource_count(), 1);
        assert_eq!(stats.version_count(), 2);
        assert_eq!(stats.partial_count(), 1);
        assert_eq!(stats.total_size, 13);

        let entry = &stats.entries[0];
        assert_eq!(entry.key, key);
        assert_eq!(entry.newest_version(), Some(Version::new(2000)));
        assert_eq!(entry.newest_committed_version(), Some(Version::new(2000)));
        assert!(!entry.versions[0].committed);
        assert!(entry.versions[0].partial);
        assert!(entry.versions[1].committed);
        assert_eq!(entry.size(), 13);
    }

    #[tokio::test]
    async fn test_stats_serialize_as_json() {
        let temp_dir = TempDir::new().unwrap();
        let layout = CacheLayout::new(temp_dir.path());
        let key: ResourceKey = "6d331abc92bc8244bc5d41e2107f303a".parse().unwrap();
        std::fs::create_dir_all(layout.version_dir(&key, Version::new(7))).unwrap();

        let stats = scan_cache(&layout).await;
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(
            json["entries"][0]["key"],
            "6d331abc92bc8244bc5d41e2107f303a"
        );
        assert_eq!(json["entries"][0]["versions"][0]["version"], 7);
    }
}
