//! Fetch-or-reuse engine
//!
//! `FetchingCache` brings a remote resource into the shared cache at most once
//! per version and copies it out to a caller-chosen destination. Population of
//! a version is serialized across processes by the version's lock file; the
//! payload becomes visible only through the `data.tmp` to `data` rename.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::app::resource::{RemoteResource, ResourceLoader};
use crate::constants::cache;
use crate::errors::{CacheError, CacheResult, FetchError, FetchResult};

use super::config::CacheConfig;
use super::key::{ResourceKey, Version};
use super::lock::FileLock;
use super::path::CacheLayout;
use super::reaper::{reap_older_versions, ReapReport, Reaper};
use super::stats::{self, CacheStats};

/// Versioned, lock-coordinated download cache
pub struct FetchingCache {
    config: CacheConfig,
    layout: CacheLayout,
    loader: Arc<dyn ResourceLoader>,
    reaper: Reaper,
}

impl std::fmt::Debug for FetchingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchingCache")
            .field("config", &self.config)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl FetchingCache {
    /// Create a cache rooted at the configured directory
    ///
    /// Must be called from within a tokio runtime; the stale version reaper
    /// is spawned onto it.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the root cannot be created, or exists and is
    /// not a directory
    pub async fn new(config: CacheConfig, loader: Arc<dyn ResourceLoader>) -> CacheResult<Self> {
        let cache_root = match &config.cache_root {
            Some(path) => path.clone(),
            None => Self::default_cache_root(),
        };

        Self::ensure_directory_exists(&cache_root).await?;

        let layout = CacheLayout::new(cache_root);
        let reaper = Reaper::spawn(layout.clone(), config.reaper_queue_capacity);

        info!("Initialized cache with root: {}", layout.root().display());

        Ok(Self {
            config,
            layout,
            loader,
            reaper,
        })
    }

    /// Default cache root for the current OS
    ///
    /// - Linux: ~/.cache/fetch-cache
    /// - macOS: ~/Library/Caches/fetch-cache
    /// - Windows: %LOCALAPPDATA%/fetch-cache
    ///
    /// Falls back to the system temp directory when the OS reports none.
    pub fn default_cache_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(cache::DEFAULT_DIR_NAME)
    }

    async fn ensure_directory_exists(path: &Path) -> CacheResult<()> {
        match fs::metadata(path).await {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(CacheError::NotADirectory {
                path: path.to_path_buf(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(path).await.map_err(|source| {
                    error!("Failed to create cache directory: {}", source);
                    CacheError::DirectoryNotAccessible {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                debug!("Created cache directory: {}", path.display());
                Ok(())
            }
            Err(source) => Err(CacheError::DirectoryNotAccessible {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn cache_root(&self) -> &Path {
        self.layout.root()
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Make `uri` available at `destination`, downloading it only if its
    /// current version is not cached yet
    ///
    /// Anything already at `destination` is overwritten. The copy happens
    /// while the version lock is held; once it is done, older versions of the
    /// resource are queued for cleanup.
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` if the resource does not exist
    /// - `LockAcquisitionFailed` if the version lock cannot be taken
    /// - `Io` for any other failure; a failed download leaves `data.tmp`
    ///   behind and never publishes `data`
    pub async fn fetch(&self, uri: &Url, destination: &Path) -> FetchResult<()> {
        debug!("Fetching {} into {}", uri, destination.display());

        let resource = self
            .loader
            .resolve(uri)
            .map_err(|e| FetchError::io(format!("Failed to resolve {}", uri), e))?;

        let exists = resource
            .exists()
            .await
            .map_err(|e| FetchError::io(format!("Failed to look up {}", uri), e))?;
        if !exists {
            return Err(FetchError::ResourceNotFound { uri: uri.clone() });
        }

        let version = resource
            .last_modified()
            .await
            .map_err(|e| FetchError::io(format!("Failed to get version of {}", uri), e))?;

        let key = ResourceKey::derive(uri);
        let version_dir = self.layout.version_dir(&key, version);

        fs::create_dir_all(&version_dir).await.map_err(|e| {
            FetchError::io(
                format!("Failed to create cache directory {}", version_dir.display()),
                e,
            )
        })?;

        {
            // `data` must not be reaped before the copy completes.
            let _guard = FileLock::acquire(&CacheLayout::lock_file(&version_dir)).await?;
            self.ensure_committed(resource.as_ref(), &key, version, &version_dir)
                .await?;

            let data = CacheLayout::data_file(&version_dir);
            fs::copy(&data, destination).await.map_err(|e| {
                FetchError::io(
                    format!(
                        "Failed to copy {} to {}",
                        data.display(),
                        destination.display()
                    ),
                    e,
                )
            })?;
        }

        self.reaper.schedule(key, version);
        Ok(())
    }

    /// Fetch every `(uri, destination)` pair in order, stopping at the first
    /// failure
    pub async fn fetch_all<'a, I>(&self, entries: I) -> FetchResult<()>
    where
        I: IntoIterator<Item = (&'a Url, &'a Path)>,
    {
        for (uri, destination) in entries {
            self.fetch(uri, destination).await?;
        }
        Ok(())
    }

    // Caller holds the version lock.
    async fn ensure_committed(
        &self,
        resource: &dyn RemoteResource,
        key: &ResourceKey,
        version: Version,
        version_dir: &Path,
    ) -> FetchResult<()> {
        let data = CacheLayout::data_file(version_dir);

        match fs::metadata(&data).await {
            Ok(_) => {
                debug!("Cache hit for {} version {}", resource.uri(), version);
                return Ok(());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Cache miss for {} version {}", resource.uri(), version);
            }
            Err(e) => {
                return Err(FetchError::io(
                    format!("Failed to inspect {}", data.display()),
                    e,
                ))
            }
        }

        let download = CacheLayout::download_file(version_dir);
        let start = Instant::now();

        let written = match self.config.download_timeout {
            Some(limit) => tokio::time::timeout(limit, Self::download_to(resource, &download))
                .await
                .unwrap_or_else(|_| {
                    Err(FetchError::io(
                        format!("Download of {} timed out", resource.uri()),
                        io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("no completion within {:?}", limit),
                        ),
                    ))
                }),
            None => Self::download_to(resource, &download).await,
        };

        let written = match written {
            Ok(written) => written,
            Err(e) => {
                warn!(
                    "Download of {} failed, leaving {}: {}",
                    resource.uri(),
                    download.display(),
                    e
                );
                return Err(e);
            }
        };

        fs::rename(&download, &data).await.map_err(|e| {
            FetchError::io(
                format!(
                    "Failed to rename {} to {}",
                    download.display(),
                    data.display()
                ),
                e,
            )
        })?;

        info!(
            "Downloaded {} ({} version {}, {} bytes) in {:.2?}",
            resource.uri(),
            key,
            version,
            written,
            start.elapsed()
        );
        Ok(())
    }

    async fn download_to(resource: &dyn RemoteResource, path: &Path) -> FetchResult<u64> {
        let io_context = || format!("Failed to download {} to {}", resource.uri(), path.display());

        let mut file = fs::File::create(path)
            .await
            .map_err(|e| FetchError::io(io_context(), e))?;

        let mut stream = resource
            .open_stream()
            .await
            .map_err(|e| FetchError::io(io_context(), e))?;

        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::io(io_context(), e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::io(io_context(), e))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| FetchError::io(io_context(), e))?;
        file.sync_all()
            .await
            .map_err(|e| FetchError::io(io_context(), e))?;

        Ok(written)
    }

    /// Summarize what is stored under the cache root
    pub async fn stats(&self) -> CacheStats {
        stats::scan_cache(&self.layout).await
    }

    /// Reap every resource down to its newest committed version
    ///
    /// Resources without any committed version are left alone.
    pub async fn prune(&self) -> ReapReport {
        let mut total = ReapReport::default();

        for entry in self.stats().await.entries {
            if let Some(newest) = entry.newest_committed_version() {
                let report = reap_older_versions(&self.layout, &entry.key, newest).await;
                total.removed += report.removed;
                total.skipped += report.skipped;
                total.failed += report.failed;
            }
        }

        info!(
            "Pruned cache: {} versions removed, {} failed",
            total.removed, total.failed
        );
        total
    }

    /// Stop the reaper after it has worked off already scheduled cleanups
    pub async fn shutdown(self) {
        self.reaper.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::resource::MemoryResourceLoader;
    use std::time::Duration;
    use tempfile::TempDir;

    fn uri() -> Url {
        Url::parse("https://my-server.com/path/to/config/config.xml").unwrap()
    }

    async fn create_test_cache(
        temp_dir: &TempDir,
        loader: &MemoryResourceLoader,
    ) -> FetchingCache {
        let config = CacheConfig::with_cache_root(temp_dir.path().join("cache"));
        FetchingCache::new(config, Arc::new(loader.clone()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_new_creates_root() {
        let temp_dir = TempDir::new().unwrap();
        let cache = create_test_cache(&temp_dir, &MemoryResourceLoader::new()).await;

        assert!(cache.cache_root().is_dir());
        assert_eq!(cache.cache_root(), temp_dir.path().join("cache"));
        cache.shutdown().await;
    }

    #[tokio::test]
    async fn test_new_rejects_file_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("not-a-dir");
        std::fs::write(&root, b"").unwrap();

        let result = FetchingCache::new(
            CacheConfig::with_cache_root(root),
            Arc::new(MemoryResourceLoader::new()),
        )
        .await;
        assert!(matches!(result, Err(CacheError::NotADirectory { .. })));
    }

    #[test]
    fn test_default_cache_root() {
        let root = FetchingCache::default_cache_root();
        assert!(root.ends_with(cache::DEFAULT_DIR_NAME));
    }

    #[tokio::test]
    async fn test_fetch_miss_then_hit() {
        let temp_dir = TempDir::new().unwrap();
        let loader = MemoryResourceLoader::new();
        loader.insert(&uri(), b"<config/>".to_vec(), 1000);
        let cache = create_test_cache(&temp_dir, &loader).await;

        let first = temp_dir.path().join("first.xml");
        let second = temp_dir.path().join("second.xml");
        cache.fetch(&uri(), &first).await.unwrap();
        cache.fetch(&uri(), &second).await.unwrap();

        assert_eq!(std::fs::read(&first).unwrap(), b"<config/>");
        assert_eq!(std::fs::read(&second).unwrap(), b"<config/>");
        assert_eq!(loader.open_count(&uri()), 1);

        let version_dir = cache
            .layout()
            .version_dir(&ResourceKey::derive(&uri()), Version::new(1000));
        assert!(CacheLayout::lock_file(&version_dir).exists());
        assert!(CacheLayout::data_file(&version_dir).exists());
        assert!(!CacheLayout::download_file(&version_dir).exists());
        cache.shutdown().await;
    }

    #[tokio::test]
    async fn test_fetch_missing_resource() {
        let temp_dir = TempDir::new().unwrap();
        let loader = MemoryResourceLoader::new();
        let cache = create_test_cache(&temp_dir, &loader).await;

        let result = cache.fetch(&uri(), &temp_dir.path().join("out")).await;
        assert!(matches!(result, Err(FetchError::ResourceNotFound { .. })));
        assert_eq!(loader.total_opens(), 0);
        cache.shutdown().await;
    }

    #[tokio::test]
    async fn test_fetch_overwrites_destination() {
        let temp_dir = TempDir::new().unwrap();
        let loader = MemoryResourceLoader::new();
        loader.insert(&uri(), b"fresh".to_vec(), 1);
        let cache = create_test_cache(&temp_dir, &loader).await;

        let destination = temp_dir.path().join("config.xml");
        std::fs::write(&destination, b"stale content that is longer").unwrap();

        cache.fetch(&uri(), &destination).await.unwrap();
        assert_eq!(std::fs::read(&destination).unwrap(), b"fresh");
        cache.shutdown().await;
    }

    #[tokio::test]
    async fn test_download_timeout() {
        let temp_dir = TempDir::new().unwrap();
        let loader = MemoryResourceLoader::new();
        loader.insert(&uri(), b"slow".to_vec(), 1);
        loader.set_chunk_size(1);
        loader.set_chunk_delay(Some(Duration::from_millis(200)));

        let config = CacheConfig::with_cache_root(temp_dir.path().join("cache"))
            .with_download_timeout(Duration::from_millis(50));
        let cache = FetchingCache::new(config, Arc::new(loader.clone()))
            .await
            .unwrap();

        let destination = temp_dir.path().join("out");
        let result = cache.fetch(&uri(), &destination).await;
        match result {
            Err(FetchError::Io { source, .. }) => {
                assert_eq!(source.kind(), io::ErrorKind::TimedOut)
            }
            other => panic!("expected timeout, got {:?}", other),
        }

        let version_dir = cache
            .layout()
            .version_dir(&ResourceKey::derive(&uri()), Version::new(1));
        assert!(!CacheLayout::data_file(&version_dir).exists());
        assert!(!destination.exists());
        cache.shutdown().await;
    }

    #[tokio::test]
    async fn test_fetch_all_stops_at_first_failure() {
        let temp_dir = TempDir::new().unwrap();
        let loader = MemoryResourceLoader::new();
        let present = Url::parse("https://my-server.com/a.jar").unwrap();
        let missing = Url::parse("https://my-server.com/b.jar").unwrap();
        let later = Url::parse("https://my-server.com/c.jar").unwrap();
        loader.insert(&present, b"a".to_vec(), 1);
        loader.insert(&later, b"c".to_vec(), 1);
        let cache = create_test_cache(&temp_dir, &loader).await;

        let a = temp_dir.path().join("a.jar");
        let b = temp_dir.path().join("b.jar");
        let c = temp_dir.path().join("c.jar");
        let entries = vec![
            (&present, a.as_path()),
            (&missing, b.as_path()),
            (&later, c.as_path()),
        ];

        let result = cache.fetch_all(entries).await;
        assert!(matches!(result, Err(FetchError::ResourceNotFound { .. })));
        assert!(a.exists());
        assert!(!c.exists());
        assert_eq!(loader.open_count(&later), 0);
        cache.shutdown().await;
    }

    #[tokio::test]
    async fn test_prune_keeps_newest_version() {
        let temp_dir = TempDir::new().unwrap();
        let loader = MemoryResourceLoader::new();
        let cache = create_test_cache(&temp_dir, &loader).await;

        let key = ResourceKey::derive(&uri());
        for version in [1, 2, 3] {
            let dir = cache.layout().version_dir(&key, Version::new(version));
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(CacheLayout::data_file(&dir), b"x").unwrap();
        }

        let report = cache.prune().await;
        assert_eq!(report.removed, 2);

        let newest = cache.layout().version_dir(&key, Version::new(3));
        assert!(CacheLayout::data_file(&newest).exists());
        let oldest = cache.layout().version_dir(&key, Version::new(1));
        assert!(!CacheLayout::data_file(&oldest).exists());
        cache.shutdown().await;
    }

    #[tokio::test]
    async fn test_prune_keeps_newest_committed_version() {
        let temp_dir = TempDir::new().unwrap();
        let loader = MemoryResourceLoader::new();
        let cache = create_test_cache(&temp_dir, &loader).await;

        let key = ResourceKey::derive(&uri());
        let committed = cache.layout().version_dir(&key, Version::new(1));
        std::fs::create_dir_all(&committed).unwrap();
        std::fs::write(CacheLayout::data_file(&committed), b"x").unwrap();

        // A newer version whose download never finished
        let partial = cache.layout().version_dir(&key, Version::new(2));
        std::fs::create_dir_all(&partial).unwrap();
        std::fs::write(CacheLayout::download_file(&partial), b"x").unwrap();

        let report = cache.prune().await;
        assert_eq!(report.removed, 0);
        assert!(CacheLayout::data_file(&committed).exists());
        assert!(CacheLayout::download_file(&partial).exists());

        let other = ResourceKey::derive(&Url::parse("https://my-server.com/other.jar").unwrap());
        let orphan = cache.layout().version_dir(&other, Version::new(1));
        std::fs::create_dir_all(&orphan).unwrap();
        std::fs::write(CacheLayout::download_file(&orphan), b"x").unwrap();

        let report = cache.prune().await;
        assert_eq!(report.removed, 0);
        assert!(CacheLayout::download_file(&orphan).exists());
        cache.shutdown().await;
    }
}
