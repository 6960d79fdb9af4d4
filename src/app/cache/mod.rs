//! Versioned, lock-coordinated download cache
//!
//! Remote resources are fetched once per version into a cache directory that
//! every process on the host may share, then copied out to wherever callers
//! want them. Processes coordinate through OS advisory locks on a per-version
//! lock file, and a payload only becomes visible through an atomic rename.
//!
//! # Key Features
//!
//! - **Content addressing by URI**: each resource lives under the MD5 of its URI
//! - **Versioning**: each remote last-modified value gets its own directory
//! - **Cross-process locking**: at most one process downloads a given version
//! - **Atomic commit**: `data.tmp` is renamed to `data` only once fully written
//! - **Background cleanup**: older versions are reaped after a successful fetch
//!
//! # Module Organization
//!
//! - [`config`] - Configuration types and defaults
//! - [`key`] - Resource keys and versions
//! - [`path`] - On-disk layout
//! - [`lock`] - Inter-process lock guard
//! - [`manager`] - Fetch-or-reuse engine
//! - [`reaper`] - Stale version cleanup
//! - [`stats`] - Cache statistics and disk usage
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use fetch_cache::app::cache::{CacheConfig, FetchingCache};
//! use fetch_cache::app::resource::MemoryResourceLoader;
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let uri = Url::parse("https://my-server.com/path/to/config/config.xml")?;
//! let loader = MemoryResourceLoader::new();
//! loader.insert(&uri, b"<config/>".to_vec(), 1000);
//!
//! let cache = FetchingCache::new(CacheConfig::default(), Arc::new(loader)).await?;
//! cache.fetch(&uri, Path::new("/tmp/config.xml")).await?;
//! cache.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod key;
pub mod lock;
pub mod manager;
pub mod path;
pub mod reaper;
pub mod stats;

#[cfg(test)]
pub mod tests;

// Re-export main public API
pub use config::CacheConfig;
pub use key::{ResourceKey, Version};
pub use lock::{FileLock, LockGuard};
pub use manager::FetchingCache;
pub use path::CacheLayout;
pub use reaper::{reap_older_versions, ReapReport, Reaper};
pub use stats::{CacheEntryInfo, CacheStats, VersionInfo};
