//! Core application logic for the fetching cache
//!
//! This module contains the remote resource loaders, the versioned on-disk
//! cache, download manifests, and the bulk download service tying them
//! together.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use fetch_cache::app::{CacheConfig, DownloadService, FetchingCache, HttpConfig, SchemeResourceLoader};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = SchemeResourceLoader::new(&HttpConfig::default())?;
//! let cache = FetchingCache::new(CacheConfig::default(), Arc::new(loader)).await?;
//! let service = DownloadService::new(cache);
//!
//! let mut builder = service.new_manifest_builder();
//! builder.add_entry_with_target_directory(
//!     Url::parse("https://my-server.com/libs/app.jar")?,
//!     "/job/deps",
//! )?;
//! service.download(&builder.build()?).await?;
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod download;
pub mod hash;
pub mod manifest;
pub mod resource;

// Re-export main public API
pub use cache::{CacheConfig, CacheStats, FetchingCache, ResourceKey, Version};
pub use download::DownloadService;
pub use hash::Md5Hash;
pub use manifest::{Manifest, ManifestBuilder};
pub use resource::{
    FileResourceLoader, HttpConfig, HttpResourceLoader, MemoryResourceLoader, RemoteResource,
    ResourceLoader, SchemeResourceLoader,
};
