//! Prelude module for the fetching cache
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use fetch_cache::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use fetch_cache::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let loader = SchemeResourceLoader::new(&HttpConfig::default())?;
//!     let cache = FetchingCache::new(CacheConfig::default(), Arc::new(loader)).await?;
//!     let service = DownloadService::new(cache);
//!
//!     let manifest = ManifestBuilder::from_sources_into_directory(
//!         vec![Url::parse("https://my-server.com/libs/app.jar").unwrap()],
//!         "/job/deps",
//!     )?
//!     .build()?;
//!     service.download(&manifest).await?;
//!     service.shutdown().await;
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components that are used in most integrations
pub use crate::app::{
    CacheConfig,
    DownloadService,
    FetchingCache,
    HttpConfig,
    Manifest,
    ManifestBuilder,
    // Loaders
    MemoryResourceLoader,
    ResourceLoader,
    SchemeResourceLoader,
};

// Per-component error types
pub use crate::errors::{CacheError, DownloadError, FetchError, ManifestError};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

// Common external crate re-exports for convenience
pub use tokio;
pub use url::Url;
