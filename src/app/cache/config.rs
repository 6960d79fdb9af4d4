//! Cache configuration types and defaults

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::cache;

/// Configuration for the fetching cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root directory for cache storage (OS-specific if None)
    pub cache_root: Option<PathBuf>,
    /// Cleanup jobs queued before new ones are dropped
    pub reaper_queue_capacity: usize,
    /// Upper bound on a single remote read while holding a version lock
    pub download_timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_root: None,
            reaper_queue_capacity: cache::REAPER_QUEUE_CAPACITY,
            download_timeout: cache::DOWNLOAD_TIMEOUT,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with custom cache root
    pub fn with_cache_root(cache_root: PathBuf) -> Self {
        Self {
            cache_root: Some(cache_root),
            ..Default::default()
        }
    }

    /// Set the reaper queue capacity
    pub fn with_reaper_queue_capacity(mut self, capacity: usize) -> Self {
        self.reaper_queue_capacity = capacity;
        self
    }

    /// Bound each remote read
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.cache_root, None);
        assert_eq!(config.reaper_queue_capacity, cache::REAPER_QUEUE_CAPACITY);
        assert_eq!(config.download_timeout, None);
    }

    #[test]
    fn test_config_builder() {
        let cache_root = PathBuf::from("/tmp/test");
        let config = CacheConfig::with_cache_root(cache_root.clone())
            .with_reaper_queue_capacity(4)
            .with_download_timeout(Duration::from_secs(60));

        assert_eq!(config.cache_root, Some(cache_root));
        assert_eq!(config.reaper_queue_capacity, 4);
        assert_eq!(config.download_timeout, Some(Duration::from_secs(60)));
    }
}
