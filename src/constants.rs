//! Application constants for the fetching cache
//!
//! This module centralizes constants used throughout the crate, organized by
//! functional domain.

use std::time::Duration;

/// On-disk cache entry names
///
/// These names are shared with every other process using the same cache
/// root and must not change.
pub mod files {
    /// Zero-byte marker used for advisory locking of a version directory
    pub const LOCK_FILE_NAME: &str = "lock";

    /// Committed, fully downloaded payload
    pub const DATA_FILE_NAME: &str = "data";

    /// In-flight payload, renamed to `data` once complete
    pub const DATA_DOWNLOAD_FILE_NAME: &str = "data.tmp";
}

/// Cache behaviour defaults
pub mod cache {
    use super::Duration;

    /// Directory name used under the OS cache directory
    pub const DEFAULT_DIR_NAME: &str = "fetch-cache";

    /// Pending cleanup jobs held before new ones are dropped
    pub const REAPER_QUEUE_CAPACITY: usize = 256;

    /// Default bound on a single remote read (`None` = wait forever)
    pub const DOWNLOAD_TIMEOUT: Option<Duration> = None;

    /// Read buffer size for local file streams
    pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("fetch-cache/", env!("CARGO_PKG_VERSION"));

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
}

/// Configuration file locations
pub mod config {
    /// Project-local config file name
    pub const LOCAL_CONFIG_FILE: &str = "fetch-cache.toml";

    /// Directory under the user config dir
    pub const CONFIG_DIR_NAME: &str = "fetch-cache";

    /// Config file name inside the config directory
    pub const CONFIG_FILE_NAME: &str = "config.toml";
}

/// Logging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}

pub use files::{DATA_DOWNLOAD_FILE_NAME, DATA_FILE_NAME, LOCK_FILE_NAME};
pub use http::USER_AGENT;
