//! Error types for the fetching cache
//!
//! One error enum per component, mirroring how failures surface to callers:
//! manifest construction, per-entry fetches, bulk downloads, cache setup, and
//! configuration. `AppError` ties them together for the command-line front end.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Manifest construction errors
///
/// Both variants are local and caller-correctable; they are raised before
/// anything touches the disk or the network.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// URI has no usable path component to derive a file name from
    #[error("Invalid URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Two distinct sources would be written to the same target file
    #[error("Duplicate target {target}: both {first} and {second} map to it")]
    DuplicateTarget {
        target: PathBuf,
        first: Url,
        second: Url,
    },
}

/// Per-entry fetch errors raised by the cache engine
#[derive(Error, Debug)]
pub enum FetchError {
    /// Remote resource does not exist
    #[error("Resource not found: {uri}")]
    ResourceNotFound { uri: Url },

    /// OS-level advisory lock could not be taken
    #[error("Failed to lock {path}")]
    LockAcquisitionFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other I/O failure (directory creation, download, copy)
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    /// Wrap an I/O error with a description of what was being attempted
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Bulk download errors raised by the orchestrator
#[derive(Error, Debug)]
pub enum DownloadError {
    /// A manifest precondition does not hold on the live filesystem
    #[error("Precondition failed for {path}: {reason}")]
    PreconditionFailed { path: PathBuf, reason: String },

    /// A manifest entry failed to fetch
    #[error("Error downloading dependency {uri}")]
    Fetch {
        uri: Url,
        #[source]
        source: FetchError,
    },
}

/// Cache setup errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache directory could not be created or inspected
    #[error("Cache directory not accessible: {path}")]
    DirectoryNotAccessible {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Cache location exists but is not a directory
    #[error("This location is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format in {path}")]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Manifest error
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Fetch error
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Manifest(_) => "manifest",
            AppError::Fetch(_) => "fetch",
            AppError::Download(_) => "download",
            AppError::Cache(_) => "cache",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }

    /// Render the error and its source chain for the terminal
    pub fn report(&self) -> String {
        let mut report = format!("Error ({}): {}", self.category(), self);
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            report.push_str(&format!("\n  caused by: {}", cause));
            source = cause.source();
        }
        report
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Manifest result type alias
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;

/// Fetch result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Config result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
