//! Remote resource capability
//!
//! The cache never talks to a transport directly. It resolves a URI through a
//! [`ResourceLoader`] and asks the resulting [`RemoteResource`] whether it
//! exists, which version it currently is, and for its bytes.
//!
//! Loaders provided here:
//! - [`FileResourceLoader`] for `file://` URIs
//! - [`HttpResourceLoader`] for `http://` and `https://` URIs
//! - [`SchemeResourceLoader`] routing between the two by scheme
//! - [`MemoryResourceLoader`] holding resources in memory

use std::io;

use async_trait::async_trait;
use futures::stream::BoxStream;
use url::Url;

use crate::app::cache::Version;

pub mod file;
pub mod http;
pub mod memory;

pub use file::FileResourceLoader;
pub use http::{HttpConfig, HttpResourceLoader};
pub use memory::MemoryResourceLoader;

/// Chunked byte stream of a resource's content
pub type ByteStream = BoxStream<'static, io::Result<Vec<u8>>>;

/// Handle to one remote resource
#[async_trait]
pub trait RemoteResource: Send + Sync {
    /// URI this handle was resolved from
    fn uri(&self) -> &Url;

    /// Whether the resource currently exists remotely
    async fn exists(&self) -> io::Result<bool>;

    /// Current revision of the resource (last-modified epoch milliseconds)
    async fn last_modified(&self) -> io::Result<Version>;

    /// Open the resource's content for reading
    async fn open_stream(&self) -> io::Result<ByteStream>;
}

/// Resolves URIs to resource handles
pub trait ResourceLoader: Send + Sync {
    fn resolve(&self, uri: &Url) -> io::Result<Box<dyn RemoteResource>>;
}

/// Loader dispatching on the URI scheme
#[derive(Debug, Clone)]
pub struct SchemeResourceLoader {
    file: FileResourceLoader,
    http: HttpResourceLoader,
}

impl SchemeResourceLoader {
    /// Create a loader for `file`, `http` and `https` URIs
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(http_config: &HttpConfig) -> io::Result<Self> {
        Ok(Self {
            file: FileResourceLoader::new(),
            http: HttpResourceLoader::new(http_config)?,
        })
    }
}

impl ResourceLoader for SchemeResourceLoader {
    fn resolve(&self, uri: &Url) -> io::Result<Box<dyn RemoteResource>> {
        match uri.scheme() {
            "file" => self.file.resolve(uri),
            "http" | "https" => self.http.resolve(uri),
            other => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("Unsupported URI scheme '{}': {}", other, uri),
            )),
        }
    }
}
