//! In-memory resources
//!
//! Resources live in a shared map keyed by URI. Clones of a loader share the
//! same map and counters, so several caches can be pointed at one "remote".
//! Streams can be slowed down per chunk or made to fail part-way through.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use url::Url;

use crate::app::cache::Version;

use super::{ByteStream, RemoteResource, ResourceLoader};

const DEFAULT_CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone)]
struct MemoryEntry {
    content: Arc<Vec<u8>>,
    version: Version,
    fail_after: Option<usize>,
}

#[derive(Debug)]
struct Inner {
    resources: HashMap<Url, MemoryEntry>,
    opens: HashMap<Url, usize>,
    resolves: usize,
    chunk_size: usize,
    chunk_delay: Option<Duration>,
}

/// Loader serving resources from memory
#[derive(Debug, Clone)]
pub struct MemoryResourceLoader {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MemoryResourceLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryResourceLoader {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                resources: HashMap::new(),
                opens: HashMap::new(),
                resolves: 0,
                chunk_size: DEFAULT_CHUNK_SIZE,
                chunk_delay: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add or replace a resource
    pub fn insert(&self, uri: &Url, content: impl Into<Vec<u8>>, version: impl Into<Version>) {
        self.lock().resources.insert(
            uri.clone(),
            MemoryEntry {
                content: Arc::new(content.into()),
                version: version.into(),
                fail_after: None,
            },
        );
    }

    pub fn remove(&self, uri: &Url) {
        self.lock().resources.remove(uri);
    }

    /// Make streams of `uri` fail once `bytes` bytes have been delivered
    pub fn fail_after(&self, uri: &Url, bytes: usize) {
        if let Some(entry) = self.lock().resources.get_mut(uri) {
            entry.fail_after = Some(bytes);
        }
    }

    pub fn clear_failure(&self, uri: &Url) {
        if let Some(entry) = self.lock().resources.get_mut(uri) {
            entry.fail_after = None;
        }
    }

    pub fn set_chunk_size(&self, chunk_size: usize) {
        self.lock().chunk_size = chunk_size.max(1);
    }

    /// Sleep before every chunk of every stream
    pub fn set_chunk_delay(&self, delay: Option<Duration>) {
        self.lock().chunk_delay = delay;
    }

    /// Number of streams opened for `uri`
    pub fn open_count(&self, uri: &Url) -> usize {
        self.lock().opens.get(uri).copied().unwrap_or(0)
    }

    /// Number of streams opened for any URI
    pub fn total_opens(&self) -> usize {
        self.lock().opens.values().sum()
    }

    /// Number of URIs resolved
    pub fn resolve_count(&self) -> usize {
        self.lock().resolves
    }
}

impl ResourceLoader for MemoryResourceLoader {
    fn resolve(&self, uri: &Url) -> io::Result<Box<dyn RemoteResource>> {
        let mut inner = self.lock();
        inner.resolves += 1;
        let entry = inner.resources.get(uri).cloned();

        Ok(Box::new(MemoryResource {
            uri: uri.clone(),
            entry,
            loader: self.clone(),
        }))
    }
}

struct MemoryResource {
    uri: Url,
    entry: Option<MemoryEntry>,
    loader: MemoryResourceLoader,
}

impl MemoryResource {
    fn entry(&self) -> io::Result<&MemoryEntry> {
        self.entry.as_ref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("No such resource: {}", self.uri))
        })
    }
}

#[async_trait]
impl RemoteResource for MemoryResource {
    fn uri(&self) -> &Url {
        &self.uri
    }

    async fn exists(&self) -> io::Result<bool> {
        Ok(self.entry.is_some())
    }

    async fn last_modified(&self) -> io::Result<Version> {
        Ok(self.entry()?.version)
    }

    async fn open_stream(&self) -> io::Result<ByteStream> {
        let entry = self.entry()?.clone();
        let (chunk_size, chunk_delay) = {
            let mut inner = self.loader.lock();
            *inner.opens.entry(self.uri.clone()).or_insert(0) += 1;
            (inner.chunk_size, inner.chunk_delay)
        };

        let content = entry.content;
        let fail_after = entry.fail_after;
        let end = fail_after.unwrap_or(content.len()).min(content.len());

        let chunks = stream::unfold(Some(0usize), move |offset| {
            let content = Arc::clone(&content);
            async move {
                let offset = offset?;
                if let Some(delay) = chunk_delay {
                    tokio::time::sleep(delay).await;
                }
                if offset >= end {
                    return fail_after.map(|n| {
                        let err = io::Error::new(
                            io::ErrorKind::ConnectionReset,
                            format!("stream interrupted after {} bytes", n),
                        );
                        (Err(err), None)
                    });
                }
                let next = (offset + chunk_size).min(end);
                Some((Ok(content[offset..next].to_vec()), Some(next)))
            }
        });

        Ok(chunks.boxed())
    }
}
