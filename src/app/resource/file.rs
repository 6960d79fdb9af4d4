//! `file://` resources
//!
//! The version of a local file is its modification time.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::fs;
use tokio::io::AsyncReadExt;
use url::Url;

use crate::app::cache::Version;
use crate::constants::cache;

use super::{ByteStream, RemoteResource, ResourceLoader};

/// Loader for local files addressed by `file://` URIs
#[derive(Debug, Clone, Default)]
pub struct FileResourceLoader;

impl FileResourceLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ResourceLoader for FileResourceLoader {
    fn resolve(&self, uri: &Url) -> io::Result<Box<dyn RemoteResource>> {
        let path = uri.to_file_path().map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Not a local file URI: {}", uri),
            )
        })?;

        Ok(Box::new(FileResource {
            uri: uri.clone(),
            path,
        }))
    }
}

struct FileResource {
    uri: Url,
    path: PathBuf,
}

#[async_trait]
impl RemoteResource for FileResource {
    fn uri(&self) -> &Url {
        &self.uri
    }

    async fn exists(&self) -> io::Result<bool> {
        match fs::metadata(&self.path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn last_modified(&self) -> io::Result<Version> {
        let modified = fs::metadata(&self.path).await?.modified()?;
        Ok(Version::from_system_time(modified))
    }

    async fn open_stream(&self) -> io::Result<ByteStream> {
        let file = fs::File::open(&self.path).await?;

        let chunks = stream::try_unfold(file, |mut file| async move {
            let mut buf = vec![0u8; cache::STREAM_CHUNK_SIZE];
            let n = file.read(&mut buf).await?;
            if n == 0 {
                return Ok::<_, io::Error>(None);
            }
            buf.truncate(n);
            Ok::<_, io::Error>(Some((buf, file)))
        });

        Ok(chunks.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_file_resource() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.jar");
        let content = vec![7u8; cache::STREAM_CHUNK_SIZE + 10];
        std::fs::write(&path, &content).unwrap();

        let uri = Url::from_file_path(&path).unwrap();
        let resource = FileResourceLoader::new().resolve(&uri).unwrap();

        assert!(resource.exists().await.unwrap());
        assert!(resource.last_modified().await.unwrap() > Version::new(0));

        let chunks: Vec<Vec<u8>> = resource
            .open_stream()
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks.concat(), content);
    }

    #[tokio::test]
    async fn test_directories_and_missing_files_do_not_exist() {
        let temp_dir = TempDir::new().unwrap();
        let loader = FileResourceLoader::new();

        let dir = loader
            .resolve(&Url::from_directory_path(temp_dir.path()).unwrap())
            .unwrap();
        assert!(!dir.exists().await.unwrap());

        let missing = loader
            .resolve(&Url::from_file_path(temp_dir.path().join("missing")).unwrap())
            .unwrap();
        assert!(!missing.exists().await.unwrap());
    }

    #[test]
    fn test_rejects_non_file_uris() {
        let uri = Url::parse("https://my-server.com/a.jar").unwrap();
        assert!(FileResourceLoader::new().resolve(&uri).is_err());
    }
}
