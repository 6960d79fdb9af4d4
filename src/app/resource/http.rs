//! `http://` and `https://` resources
//!
//! Existence and version come from a single `HEAD` request per handle; the
//! version is the `Last-Modified` header in epoch milliseconds (0 when the
//! server does not send one). Content is streamed from a `GET`.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use futures::StreamExt;
use reqwest::header::LAST_MODIFIED;
use reqwest::{Client, StatusCode};
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

use crate::app::cache::Version;
use crate::constants::http;

use super::{ByteStream, RemoteResource, ResourceLoader};

/// HTTP client settings
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whole-request timeout, including the body
    pub request_timeout: Duration,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            user_agent: http::USER_AGENT.to_string(),
        }
    }
}

impl HttpConfig {
    /// Build a reqwest client from this configuration
    pub fn build_http_client(&self) -> io::Result<Client> {
        Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(to_io_error)
    }
}

/// Loader for resources served over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpResourceLoader {
    client: Client,
}

impl HttpResourceLoader {
    pub fn new(config: &HttpConfig) -> io::Result<Self> {
        Ok(Self {
            client: config.build_http_client()?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl ResourceLoader for HttpResourceLoader {
    fn resolve(&self, uri: &Url) -> io::Result<Box<dyn RemoteResource>> {
        Ok(Box::new(HttpResource {
            uri: uri.clone(),
            client: self.client.clone(),
            head: OnceCell::new(),
        }))
    }
}

#[derive(Debug, Clone, Copy)]
struct HeadInfo {
    exists: bool,
    last_modified: Version,
}

struct HttpResource {
    uri: Url,
    client: Client,
    head: OnceCell<HeadInfo>,
}

impl HttpResource {
    async fn head(&self) -> io::Result<HeadInfo> {
        self.head
            .get_or_try_init(|| async {
                let response = self
                    .client
                    .head(self.uri.clone())
                    .send()
                    .await
                    .map_err(to_io_error)?;

                let status = response.status();
                debug!("HEAD {} -> {}", self.uri, status);

                if matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE) {
                    return Ok(HeadInfo {
                        exists: false,
                        last_modified: Version::new(0),
                    });
                }
                if !status.is_success() {
                    return Err(status_error(&self.uri, status));
                }

                let last_modified = match response.headers().get(LAST_MODIFIED) {
                    Some(value) => {
                        let value = value.to_str().map_err(|e| {
                            io::Error::new(io::ErrorKind::InvalidData, e.to_string())
                        })?;
                        parse_http_date(value)?
                    }
                    None => Version::new(0),
                };

                Ok::<_, io::Error>(HeadInfo {
                    exists: true,
                    last_modified,
                })
            })
            .await
            .copied()
    }
}

#[async_trait]
impl RemoteResource for HttpResource {
    fn uri(&self) -> &Url {
        &self.uri
    }

    async fn exists(&self) -> io::Result<bool> {
        Ok(self.head().await?.exists)
    }

    async fn last_modified(&self) -> io::Result<Version> {
        Ok(self.head().await?.last_modified)
    }

    async fn open_stream(&self) -> io::Result<ByteStream> {
        let response = self
            .client
            .get(self.uri.clone())
            .send()
            .await
            .map_err(to_io_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(&self.uri, status));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(to_io_error))
            .boxed())
    }
}

/// Parse an HTTP-date (`Tue, 15 Nov 1994 08:12:31 GMT`) into a version
fn parse_http_date(value: &str) -> io::Result<Version> {
    DateTime::parse_from_rfc2822(value)
        .map(|date| Version::new(date.timestamp_millis()))
        .map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid Last-Modified header '{}': {}", value, e),
            )
        })
}

fn status_error(uri: &Url, status: StatusCode) -> io::Error {
    let kind = if status == StatusCode::NOT_FOUND {
        io::ErrorKind::NotFound
    } else {
        io::ErrorKind::Other
    };
    io::Error::new(kind, format!("HTTP {} for {}", status.as_u16(), uri))
}

fn to_io_error(e: reqwest::Error) -> io::Error {
    let kind = if e.is_timeout() {
        io::ErrorKind::TimedOut
    } else {
        io::ErrorKind::Other
    };
    io::Error::new(kind, e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_http_date() {
        let version = parse_http_date("Tue, 15 Nov 1994 08:12:31 GMT").unwrap();
        assert_eq!(version, Version::new(784_887_151_000));

        assert!(parse_http_date("yesterday").is_err());
    }

    #[tokio::test]
    async fn test_default_config_builds_client() {
        let config = HttpConfig::default();
        assert!(config.user_agent.starts_with("fetch-cache/"));
        assert!(HttpResourceLoader::new(&config).is_ok());
    }

    #[test]
    fn test_status_error_kind() {
        let uri = Url::parse("https://my-server.com/a.jar").unwrap();
        assert_eq!(
            status_error(&uri, StatusCode::NOT_FOUND).kind(),
            io::ErrorKind::NotFound
        );
        assert_eq!(
            status_error(&uri, StatusCode::INTERNAL_SERVER_ERROR).kind(),
            io::ErrorKind::Other
        );
    }
}
