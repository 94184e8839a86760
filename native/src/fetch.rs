//! Native fetcher: HTTP(S) through reqwest, `file:` URLs from disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use datasrc::{Fetcher, LoadError, LoadResult, Response};

use crate::decode::decode_body;

/// Errors raised below the [`LoadError`] surface.
#[derive(Debug, Error)]
pub enum NativeError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading a local file failed.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The locator is neither an absolute URL nor a usable path.
    #[error("Invalid source: {0}")]
    InvalidSource(String),
}

impl From<NativeError> for LoadError {
    fn from(err: NativeError) -> Self {
        LoadError::Network(err.to_string())
    }
}

/// Base URL for resolving relative sources against a directory.
pub fn directory_url(dir: &Path) -> Result<Url, NativeError> {
    Url::from_directory_path(dir)
        .map_err(|_| NativeError::InvalidSource(dir.display().to_string()))
}

/// Base URL for the current working directory.
pub fn current_dir_url() -> Result<Url, NativeError> {
    let cwd = std::env::current_dir()?;
    directory_url(&cwd)
}

// =============================================================================
// Response
// =============================================================================

#[derive(Debug)]
enum Body {
    Http(reqwest::Response),
    Bytes(Vec<u8>),
}

/// Response of an [`HttpFetcher`].
#[derive(Debug)]
pub struct NativeResponse {
    status: u16,
    content_type: Option<String>,
    body: Body,
}

impl NativeResponse {
    fn file(status: u16, bytes: Vec<u8>) -> Self {
        Self {
            status,
            content_type: None,
            body: Body::Bytes(bytes),
        }
    }
}

#[async_trait(?Send)]
impl Response for NativeResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn content_type(&self) -> Option<String> {
        self.content_type.clone()
    }

    async fn text(self) -> LoadResult<String> {
        let bytes = match self.body {
            Body::Http(response) => response.bytes().await.map_err(NativeError::from)?.to_vec(),
            Body::Bytes(bytes) => bytes,
        };
        Ok(decode_body(&bytes, self.content_type.as_deref()))
    }
}

// =============================================================================
// Fetcher
// =============================================================================

/// Fetches absolute `http`, `https` and `file` URLs.
///
/// A missing file answers with status 404, mirroring what a static file
/// server would do, so the caller sees a transport error rather than a
/// network failure.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_http(&self, url: &str) -> Result<NativeResponse, NativeError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        log::debug!("GET {} -> {}", url, status);

        Ok(NativeResponse {
            status,
            content_type,
            body: Body::Http(response),
        })
    }

    async fn fetch_file(&self, path: PathBuf) -> Result<NativeResponse, NativeError> {
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(NativeResponse::file(200, bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("File not found: {}", path.display());
                Ok(NativeResponse::file(404, Vec::new()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait(?Send)]
impl Fetcher for HttpFetcher {
    type Response = NativeResponse;

    async fn fetch(&self, url: &str) -> LoadResult<NativeResponse> {
        let response = match Url::parse(url) {
            Ok(parsed) if parsed.scheme() == "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|_| NativeError::InvalidSource(url.to_string()))?;
                self.fetch_file(path).await?
            }
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => self.fetch_http(url).await?,
            Ok(_) => return Err(NativeError::InvalidSource(url.to_string()).into()),
            // Not a URL at all: treat as a path on disk
            Err(_) => self.fetch_file(PathBuf::from(url)).await?,
        };
        Ok(response)
    }
}
