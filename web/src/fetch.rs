//! Browser fetch through gloo-net.

use async_trait::async_trait;
use gloo_net::http::Request;
use web_sys::RequestCredentials;

use datasrc::{Fetcher, LoadError, LoadResult, Response};

/// Response of a [`WebFetcher`].
pub struct WebResponse(gloo_net::http::Response);

#[async_trait(?Send)]
impl Response for WebResponse {
    fn status(&self) -> u16 {
        self.0.status()
    }

    fn content_type(&self) -> Option<String> {
        self.0.headers().get("content-type")
    }

    async fn text(self) -> LoadResult<String> {
        self.0.text().await.map_err(|e| LoadError::Network(e.to_string()))
    }
}

/// `fetch` with credentials sent to the same origin only.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebFetcher;

impl WebFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait(?Send)]
impl Fetcher for WebFetcher {
    type Response = WebResponse;

    async fn fetch(&self, url: &str) -> LoadResult<WebResponse> {
        let response = Request::get(url)
            .credentials(RequestCredentials::SameOrigin)
            .send()
            .await
            .map_err(|e| {
                log::debug!("Fetch of {} failed: {}", url, e);
                LoadError::Network(e.to_string())
            })?;
        Ok(WebResponse(response))
    }
}
