use async_trait::async_trait;
use reqwest::Client;

use crate::error::{FeedError, Result};

/// Plain-text GET, the only HTTP the viewer needs.
#[async_trait]
pub trait HttpGet: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("feed-viewer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeedError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpGet for ReqwestTransport {
    async fn get_text(&self, url: &str) -> Result<String> {
        // cors-anywhere refuses requests that carry neither Origin nor this header.
        let resp = self
            .client
            .get(url)
            .header("x-requested-with", "XMLHttpRequest")
            .send()
            .await
            .map_err(|e| FeedError::fetch(format!("GET {url}: {e}")))?;

        let status = resp.status();
        tracing::debug!(%url, %status, "response");
        if !status.is_success() {
            return Err(FeedError::fetch(format!("GET {url} returned {status}")));
        }

        resp.text()
            .await
            .map_err(|e| FeedError::fetch(format!("GET {url}: failed to read body: {e}")))
    }
}
