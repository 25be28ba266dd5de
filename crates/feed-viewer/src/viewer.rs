use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::registry::{FeedEntry, FeedRegistry};
use crate::render::{FeedContent, render};
use crate::transport::HttpGet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "route", content = "url", rename_all = "snake_case")]
pub enum FetchRoute {
    Proxied(String),
    Direct(String),
}

impl FetchRoute {
    pub fn for_entry(entry: &FeedEntry, proxy_url: &str) -> Self {
        if entry.requires_cors_proxy {
            Self::Proxied(format!("{proxy_url}{}", entry.url))
        } else {
            Self::Direct(entry.url.clone())
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Proxied(url) | Self::Direct(url) => url,
        }
    }

    pub const fn is_proxied(&self) -> bool {
        matches!(self, Self::Proxied(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedView {
    pub entry: FeedEntry,
    pub route: FetchRoute,
    pub content: FeedContent,
}

pub struct FeedViewer {
    registry: FeedRegistry,
    transport: Arc<dyn HttpGet>,
    proxy_url: String,
}

impl FeedViewer {
    pub fn new(registry: FeedRegistry, transport: Arc<dyn HttpGet>, proxy_url: impl Into<String>) -> Self {
        Self {
            registry,
            transport,
            proxy_url: proxy_url.into(),
        }
    }

    pub async fn list(&self) -> Result<Vec<FeedEntry>> {
        self.registry.list().await
    }

    /// Looks the feed up, fetches it through the route its row asks for and renders it.
    pub async fn show(&self, name: &str) -> Result<FeedView> {
        let entry = self.registry.find(name).await?;
        let route = FetchRoute::for_entry(&entry, &self.proxy_url);
        tracing::info!(feed = %entry.name, url = route.url(), proxied = route.is_proxied(), "fetching feed");

        let payload = self.transport.get_text(route.url()).await.inspect_err(|e| {
            tracing::error!(feed = %entry.name, error = %e, "feed fetch failed");
        })?;
        let content = render(&payload).inspect_err(|e| {
            tracing::error!(feed = %entry.name, error = %e, "feed parse failed");
        })?;

        Ok(FeedView {
            entry,
            route,
            content,
        })
    }
}
