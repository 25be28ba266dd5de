//! Feed list kept in a Google Sheet. Each row is one feed: the name in
//! column A, the CORS flag in column I and the URL in column J.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::SheetsConfig;
use crate::error::{FeedError, Result};
use crate::transport::HttpGet;

const NAME_COLUMN: usize = 0;
const CORS_COLUMN: usize = 8;
const URL_COLUMN: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub name: String,
    pub url: String,
    pub requires_cors_proxy: bool,
}

impl FeedEntry {
    /// `None` for rows without a name or URL.
    pub fn from_row(row: &[String]) -> Option<Self> {
        let cell = |i: usize| row.get(i).map(|s| s.trim()).filter(|s| !s.is_empty());

        let name = cell(NAME_COLUMN)?;
        let Some(url) = cell(URL_COLUMN) else {
            tracing::warn!(feed = name, "row has no feed URL; skipping");
            return None;
        };

        Some(Self {
            name: name.to_string(),
            url: url.to_string(),
            requires_cors_proxy: cell(CORS_COLUMN).is_some_and(|flag| flag.eq_ignore_ascii_case("TRUE")),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

pub struct FeedRegistry {
    sheets: SheetsConfig,
    transport: Arc<dyn HttpGet>,
}

impl FeedRegistry {
    pub fn new(sheets: SheetsConfig, transport: Arc<dyn HttpGet>) -> Self {
        Self { sheets, transport }
    }

    /// Every usable row, in sheet order.
    pub async fn list(&self) -> Result<Vec<FeedEntry>> {
        let url = self.sheets.values_url()?;
        let body = self.transport.get_text(&url).await?;
        let range: ValueRange = serde_json::from_str(&body)
            .map_err(|e| FeedError::parse(format!("unexpected Sheets response: {e}")))?;

        let entries: Vec<FeedEntry> = range
            .values
            .iter()
            .filter_map(|row| FeedEntry::from_row(row))
            .collect();
        tracing::debug!(rows = range.values.len(), feeds = entries.len(), "loaded feed registry");
        Ok(entries)
    }

    /// Exact, case-sensitive name match.
    pub async fn find(&self, name: &str) -> Result<FeedEntry> {
        self.list()
            .await?
            .into_iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| FeedError::FeedNotFound(name.to_string()))
    }
}
