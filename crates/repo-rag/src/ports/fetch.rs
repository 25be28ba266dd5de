use async_trait::async_trait;

use crate::domain::{Document, SourceType};
use crate::error::Result;

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch_contents(&self, repo_url: &str, source_type: SourceType)
    -> Result<Vec<Document>>;
}
