use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait EmbeddingGenerator: Send + Sync {
    fn model_name(&self) -> &str;

    /// Embeds a search query.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds stored content. Returns one vector per input, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}
