use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};

use crate::domain::{GenerationMode, GenerationSettings};
use crate::error::Result;

/// Lazy, finite, non-restartable sequence of answer fragments.
pub type TokenStream = BoxStream<'static, Result<String>>;

#[async_trait]
pub trait ChatModel: Send + Sync {
    fn settings(&self) -> &GenerationSettings;

    fn mode(&self) -> GenerationMode {
        GenerationMode::SingleShot
    }

    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Single-shot models yield their whole answer as one fragment.
    async fn stream(&self, prompt: &str) -> Result<TokenStream> {
        let text = self.generate(prompt).await?;
        Ok(stream::once(async move { Ok(text) }).boxed())
    }
}
