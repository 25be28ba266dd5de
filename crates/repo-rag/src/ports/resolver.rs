use std::fmt;
use std::sync::Arc;

use crate::domain::{GenerationMode, ProviderKind};
use crate::error::Result;
use crate::ports::{ChatModel, EmbeddingGenerator};

/// What the user picked: a provider identifier plus one or two credentials.
#[derive(Clone, Default)]
pub struct ProviderSelection {
    pub provider: String,
    pub api_key: String,
    pub secondary_api_key: Option<String>,
}

impl ProviderSelection {
    pub fn new(provider: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            api_key: api_key.into(),
            secondary_api_key: None,
        }
    }

    #[must_use]
    pub fn with_secondary_api_key(mut self, key: impl Into<String>) -> Self {
        self.secondary_api_key = Some(key.into());
        self
    }
}

impl fmt::Debug for ProviderSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSelection")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field(
                "secondary_api_key",
                &self.secondary_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Chat and embedding clients ready for one pipeline run.
#[derive(Clone)]
pub struct ResolvedProvider {
    pub kind: ProviderKind,
    pub chat: Arc<dyn ChatModel>,
    pub embedder: Arc<dyn EmbeddingGenerator>,
    pub requires_secondary_key: bool,
}

impl ResolvedProvider {
    pub fn mode(&self) -> GenerationMode {
        self.chat.mode()
    }
}

impl fmt::Debug for ResolvedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedProvider")
            .field("kind", &self.kind)
            .field("chat_model", &self.chat.settings().model)
            .field("embedding_model", &self.embedder.model_name())
            .field("requires_secondary_key", &self.requires_secondary_key)
            .field("mode", &self.mode())
            .finish()
    }
}

pub trait ProviderResolver: Send + Sync {
    fn resolve(&self, selection: &ProviderSelection) -> Result<ResolvedProvider>;
}
