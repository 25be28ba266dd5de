use std::collections::BTreeMap;
use std::sync::Arc;

use crate::adapters::{
    AnthropicChat, Auth, CohereChat, CohereEmbeddings, GeminiChat, HuggingFaceStream,
    OpenAiCompatibleChat, OpenAiEmbeddings, anthropic, cohere, google, huggingface,
};
use crate::config::{AzureConfig, Config, ProviderOverride};
use crate::domain::{
    DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBEDDING_PROVIDER, EmbeddingSupport, GenerationSettings,
    ProviderKind, ProviderSpec,
};
use crate::error::{RepoRagError, Result};
use crate::ports::{
    ChatModel, EmbeddingGenerator, ProviderResolver, ProviderSelection, ResolvedProvider,
};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const FIREWORKS_BASE_URL: &str = "https://api.fireworks.ai/inference/v1";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const MISTRAL_BASE_URL: &str = "https://api.mistral.ai/v1";
const TOGETHER_BASE_URL: &str = "https://api.together.xyz/v1";

/// Builds clients from the fixed provider table plus configured overrides.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    overrides: BTreeMap<String, ProviderOverride>,
    azure: AzureConfig,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            overrides: config.providers.clone(),
            azure: config.azure.clone(),
        }
    }

    fn override_for(&self, kind: ProviderKind) -> Option<&ProviderOverride> {
        self.overrides.get(kind.id())
    }

    fn settings_for(&self, spec: &ProviderSpec) -> GenerationSettings {
        let mut settings = GenerationSettings::from(spec);
        if let Some(model) = self.override_for(spec.kind).and_then(|o| o.model.clone()) {
            settings.model = model;
        }
        settings
    }

    fn base_url(&self, kind: ProviderKind) -> String {
        self.override_for(kind)
            .and_then(|o| o.base_url.clone())
            .unwrap_or_else(|| default_base_url(kind).to_string())
    }

    fn azure_endpoint(&self) -> Result<&str> {
        self.azure
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                RepoRagError::config(
                    "Azure requires an endpoint (azure.endpoint or AZURE_OPENAI_ENDPOINT)",
                )
            })
    }

    fn chat_client(
        &self,
        kind: ProviderKind,
        api_key: String,
        settings: GenerationSettings,
    ) -> Result<Arc<dyn ChatModel>> {
        let base_url = self.base_url(kind);
        let chat: Arc<dyn ChatModel> = match kind {
            ProviderKind::OpenAi
            | ProviderKind::FireworksAi
            | ProviderKind::Groq
            | ProviderKind::MistralAi
            | ProviderKind::TogetherAi => Arc::new(OpenAiCompatibleChat::new(
                kind.display_name(),
                &base_url,
                Auth::Bearer(api_key),
                settings,
            )?),
            ProviderKind::Azure => {
                let deployment = self
                    .azure
                    .chat_deployment
                    .clone()
                    .unwrap_or_else(|| settings.model.clone());
                Arc::new(OpenAiCompatibleChat::azure(
                    self.azure_endpoint()?,
                    &deployment,
                    &self.azure.api_version,
                    api_key,
                    settings,
                )?)
            }
            ProviderKind::Anthropic => Arc::new(AnthropicChat::new(&base_url, api_key, settings)?),
            ProviderKind::Google => Arc::new(GeminiChat::new(&base_url, api_key, settings)?),
            ProviderKind::Cohere => Arc::new(CohereChat::new(&base_url, api_key, settings)?),
            ProviderKind::HuggingFace => {
                Arc::new(HuggingFaceStream::new(&base_url, api_key, settings)?)
            }
        };
        Ok(chat)
    }

    fn native_embedder(
        &self,
        kind: ProviderKind,
        model: &str,
        api_key: String,
    ) -> Result<Arc<dyn EmbeddingGenerator>> {
        let embedder: Arc<dyn EmbeddingGenerator> = match kind {
            ProviderKind::OpenAi => Arc::new(OpenAiEmbeddings::new(
                &self.base_url(kind),
                Auth::Bearer(api_key),
                model,
            )?),
            ProviderKind::Azure => {
                let deployment = self
                    .azure
                    .embedding_deployment
                    .clone()
                    .unwrap_or_else(|| model.to_string());
                Arc::new(OpenAiEmbeddings::azure(
                    self.azure_endpoint()?,
                    &deployment,
                    &self.azure.api_version,
                    api_key,
                )?)
            }
            ProviderKind::Cohere => Arc::new(CohereEmbeddings::new(
                &self.base_url(kind),
                api_key,
                model,
            )?),
            other => {
                return Err(RepoRagError::config(format!(
                    "{other} has no native embedding model"
                )));
            }
        };
        Ok(embedder)
    }

    fn default_embedder(&self, secondary_api_key: String) -> Result<Arc<dyn EmbeddingGenerator>> {
        Ok(Arc::new(OpenAiEmbeddings::new(
            &self.base_url(DEFAULT_EMBEDDING_PROVIDER),
            Auth::Bearer(secondary_api_key),
            DEFAULT_EMBEDDING_MODEL,
        )?))
    }
}

impl ProviderResolver for ProviderRegistry {
    fn resolve(&self, selection: &ProviderSelection) -> Result<ResolvedProvider> {
        let kind: ProviderKind = selection.provider.parse()?;
        let spec = kind.spec();

        let api_key = non_blank(Some(&selection.api_key))
            .ok_or_else(|| RepoRagError::config(format!("{kind} requires an API key")))?;
        let secondary_api_key = if spec.requires_secondary_key() {
            Some(
                non_blank(selection.secondary_api_key.as_ref()).ok_or_else(|| {
                    RepoRagError::config(format!(
                        "{kind} needs a secondary API key for the default embedding model"
                    ))
                })?,
            )
        } else {
            None
        };

        let chat = self.chat_client(kind, api_key.clone(), self.settings_for(spec))?;

        let embedder = match (spec.embeddings, secondary_api_key) {
            (EmbeddingSupport::Native { model }, _) => self.native_embedder(kind, model, api_key)?,
            (EmbeddingSupport::Secondary, Some(key)) => self.default_embedder(key)?,
            (EmbeddingSupport::Secondary, None) => {
                return Err(RepoRagError::config(format!(
                    "{kind} needs a secondary API key for the default embedding model"
                )));
            }
        };

        tracing::info!(
            provider = %kind,
            chat_model = %chat.settings().model,
            embedding_model = embedder.model_name(),
            mode = ?chat.mode(),
            "resolved provider"
        );

        Ok(ResolvedProvider {
            kind,
            chat,
            embedder,
            requires_secondary_key: spec.requires_secondary_key(),
        })
    }
}

const fn default_base_url(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAi => OPENAI_BASE_URL,
        ProviderKind::FireworksAi => FIREWORKS_BASE_URL,
        ProviderKind::Groq => GROQ_BASE_URL,
        ProviderKind::MistralAi => MISTRAL_BASE_URL,
        ProviderKind::TogetherAi => TOGETHER_BASE_URL,
        ProviderKind::Anthropic => anthropic::DEFAULT_BASE_URL,
        ProviderKind::Google => google::DEFAULT_BASE_URL,
        ProviderKind::Cohere => cohere::DEFAULT_BASE_URL,
        ProviderKind::HuggingFace => huggingface::DEFAULT_BASE_URL,
        // Azure URLs come from the configured resource endpoint.
        ProviderKind::Azure => "",
    }
}

fn non_blank(key: Option<&String>) -> Option<String> {
    key.map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GenerationMode;
    use pretty_assertions::assert_eq;

    fn selection(provider: &str) -> ProviderSelection {
        ProviderSelection::new(provider, "primary-key").with_secondary_api_key("secondary-key")
    }

    fn azure_registry() -> ProviderRegistry {
        let mut config = Config::default();
        config.azure.endpoint = Some("https://res.openai.azure.com".to_string());
        ProviderRegistry::from_config(&config)
    }

    #[test]
    fn every_provider_resolves_with_table_defaults() {
        let registry = azure_registry();
        for kind in ProviderKind::ALL {
            let resolved = registry.resolve(&selection(kind.id())).unwrap();
            let spec = kind.spec();

            assert_eq!(resolved.kind, kind);
            assert_eq!(resolved.mode(), spec.mode, "{kind}");
            assert_eq!(resolved.chat.settings(), &GenerationSettings::from(spec));
            assert_eq!(resolved.requires_secondary_key, spec.requires_secondary_key());

            let expected_embedding = match spec.embeddings {
                EmbeddingSupport::Native { model } => model,
                EmbeddingSupport::Secondary => DEFAULT_EMBEDDING_MODEL,
            };
            assert_eq!(resolved.embedder.model_name(), expected_embedding, "{kind}");
        }
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = ProviderRegistry::new().resolve(&selection("xai")).unwrap_err();
        assert!(matches!(err, RepoRagError::Configuration(_)));
    }

    #[test]
    fn blank_primary_key_is_rejected() {
        let err = ProviderRegistry::new()
            .resolve(&ProviderSelection::new("openai", "   "))
            .unwrap_err();
        assert!(matches!(err, RepoRagError::Configuration(_)));
    }

    #[test]
    fn secondary_key_is_required_only_where_flagged() {
        let registry = ProviderRegistry::new();

        let err = registry
            .resolve(&ProviderSelection::new("groq", "primary-key"))
            .unwrap_err();
        assert!(matches!(err, RepoRagError::Configuration(_)));

        let err = registry
            .resolve(&ProviderSelection::new("groq", "k").with_secondary_api_key(""))
            .unwrap_err();
        assert!(matches!(err, RepoRagError::Configuration(_)));

        let openai = registry
            .resolve(&ProviderSelection::new("openai", "primary-key"))
            .unwrap();
        assert!(!openai.requires_secondary_key);
    }

    #[test]
    fn togetherai_is_its_own_single_shot_client() {
        let resolved = ProviderRegistry::new().resolve(&selection("TogetherAI")).unwrap();
        assert_eq!(resolved.kind, ProviderKind::TogetherAi);
        assert_eq!(resolved.mode(), GenerationMode::SingleShot);
        assert_eq!(
            resolved.chat.settings().model,
            "meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo"
        );
        assert_eq!(resolved.chat.settings().max_tokens, Some(256));
    }

    #[test]
    fn huggingface_streams_and_embeds_with_the_secondary_key() {
        let resolved = ProviderRegistry::new().resolve(&selection("HuggingFace")).unwrap();
        assert_eq!(resolved.mode(), GenerationMode::Streaming);
        assert_eq!(resolved.chat.settings().model, "google/flan-t5-xxl");
        assert_eq!(resolved.embedder.model_name(), DEFAULT_EMBEDDING_MODEL);
        assert!(resolved.requires_secondary_key);
    }

    #[test]
    fn azure_needs_an_endpoint() {
        let err = ProviderRegistry::new().resolve(&selection("azure")).unwrap_err();
        assert!(matches!(err, RepoRagError::Configuration(_)));
    }

    #[test]
    fn configured_model_overrides_the_table() {
        let mut config = Config::default();
        config.providers.insert(
            "groq".to_string(),
            ProviderOverride {
                base_url: Some("http://localhost:9000/v1".to_string()),
                model: Some("llama3-70b-8192".to_string()),
            },
        );
        let registry = ProviderRegistry::from_config(&config);

        let resolved = registry.resolve(&selection("groq")).unwrap();
        assert_eq!(resolved.chat.settings().model, "llama3-70b-8192");
        assert_eq!(registry.base_url(ProviderKind::Groq), "http://localhost:9000/v1");
        assert_eq!(registry.base_url(ProviderKind::MistralAi), MISTRAL_BASE_URL);
    }
}
