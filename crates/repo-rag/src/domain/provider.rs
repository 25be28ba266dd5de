use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RepoRagError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Azure,
    Google,
    Cohere,
    FireworksAi,
    Groq,
    MistralAi,
    TogetherAi,
    HuggingFace,
}

impl ProviderKind {
    pub const ALL: [Self; 10] = [
        Self::OpenAi,
        Self::Anthropic,
        Self::Azure,
        Self::Google,
        Self::Cohere,
        Self::FireworksAi,
        Self::Groq,
        Self::MistralAi,
        Self::TogetherAi,
        Self::HuggingFace,
    ];

    /// Lowercase identifier used on the command line and in config files.
    pub const fn id(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Azure => "azure",
            Self::Google => "google",
            Self::Cohere => "cohere",
            Self::FireworksAi => "fireworksai",
            Self::Groq => "groq",
            Self::MistralAi => "mistralai",
            Self::TogetherAi => "togetherai",
            Self::HuggingFace => "huggingface",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Azure => "Azure",
            Self::Google => "Google",
            Self::Cohere => "Cohere",
            Self::FireworksAi => "FireworksAI",
            Self::Groq => "Groq",
            Self::MistralAi => "MistralAI",
            Self::TogetherAi => "TogetherAI",
            Self::HuggingFace => "HuggingFace",
        }
    }

    pub const fn spec(self) -> &'static ProviderSpec {
        match self {
            Self::OpenAi => &PROVIDERS[0],
            Self::Anthropic => &PROVIDERS[1],
            Self::Azure => &PROVIDERS[2],
            Self::Google => &PROVIDERS[3],
            Self::Cohere => &PROVIDERS[4],
            Self::FireworksAi => &PROVIDERS[5],
            Self::Groq => &PROVIDERS[6],
            Self::MistralAi => &PROVIDERS[7],
            Self::TogetherAi => &PROVIDERS[8],
            Self::HuggingFace => &PROVIDERS[9],
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProviderKind {
    type Err = RepoRagError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == normalized)
            .ok_or_else(|| RepoRagError::config(format!("Unknown provider: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// One request, one complete answer.
    SingleShot,
    /// Answer arrives as a sequence of token fragments.
    Streaming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingSupport {
    /// The vendor embeds with the same credential as the chat model.
    Native { model: &'static str },
    /// No vendor embedding model; a second credential keys the default embedder.
    Secondary,
}

/// Fixed per-provider defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProviderSpec {
    pub kind: ProviderKind,
    pub chat_model: &'static str,
    /// `None` where the provider path exposes no temperature control.
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub embeddings: EmbeddingSupport,
    pub mode: GenerationMode,
}

impl ProviderSpec {
    pub const fn requires_secondary_key(&self) -> bool {
        matches!(self.embeddings, EmbeddingSupport::Secondary)
    }
}

/// Embedder used for every provider flagged [`EmbeddingSupport::Secondary`].
pub const DEFAULT_EMBEDDING_PROVIDER: ProviderKind = ProviderKind::OpenAi;
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

pub const PROVIDERS: [ProviderSpec; 10] = [
    ProviderSpec {
        kind: ProviderKind::OpenAi,
        chat_model: "gpt-4o-mini",
        temperature: Some(0.0),
        max_tokens: None,
        embeddings: EmbeddingSupport::Native {
            model: DEFAULT_EMBEDDING_MODEL,
        },
        mode: GenerationMode::SingleShot,
    },
    ProviderSpec {
        kind: ProviderKind::Anthropic,
        chat_model: "claude-3-5-sonnet-20240620",
        temperature: Some(0.0),
        // The Messages API rejects requests without max_tokens.
        max_tokens: Some(1024),
        embeddings: EmbeddingSupport::Secondary,
        mode: GenerationMode::SingleShot,
    },
    ProviderSpec {
        kind: ProviderKind::Azure,
        chat_model: "gpt-4o",
        temperature: Some(0.0),
        max_tokens: None,
        embeddings: EmbeddingSupport::Native {
            model: "text-embedding-ada-002",
        },
        mode: GenerationMode::SingleShot,
    },
    ProviderSpec {
        kind: ProviderKind::Google,
        chat_model: "gemini-1.5-pro",
        temperature: Some(0.0),
        max_tokens: None,
        embeddings: EmbeddingSupport::Secondary,
        mode: GenerationMode::SingleShot,
    },
    ProviderSpec {
        kind: ProviderKind::Cohere,
        chat_model: "command-r-plus",
        temperature: Some(0.0),
        max_tokens: None,
        embeddings: EmbeddingSupport::Native {
            model: "embed-english-v3.0",
        },
        mode: GenerationMode::SingleShot,
    },
    ProviderSpec {
        kind: ProviderKind::FireworksAi,
        chat_model: "accounts/fireworks/models/llama-v3p1-70b-instruct",
        temperature: Some(0.0),
        max_tokens: None,
        embeddings: EmbeddingSupport::Secondary,
        mode: GenerationMode::SingleShot,
    },
    ProviderSpec {
        kind: ProviderKind::Groq,
        chat_model: "mixtral-8x7b-32768",
        temperature: Some(0.0),
        max_tokens: None,
        embeddings: EmbeddingSupport::Secondary,
        mode: GenerationMode::SingleShot,
    },
    ProviderSpec {
        kind: ProviderKind::MistralAi,
        chat_model: "codestral-latest",
        temperature: Some(0.0),
        max_tokens: None,
        embeddings: EmbeddingSupport::Secondary,
        mode: GenerationMode::SingleShot,
    },
    ProviderSpec {
        kind: ProviderKind::TogetherAi,
        chat_model: "meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo",
        temperature: None,
        max_tokens: Some(256),
        embeddings: EmbeddingSupport::Secondary,
        mode: GenerationMode::SingleShot,
    },
    ProviderSpec {
        kind: ProviderKind::HuggingFace,
        chat_model: "google/flan-t5-xxl",
        temperature: None,
        max_tokens: Some(250),
        embeddings: EmbeddingSupport::Secondary,
        mode: GenerationMode::Streaming,
    },
];

/// Model parameters a chat client is built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl From<&ProviderSpec> for GenerationSettings {
    fn from(spec: &ProviderSpec) -> Self {
        Self {
            model: spec.chat_model.to_string(),
            temperature: spec.temperature,
            max_tokens: spec.max_tokens,
        }
    }
}
