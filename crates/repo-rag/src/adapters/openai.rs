//! OpenAI-style chat completions and embeddings. Also spoken by Azure, Groq,
//! Fireworks, Together and Mistral.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use super::{Step, http_client, send_json};
use crate::domain::GenerationSettings;
use crate::error::Result;
use crate::ports::{ChatModel, EmbeddingGenerator};

#[derive(Clone)]
pub enum Auth {
    /// `Authorization: Bearer {key}`
    Bearer(String),
    /// `api-key: {key}`, as Azure expects.
    ApiKeyHeader(String),
}

impl Auth {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer(key) => request.bearer_auth(key.trim()),
            Self::ApiKeyHeader(key) => request.header("api-key", key.trim()),
        }
    }
}

pub struct OpenAiCompatibleChat {
    label: String,
    endpoint: String,
    auth: Auth,
    settings: GenerationSettings,
    client: Client,
}

impl OpenAiCompatibleChat {
    pub fn new(
        label: impl Into<String>,
        base_url: &str,
        auth: Auth,
        settings: GenerationSettings,
    ) -> Result<Self> {
        let label = label.into();
        let client = http_client(&label)?;
        Ok(Self {
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            label,
            auth,
            settings,
            client,
        })
    }

    pub fn azure(
        endpoint: &str,
        deployment: &str,
        api_version: &str,
        api_key: String,
        settings: GenerationSettings,
    ) -> Result<Self> {
        let client = http_client("Azure OpenAI")?;
        Ok(Self {
            label: "Azure OpenAI".to_string(),
            endpoint: azure_url(endpoint, deployment, "chat/completions", api_version),
            auth: Auth::ApiKeyHeader(api_key),
            settings,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatibleChat {
    fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        let request = self.auth.apply(self.client.post(&self.endpoint)).json(&body);
        let parsed: ChatResponse = send_json(request, &self.label, Step::Generation).await?;

        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| Step::Generation.error(format!("{} returned no message content", self.label)))
    }
}

pub struct OpenAiEmbeddings {
    label: String,
    endpoint: String,
    auth: Auth,
    model: String,
    client: Client,
}

impl OpenAiEmbeddings {
    pub fn new(base_url: &str, auth: Auth, model: impl Into<String>) -> Result<Self> {
        let client = http_client("OpenAI embeddings")?;
        Ok(Self {
            label: "OpenAI embeddings".to_string(),
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            auth,
            model: model.into(),
            client,
        })
    }

    pub fn azure(
        endpoint: &str,
        deployment: &str,
        api_version: &str,
        api_key: String,
    ) -> Result<Self> {
        let client = http_client("Azure OpenAI embeddings")?;
        Ok(Self {
            label: "Azure OpenAI embeddings".to_string(),
            endpoint: azure_url(endpoint, deployment, "embeddings", api_version),
            auth: Auth::ApiKeyHeader(api_key),
            model: deployment.to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EmbeddingGenerator for OpenAiEmbeddings {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| Step::Embedding.error(format!("{} returned no embedding", self.label)))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let request = self.auth.apply(self.client.post(&self.endpoint)).json(&body);
        let mut parsed: EmbeddingResponse = send_json(request, &self.label, Step::Embedding).await?;

        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != texts.len() {
            return Err(Step::Embedding.error(format!(
                "{} returned {} embeddings for {} inputs",
                self.label,
                parsed.data.len(),
                texts.len()
            )));
        }
        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

fn azure_url(endpoint: &str, deployment: &str, operation: &str, api_version: &str) -> String {
    format!(
        "{}/openai/deployments/{deployment}/{operation}?api-version={api_version}",
        endpoint.trim_end_matches('/')
    )
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
