use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Step, http_client, send_json};
use crate::domain::GenerationSettings;
use crate::error::Result;
use crate::ports::{ChatModel, EmbeddingGenerator};

pub const DEFAULT_BASE_URL: &str = "https://api.cohere.com";

pub struct CohereChat {
    endpoint: String,
    api_key: String,
    settings: GenerationSettings,
    client: Client,
}

impl CohereChat {
    pub fn new(base_url: &str, api_key: String, settings: GenerationSettings) -> Result<Self> {
        Ok(Self {
            endpoint: format!("{}/v1/chat", base_url.trim_end_matches('/')),
            api_key,
            settings,
            client: http_client("Cohere")?,
        })
    }
}

#[async_trait]
impl ChatModel for CohereChat {
    fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.settings.model,
            message: prompt,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.trim())
            .json(&body);

        let parsed: ChatResponse = send_json(request, "Cohere", Step::Generation).await?;
        Ok(parsed.text)
    }
}

/// Cohere embeds stored content and queries differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum InputType {
    SearchDocument,
    SearchQuery,
}

pub struct CohereEmbeddings {
    endpoint: String,
    api_key: String,
    model: String,
    client: Client,
}

impl CohereEmbeddings {
    pub fn new(base_url: &str, api_key: String, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            endpoint: format!("{}/v1/embed", base_url.trim_end_matches('/')),
            api_key,
            model: model.into(),
            client: http_client("Cohere embeddings")?,
        })
    }

    async fn request(&self, texts: &[&str], input_type: InputType) -> Result<Vec<Vec<f32>>> {
        let body = EmbedRequest {
            model: &self.model,
            texts,
            input_type,
        };
        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.trim())
            .json(&body);

        let parsed: EmbedResponse = send_json(request, "Cohere embeddings", Step::Embedding).await?;
        if parsed.embeddings.len() != texts.len() {
            return Err(Step::Embedding.error(format!(
                "Cohere returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }
        Ok(parsed.embeddings)
    }
}

#[async_trait]
impl EmbeddingGenerator for CohereEmbeddings {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text], InputType::SearchQuery)
            .await?
            .pop()
            .ok_or_else(|| Step::Embedding.error("Cohere returned no embedding".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts, InputType::SearchDocument).await
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    text: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [&'a str],
    input_type: InputType,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn embed_request_names_the_input_type() {
        let body = EmbedRequest {
            model: "embed-english-v3.0",
            texts: &["fn main() {}"],
            input_type: InputType::SearchDocument,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "model": "embed-english-v3.0",
                "texts": ["fn main() {}"],
                "input_type": "search_document"
            })
        );
        assert_eq!(
            serde_json::to_value(InputType::SearchQuery).unwrap(),
            serde_json::json!("search_query")
        );
    }
}
