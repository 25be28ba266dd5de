use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Step, http_client, send_json};
use crate::domain::GenerationSettings;
use crate::error::Result;
use crate::ports::ChatModel;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
/// Sent when the settings carry no limit; the Messages API requires one.
const FALLBACK_MAX_TOKENS: u32 = 1024;

pub struct AnthropicChat {
    endpoint: String,
    api_key: String,
    settings: GenerationSettings,
    client: Client,
}

impl AnthropicChat {
    pub fn new(base_url: &str, api_key: String, settings: GenerationSettings) -> Result<Self> {
        Ok(Self {
            endpoint: format!("{}/v1/messages", base_url.trim_end_matches('/')),
            api_key,
            settings,
            client: http_client("Anthropic")?,
        })
    }
}

#[async_trait]
impl ChatModel for AnthropicChat {
    fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens.unwrap_or(FALLBACK_MAX_TOKENS),
            temperature: self.settings.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };
        let request = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", self.api_key.trim())
            .header("anthropic-version", API_VERSION)
            .json(&body);

        let parsed: MessagesResponse = send_json(request, "Anthropic", Step::Generation).await?;
        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(Step::Generation.error("Anthropic returned no text content".to_string()));
        }
        Ok(text)
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_blocks_are_joined() {
        let parsed: MessagesResponse = serde_json::from_str(
            r#"{"id":"msg_1","content":[{"type":"text","text":"Hello "},{"type":"tool_use","id":"x"},{"type":"text","text":"there"}]}"#,
        )
        .unwrap();
        let text: String = parsed
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect();
        assert_eq!(text, "Hello there");
    }
}
