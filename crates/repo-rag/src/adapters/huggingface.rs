//! Hugging Face text-generation-inference, consumed as server-sent events.

use std::collections::VecDeque;
use std::fmt;

use async_trait::async_trait;
use futures_util::stream::{self, Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Step, http_client, send};
use crate::domain::{GenerationMode, GenerationSettings};
use crate::error::{RepoRagError, Result};
use crate::ports::{ChatModel, TokenStream};

pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

pub struct HuggingFaceStream {
    endpoint: String,
    api_key: String,
    settings: GenerationSettings,
    client: Client,
}

impl HuggingFaceStream {
    pub fn new(base_url: &str, api_key: String, settings: GenerationSettings) -> Result<Self> {
        Ok(Self {
            endpoint: format!(
                "{}/models/{}",
                base_url.trim_end_matches('/'),
                settings.model
            ),
            api_key,
            settings,
            client: http_client("Hugging Face")?,
        })
    }
}

#[async_trait]
impl ChatModel for HuggingFaceStream {
    fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    fn mode(&self) -> GenerationMode {
        GenerationMode::Streaming
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut tokens = self.stream(prompt).await?;
        let mut text = String::new();
        while let Some(fragment) = tokens.next().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }

    async fn stream(&self, prompt: &str) -> Result<TokenStream> {
        let body = GenerateRequest {
            inputs: prompt,
            parameters: Parameters {
                max_new_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            },
            stream: true,
        };
        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.trim())
            .header("accept", "text/event-stream")
            .json(&body);

        let resp = send(request, "Hugging Face", Step::Generation).await?;
        Ok(token_stream(resp.bytes_stream().boxed()))
    }
}

/// Turns a raw SSE byte stream into answer fragments. The stream ends after the
/// first error.
pub fn token_stream<S, B, E>(body: S) -> TokenStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let state = StreamState {
        body,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                if item.is_err() {
                    st.pending.clear();
                    st.finished = true;
                }
                return Some((item, st));
            }
            if st.finished {
                return None;
            }

            match st.body.next().await {
                Some(Ok(bytes)) => st.pending.extend(st.decoder.push(bytes.as_ref())),
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((
                        Err(RepoRagError::generation(format!("Hugging Face stream interrupted: {e}"))),
                        st,
                    ));
                }
                None => {
                    st.finished = true;
                    st.pending.extend(st.decoder.finish());
                }
            }
        }
    })
    .boxed()
}

struct StreamState<S> {
    body: S,
    decoder: SseDecoder,
    pending: VecDeque<Result<String>>,
    finished: bool,
}

/// Line-buffered decoder for `data:` events. Network chunks may split lines and
/// UTF-8 sequences anywhere.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<String>> {
        self.buffer.extend_from_slice(bytes);

        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(item) = decode_line(&line[..line.len() - 1]) {
                out.push(item);
            }
        }
        out
    }

    /// Flushes a trailing line that arrived without a newline.
    pub fn finish(&mut self) -> Vec<Result<String>> {
        let line = std::mem::take(&mut self.buffer);
        decode_line(&line).into_iter().collect()
    }
}

fn decode_line(line: &[u8]) -> Option<Result<String>> {
    let line = match std::str::from_utf8(line) {
        Ok(line) => line.trim_end_matches('\r'),
        Err(e) => {
            return Some(Err(RepoRagError::generation(format!(
                "Hugging Face stream is not UTF-8: {e}"
            ))));
        }
    };

    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(StreamEvent {
            error: Some(message),
            ..
        }) => Some(Err(RepoRagError::generation(format!(
            "Hugging Face reported: {message}"
        )))),
        Ok(StreamEvent {
            token: Some(token), ..
        }) if !token.special && !token.text.is_empty() => Some(Ok(token.text)),
        Ok(_) => None,
        Err(e) => Some(Err(RepoRagError::generation(format!(
            "malformed Hugging Face event: {e}"
        )))),
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: Parameters,
    stream: bool,
}

#[derive(Serialize)]
struct Parameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_new_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    token: Option<StreamToken>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamToken {
    text: String,
    #[serde(default)]
    special: bool,
}
