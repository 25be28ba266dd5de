//! HTTP implementations of the ports: GitHub content and model vendors.

pub mod anthropic;
pub mod cohere;
pub mod github;
pub mod google;
pub mod huggingface;
pub mod openai;

pub use anthropic::AnthropicChat;
pub use cohere::{CohereChat, CohereEmbeddings};
pub use github::GitHubFetcher;
pub use google::GeminiChat;
pub use huggingface::HuggingFaceStream;
pub use openai::{Auth, OpenAiCompatibleChat, OpenAiEmbeddings};

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::error::{RepoRagError, Result};

/// Which pipeline step a request serves; decides the error category of its failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Fetch,
    Embedding,
    Generation,
}

impl Step {
    pub(crate) fn error(self, message: String) -> RepoRagError {
        match self {
            Self::Fetch => RepoRagError::Fetch(message),
            Self::Embedding => RepoRagError::Embedding(message),
            Self::Generation => RepoRagError::Generation(message),
        }
    }
}

pub(crate) fn http_client(label: &str) -> Result<Client> {
    Client::builder()
        .user_agent(concat!("repo-rag/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| RepoRagError::config(format!("failed to build {label} HTTP client: {e}")))
}

/// Sends once and checks the status. No retries.
pub(crate) async fn send(request: RequestBuilder, label: &str, step: Step) -> Result<Response> {
    let resp = request
        .send()
        .await
        .map_err(|e| step.error(format!("failed to call {label}: {e}")))?;

    if resp.status().is_success() {
        return Ok(resp);
    }

    let status = resp.status();
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    Err(step.error(format!("{label} returned {status}: {body}")))
}

pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    label: &str,
    step: Step,
) -> Result<T> {
    send(request, label, step)
        .await?
        .json::<T>()
        .await
        .map_err(|e| step.error(format!("failed to parse {label} response: {e}")))
}
