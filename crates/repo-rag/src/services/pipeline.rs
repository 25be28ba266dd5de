use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use super::{AnswerGenerator, Chunker, VectorIndex, render_context};
use crate::config::{ChunkingConfig, Config};
use crate::domain::{
    GenerationMode, PipelineStage, PipelineTrace, ProviderKind, ScoredChunk, SourceType,
};
use crate::error::{RepoRagError, Result};
use crate::ports::{ContentFetcher, ProviderResolver, ProviderSelection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub chunking: ChunkingConfig,
    pub top_k: usize,
    pub embedding_batch_size: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            chunking: config.chunking,
            top_k: config.retrieval.top_k,
            embedding_batch_size: config.retrieval.embedding_batch_size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RagRequest {
    pub selection: ProviderSelection,
    pub repo_url: String,
    pub source_type: SourceType,
    pub query: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    pub provider: ProviderKind,
    pub mode: GenerationMode,
    pub documents: usize,
    pub chunks: usize,
    pub matches: Vec<ScoredChunk>,
    pub trace: PipelineTrace,
}

/// A failed run: the error plus the stages reached before it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PipelineFailure {
    #[source]
    pub error: RepoRagError,
    pub trace: PipelineTrace,
}

impl PipelineFailure {
    pub fn failed_at(&self) -> Option<PipelineStage> {
        self.trace.failed_at()
    }
}

/// One question about one repository, start to finish. Every run builds fresh
/// clients and a fresh index.
pub struct RagPipeline {
    resolver: Arc<dyn ProviderResolver>,
    fetcher: Arc<dyn ContentFetcher>,
    settings: PipelineSettings,
}

impl RagPipeline {
    pub fn new(
        resolver: Arc<dyn ProviderResolver>,
        fetcher: Arc<dyn ContentFetcher>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            settings,
        }
    }

    pub async fn run(&self, request: &RagRequest) -> std::result::Result<RagAnswer, PipelineFailure> {
        self.run_with(request, |_| {}).await
    }

    /// Like [`run`](Self::run), handing answer fragments to `on_fragment` as they arrive.
    pub async fn run_with<F>(
        &self,
        request: &RagRequest,
        on_fragment: F,
    ) -> std::result::Result<RagAnswer, PipelineFailure>
    where
        F: FnMut(&str) + Send,
    {
        let mut trace = PipelineTrace::new();
        match self.execute(request, &mut trace, on_fragment).await {
            Ok(answer) => Ok(answer),
            Err(error) => {
                let stage = trace.current();
                trace.fail();
                tracing::warn!(%stage, %error, "pipeline failed");
                Err(PipelineFailure { error, trace })
            }
        }
    }

    async fn execute<F>(
        &self,
        request: &RagRequest,
        trace: &mut PipelineTrace,
        on_fragment: F,
    ) -> Result<RagAnswer>
    where
        F: FnMut(&str) + Send,
    {
        enter(trace);
        let provider = self.resolver.resolve(&request.selection)?;
        let chunker = Chunker::from_config(&self.settings.chunking)?;

        enter(trace);
        let documents = self
            .fetcher
            .fetch_contents(&request.repo_url, request.source_type)
            .await?;
        if documents.is_empty() {
            return Err(RepoRagError::fetch(format!(
                "No content found at {} ({})",
                request.repo_url, request.source_type
            )));
        }
        tracing::debug!(documents = documents.len(), "fetched");

        enter(trace);
        let chunks = chunker.split(&documents);
        let chunk_count = chunks.len();
        tracing::debug!(chunks = chunk_count, "chunked");

        enter(trace);
        let mut index = VectorIndex::new(provider.embedder.clone())
            .with_batch_size(self.settings.embedding_batch_size);
        index.add(chunks).await?;
        tracing::debug!(entries = index.len(), dimension = ?index.dimension(), "indexed");

        enter(trace);
        let matches = index.search(&request.query, self.settings.top_k).await?;
        tracing::debug!(matches = matches.len(), "retrieved");

        enter(trace);
        let context = render_context(&matches);
        let answer = AnswerGenerator::new(provider.chat.clone())
            .answer_with(&context, &request.query, on_fragment)
            .await?;

        enter(trace);
        Ok(RagAnswer {
            answer,
            provider: provider.kind,
            mode: provider.mode(),
            documents: documents.len(),
            chunks: chunk_count,
            matches,
            trace: trace.clone(),
        })
    }
}

fn enter(trace: &mut PipelineTrace) {
    let stage = trace.advance();
    tracing::info!(%stage, "pipeline stage");
}
