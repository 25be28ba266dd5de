pub mod chunk;
pub mod document;
pub mod id;
pub mod pipeline;
pub mod provider;
pub mod search;
pub mod source;

pub use chunk::{Chunk, ChunkPosition};
pub use document::{Document, DocumentMetadata};
pub use id::{ChunkId, DocId};
pub use pipeline::{PipelineStage, PipelineTrace};
pub use provider::{
    DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBEDDING_PROVIDER, EmbeddingSupport, GenerationMode,
    GenerationSettings, PROVIDERS, ProviderKind, ProviderSpec,
};
pub use search::ScoredChunk;
pub use source::{RepoLocation, SourceType};
