pub mod answer;
pub mod chunker;
pub mod index;
pub mod pipeline;
pub mod resolver;

pub use answer::{AnswerGenerator, build_prompt, render_context};
pub use chunker::Chunker;
pub use index::{IndexEntry, VectorIndex, cosine_similarity};
pub use pipeline::{PipelineFailure, PipelineSettings, RagAnswer, RagPipeline, RagRequest};
pub use resolver::ProviderRegistry;
