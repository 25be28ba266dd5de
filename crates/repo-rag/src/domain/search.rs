use serde::{Deserialize, Serialize};

use super::Chunk;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity against the query, in `[-1, 1]`.
    pub score: f32,
}
