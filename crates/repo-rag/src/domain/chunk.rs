use serde::{Deserialize, Serialize};

use super::{ChunkId, DocId, DocumentMetadata};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_id: DocId,
    pub content: String,
    pub position: ChunkPosition,
    pub metadata: DocumentMetadata,
}

impl Chunk {
    pub fn new(
        doc_id: DocId,
        content: String,
        position: ChunkPosition,
        metadata: DocumentMetadata,
    ) -> Self {
        let index = position.index.to_le_bytes();
        let id = ChunkId::derive(&[
            metadata.source.as_bytes(),
            &index,
            content.as_bytes(),
        ]);

        Self {
            id,
            doc_id,
            content,
            position,
            metadata,
        }
    }

    pub fn source(&self) -> &str {
        &self.metadata.source
    }

    /// Length in characters, the unit chunk sizes are measured in.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Location of a chunk inside its document, in char offsets (end exclusive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPosition {
    pub index: usize,
    pub start_char: usize,
    pub end_char: usize,
}
