use serde::{Deserialize, Serialize};

use super::DocId;

/// A text file pulled from a repository. Never mutated after the fetcher builds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        let source = source.into();
        let content = content.into();
        let content_hash = blake3::hash(content.as_bytes()).to_hex().to_string();
        let id = DocId::derive(&[source.as_bytes(), content_hash.as_bytes()]);

        Self {
            id,
            content,
            metadata: DocumentMetadata {
                source,
                path: None,
                git_ref: None,
                content_hash,
            },
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.metadata.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_git_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.metadata.git_ref = Some(git_ref.into());
        self
    }

    pub fn source(&self) -> &str {
        &self.metadata.source
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Identifier shown to the model as the chunk's source label.
    pub source: String,
    pub path: Option<String>,
    pub git_ref: Option<String>,
    pub content_hash: String,
}
