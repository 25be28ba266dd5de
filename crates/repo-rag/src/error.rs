use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepoRagError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl RepoRagError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch(message.into())
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 3,
            Self::Fetch(_) => 4,
            Self::Embedding(_) => 5,
            Self::Generation(_) => 6,
            Self::Io(_) | Self::Serialization(_) | Self::Http(_) => 10,
        }
    }
}

pub type Result<T> = std::result::Result<T, RepoRagError>;
