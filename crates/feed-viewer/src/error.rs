use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeedError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 3,
            Self::FeedNotFound(_) => 2,
            Self::Fetch(_) => 4,
            Self::Parse(_) => 5,
            Self::Io(_) => 10,
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
