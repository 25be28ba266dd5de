pub mod chat;
pub mod embed;
pub mod fetch;
pub mod resolver;

pub use chat::{ChatModel, TokenStream};
pub use embed::EmbeddingGenerator;
pub use fetch::ContentFetcher;
pub use resolver::{ProviderResolver, ProviderSelection, ResolvedProvider};
