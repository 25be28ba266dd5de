pub mod config;
pub mod error;
pub mod registry;
pub mod render;
pub mod state;
pub mod transport;
pub mod viewer;

pub use error::{FeedError, Result};
pub use registry::{FeedEntry, FeedRegistry};
pub use render::{FeedContent, RssItem};
pub use viewer::{FeedView, FeedViewer, FetchRoute};
