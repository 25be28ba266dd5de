use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FeedError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerState {
    pub last_feed: Option<String>,
}

/// Remembers the last selected feed between runs.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable file yields the empty state.
    pub fn load(&self) -> ViewerState {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return ViewerState::default();
        };
        toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "ignoring corrupt state file");
            ViewerState::default()
        })
    }

    pub fn save(&self, state: &ViewerState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string(state)
            .map_err(|e| FeedError::config(format!("failed to encode state: {e}")))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn remember(&self, feed: &str) -> Result<()> {
        self.save(&ViewerState {
            last_feed: Some(feed.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn remembers_the_last_feed() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nested").join("state.toml"));

        assert_eq!(store.load(), ViewerState::default());

        store.remember("Hacker News").unwrap();
        store.remember("Weather").unwrap();
        assert_eq!(store.load().last_feed.as_deref(), Some("Weather"));
    }

    #[test]
    fn corrupt_state_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");
        std::fs::write(&path, "last_feed = [").unwrap();
        assert_eq!(StateStore::new(path).load(), ViewerState::default());
    }
}
