use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RepoRagError, Result};

const PROJECT_CONFIG: &str = ".repo-rag.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github_token: Option<String>,
    pub provider: ProviderConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub fetch: FetchConfig,
    pub azure: AzureConfig,
    /// Per-provider overrides keyed by provider id (`openai`, `groq`, ...).
    pub providers: BTreeMap<String, ProviderOverride>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub default: Option<String>,
    pub api_key: Option<String>,
    pub secondary_api_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderOverride {
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            overlap: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub embedding_batch_size: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            embedding_batch_size: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub api_base_url: String,
    pub raw_base_url: String,
    pub extensions: Vec<String>,
    pub max_files: usize,
    pub max_file_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            raw_base_url: "https://raw.githubusercontent.com".to_string(),
            extensions: [
                "md", "mdx", "txt", "rst", "rs", "js", "jsx", "ts", "tsx", "py", "go", "java",
                "kt", "c", "h", "cpp", "hpp", "cs", "rb", "php", "swift", "toml", "json", "yaml",
                "yml", "html", "css", "sh",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            max_files: 200,
            max_file_bytes: 200_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    /// e.g. `https://my-resource.openai.azure.com`
    pub endpoint: Option<String>,
    pub api_version: String,
    pub chat_deployment: Option<String>,
    pub embedding_deployment: Option<String>,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_version: "2024-02-01".to_string(),
            chat_deployment: None,
            embedding_deployment: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let global = Self::global_path();
        let project = PathBuf::from(PROJECT_CONFIG);
        let config = Self::load_from(Some(&global), Some(&project))?;
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Reads the global file, then layers the project file over it key by key.
    /// Missing files are skipped.
    pub fn load_from(global: Option<&Path>, project: Option<&Path>) -> Result<Self> {
        let mut merged = toml::Table::new();
        for path in [global, project].into_iter().flatten() {
            if let Some(table) = Self::read_table(path)? {
                merge_tables(&mut merged, table);
            }
        }

        toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| RepoRagError::config(e.to_string()))
    }

    fn global_path() -> PathBuf {
        let config_dir = directories::ProjectDirs::from("", "", "repo-rag").map_or_else(
            || PathBuf::from("~/.config/repo-rag"),
            |d| d.config_dir().to_path_buf(),
        );

        config_dir.join("config.toml")
    }

    fn read_table(path: &Path) -> Result<Option<toml::Table>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        content
            .parse::<toml::Table>()
            .map(Some)
            .map_err(|e| RepoRagError::config(format!("{}: {e}", path.display())))
    }

    /// Environment variables win over both files.
    #[must_use]
    pub fn with_env_overrides<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = var("GITHUB_TOKEN") {
            self.github_token = Some(token);
        }
        if let Some(provider) = var("REPO_RAG_PROVIDER") {
            self.provider.default = Some(provider);
        }
        if let Some(key) = var("REPO_RAG_API_KEY") {
            self.provider.api_key = Some(key);
        }
        if let Some(key) = var("REPO_RAG_SECONDARY_API_KEY") {
            self.provider.secondary_api_key = Some(key);
        }
        if let Some(endpoint) = var("AZURE_OPENAI_ENDPOINT") {
            self.azure.endpoint = Some(endpoint);
        }
        self
    }

    pub fn detect_github_token() -> Option<String> {
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            return Some(token);
        }

        std::process::Command::new("gh")
            .args(["auth", "token"])
            .output()
            .ok()
            .filter(|o| o.status.success())
            .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
            .filter(|token| !token.is_empty())
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults_without_files() {
        let config = Config::load_from(None, None).unwrap();
        assert_eq!(config.chunking, ChunkingConfig::default());
        assert_eq!(config.chunking.chunk_size, 2000);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.retrieval.top_k, 3);
        assert!(config.github_token.is_none());
    }

    #[test]
    fn project_file_overrides_global_key_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let global = write(
            dir.path(),
            "global.toml",
            r#"
github_token = "global-token"

[chunking]
chunk_size = 1000
overlap = 100

[providers.groq]
base_url = "http://localhost:9000/v1"
"#,
        );
        let project = write(
            dir.path(),
            "project.toml",
            r#"
[chunking]
overlap = 50

[providers.groq]
model = "llama3-70b-8192"
"#,
        );

        let config = Config::load_from(Some(&global), Some(&project)).unwrap();
        assert_eq!(config.github_token.as_deref(), Some("global-token"));
        assert_eq!(
            config.chunking,
            ChunkingConfig {
                chunk_size: 1000,
                overlap: 50
            }
        );
        assert_eq!(
            config.providers.get("groq"),
            Some(&ProviderOverride {
                base_url: Some("http://localhost:9000/v1".to_string()),
                model: Some("llama3-70b-8192".to_string()),
            })
        );
    }

    #[test]
    fn missing_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(Some(&dir.path().join("nope.toml")), None).unwrap();
        assert_eq!(config.retrieval, RetrievalConfig::default());
    }

    #[test]
    fn malformed_file_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write(dir.path(), "bad.toml", "chunking = [");
        let err = Config::load_from(Some(&bad), None).unwrap_err();
        assert!(matches!(err, RepoRagError::Configuration(_)));
    }

    #[test]
    fn environment_wins_over_files() {
        let dir = tempfile::tempdir().unwrap();
        let project = write(
            dir.path(),
            "project.toml",
            r#"
github_token = "file-token"

[provider]
default = "openai"
api_key = "file-key"
"#,
        );
        let env: HashMap<&str, &str> = HashMap::from([
            ("GITHUB_TOKEN", "env-token"),
            ("REPO_RAG_PROVIDER", "groq"),
            ("REPO_RAG_SECONDARY_API_KEY", "env-secondary"),
        ]);

        let config = Config::load_from(None, Some(&project))
            .unwrap()
            .with_env_overrides(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.github_token.as_deref(), Some("env-token"));
        assert_eq!(config.provider.default.as_deref(), Some("groq"));
        assert_eq!(config.provider.api_key.as_deref(), Some("file-key"));
        assert_eq!(
            config.provider.secondary_api_key.as_deref(),
            Some("env-secondary")
        );
    }
}
