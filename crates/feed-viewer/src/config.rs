use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FeedError, Result};

const CONFIG_FILE: &str = "feed-viewer.toml";

pub const DEFAULT_SPREADSHEET_ID: &str = "1jQTlXWom-pXvyP9zuTcbdluyvpb43hu2h7anxhF5qlQ";
pub const DEFAULT_RANGE: &str = "A2:J";
pub const DEFAULT_PROXY_URL: &str = "https://cors-anywhere.herokuapp.com/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub sheets: SheetsConfig,
    /// Prefix put in front of feed URLs that need a CORS proxy.
    pub proxy_url: String,
    /// Where the last selected feed is remembered. Defaults to the user data dir.
    pub state_file: Option<PathBuf>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            sheets: SheetsConfig::default(),
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            state_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub api_base_url: String,
    pub spreadsheet_id: String,
    pub range: String,
    pub api_key: Option<String>,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://sheets.googleapis.com/v4".to_string(),
            spreadsheet_id: DEFAULT_SPREADSHEET_ID.to_string(),
            range: DEFAULT_RANGE.to_string(),
            api_key: None,
        }
    }
}

impl SheetsConfig {
    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                FeedError::config(
                    "no Google Sheets API key; set sheets.api_key or FEED_VIEWER_SHEETS_API_KEY",
                )
            })
    }

    pub fn values_url(&self) -> Result<String> {
        Ok(format!(
            "{}/spreadsheets/{}/values/{}?key={}",
            self.api_base_url.trim_end_matches('/'),
            self.spreadsheet_id,
            self.range,
            self.api_key()?
        ))
    }
}

impl FeedConfig {
    pub fn load() -> Result<Self> {
        let global = directories::ProjectDirs::from("", "", "feed-viewer")
            .map(|d| d.config_dir().join(CONFIG_FILE));
        let project = PathBuf::from(CONFIG_FILE);
        let config = Self::load_from(global.as_deref(), Some(&project))?;
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Global file first, project file layered over it. Missing files are skipped.
    pub fn load_from(global: Option<&Path>, project: Option<&Path>) -> Result<Self> {
        let mut merged = toml::Table::new();
        for path in [global, project].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let table = std::fs::read_to_string(path)?
                .parse::<toml::Table>()
                .map_err(|e| FeedError::config(format!("{}: {e}", path.display())))?;
            merge_tables(&mut merged, table);
        }

        toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| FeedError::config(e.to_string()))
    }

    #[must_use]
    pub fn with_env_overrides<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = var("FEED_VIEWER_SHEETS_API_KEY") {
            self.sheets.api_key = Some(key);
        }
        if let Some(id) = var("FEED_VIEWER_SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = id;
        }
        if let Some(proxy) = var("FEED_VIEWER_PROXY_URL") {
            self.proxy_url = proxy;
        }
        self
    }

    pub fn state_path(&self) -> Option<PathBuf> {
        self.state_file.clone().or_else(|| {
            directories::ProjectDirs::from("", "", "feed-viewer")
                .map(|d| d.data_dir().join("state.toml"))
        })
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

    #[test]
    fn defaults_point_at_the_public_sheet() {
        let config = FeedConfig::load_from(None, None).unwrap();
        assert_eq!(config.sheets.spreadsheet_id, DEFAULT_SPREADSHEET_ID);
        assert_eq!(config.sheets.range, "A2:J");
        assert_eq!(config.proxy_url, "https://cors-anywhere.herokuapp.com/");
        assert!(config.sheets.api_key.is_none());
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let mut sheets = SheetsConfig::default();
        assert!(matches!(sheets.values_url(), Err(FeedError::Config(_))));

        sheets.api_key = Some("  ".to_string());
        assert!(matches!(sheets.values_url(), Err(FeedError::Config(_))));

        sheets.api_key = Some("abc".to_string());
        assert_eq!(
            sheets.values_url().unwrap(),
            format!(
                "https://sheets.googleapis.com/v4/spreadsheets/{DEFAULT_SPREADSHEET_ID}/values/A2:J?key=abc"
            )
        );
    }

    #[test]
    fn project_file_and_environment_layer_over_global() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.toml");
        let project = dir.path().join("project.toml");
        std::fs::write(
            &global,
            "proxy_url = \"http://localhost:8080/\"\n[sheets]\napi_key = \"global\"\nrange = \"A2:K\"\n",
        )
        .unwrap();
        std::fs::write(&project, "[sheets]\nrange = \"B2:J\"\n").unwrap();

        let config = FeedConfig::load_from(Some(&global), Some(&project))
            .unwrap()
            .with_env_overrides(|key| {
                (key == "FEED_VIEWER_SHEETS_API_KEY").then(|| "from-env".to_string())
            });

        assert_eq!(config.proxy_url, "http://localhost:8080/");
        assert_eq!(config.sheets.range, "B2:J");
        assert_eq!(config.sheets.api_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn malformed_file_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[sheets").unwrap();
        assert!(matches!(
            FeedConfig::load_from(Some(&bad), None),
            Err(FeedError::Config(_))
        ));
    }
}
