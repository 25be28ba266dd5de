use std::path::Path;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;

use super::{Step, http_client, send, send_json};
use crate::config::FetchConfig;
use crate::domain::{Document, RepoLocation, SourceType};
use crate::error::{RepoRagError, Result};
use crate::ports::ContentFetcher;

/// Pulls text files through the GitHub REST API and raw content host.
pub struct GitHubFetcher {
    config: FetchConfig,
    token: Option<String>,
    client: Client,
}

impl GitHubFetcher {
    pub fn new(config: FetchConfig, token: Option<String>) -> Result<Self> {
        Ok(Self {
            config,
            token: token.filter(|t| !t.trim().is_empty()),
            client: http_client("GitHub")?,
        })
    }

    fn api(&self, url: String) -> RequestBuilder {
        let request = self
            .client
            .get(url)
            .header("accept", "application/vnd.github+json")
            .header("x-github-api-version", "2022-11-28");
        match &self.token {
            Some(token) => request.bearer_auth(token.trim()),
            None => request,
        }
    }

    fn api_url(&self, suffix: &str) -> String {
        format!("{}/{suffix}", self.config.api_base_url.trim_end_matches('/'))
    }

    /// Each path segment is percent-encoded, so `#`, `?` and `%` in file names survive.
    fn raw_url(&self, loc: &RepoLocation, git_ref: &str, path: &str) -> Result<Url> {
        let base = &self.config.raw_base_url;
        let mut url = Url::parse(base)
            .map_err(|e| RepoRagError::config(format!("Invalid raw content URL {base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| RepoRagError::config(format!("Raw content URL cannot take a path: {base}")))?
            .pop_if_empty()
            .extend([loc.owner.as_str(), loc.repo.as_str()])
            .extend(git_ref.split('/'))
            .extend(path.split('/'));
        Ok(url)
    }

    async fn resolve_ref(&self, loc: &RepoLocation) -> Result<String> {
        if let Some(git_ref) = &loc.git_ref {
            return Ok(git_ref.clone());
        }

        let url = self.api_url(&format!("repos/{}/{}", loc.owner, loc.repo));
        let repo: RepoInfo = send_json(self.api(url), "GitHub", Step::Fetch).await?;
        tracing::debug!(repo = %loc.slug(), branch = %repo.default_branch, "resolved default branch");
        Ok(repo.default_branch)
    }

    async fn list_tree(&self, loc: &RepoLocation, git_ref: &str) -> Result<Vec<TreeEntry>> {
        let url = self.api_url(&format!(
            "repos/{}/{}/git/trees/{git_ref}?recursive=1",
            loc.owner, loc.repo
        ));
        let tree: Tree = send_json(self.api(url), "GitHub", Step::Fetch).await?;
        if tree.truncated {
            tracing::warn!(repo = %loc.slug(), "tree listing truncated by GitHub; some files are missing");
        }
        Ok(tree.tree)
    }

    /// `None` when the body is not UTF-8 text.
    async fn fetch_file(
        &self,
        loc: &RepoLocation,
        git_ref: &str,
        path: &str,
    ) -> Result<Option<Document>> {
        let mut request = self.client.get(self.raw_url(loc, git_ref, path)?);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.trim());
        }

        let bytes = send(request, "GitHub raw content", Step::Fetch)
            .await?
            .bytes()
            .await
            .map_err(|e| RepoRagError::fetch(format!("failed to read {path}: {e}")))?;

        match String::from_utf8(bytes.to_vec()) {
            Ok(content) => Ok(Some(
                Document::new(path, content)
                    .with_path(path)
                    .with_git_ref(git_ref),
            )),
            Err(_) => {
                tracing::warn!(path, "skipping file that is not UTF-8 text");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl ContentFetcher for GitHubFetcher {
    async fn fetch_contents(&self, repo_url: &str, source_type: SourceType) -> Result<Vec<Document>> {
        let loc = RepoLocation::parse(repo_url)?;
        let git_ref = self.resolve_ref(&loc).await?;

        let paths = match source_type {
            SourceType::File => {
                let path = loc.path.clone().ok_or_else(|| {
                    RepoRagError::fetch(format!("File URL has no path: {repo_url}"))
                })?;
                vec![path]
            }
            SourceType::Directory | SourceType::Repository => {
                let prefix = match source_type {
                    SourceType::Directory => Some(loc.path.as_deref().ok_or_else(|| {
                        RepoRagError::fetch(format!("Directory URL has no path: {repo_url}"))
                    })?),
                    _ => loc.path.as_deref(),
                };
                let tree = self.list_tree(&loc, &git_ref).await?;
                select_paths(&tree, prefix, &self.config)
            }
        };

        tracing::info!(repo = %loc.slug(), %git_ref, %source_type, files = paths.len(), "fetching files");

        let mut documents = Vec::with_capacity(paths.len());
        for path in &paths {
            if let Some(doc) = self.fetch_file(&loc, &git_ref, path).await? {
                documents.push(doc);
            }
        }
        Ok(documents)
    }
}

/// Blobs under `prefix` with an allowed extension and size, in listing order, capped.
fn select_paths(tree: &[TreeEntry], prefix: Option<&str>, config: &FetchConfig) -> Vec<String> {
    let prefix = prefix.map(|p| format!("{}/", p.trim_matches('/')));

    tree.iter()
        .filter(|entry| entry.kind == "blob")
        .filter(|entry| {
            prefix
                .as_deref()
                .is_none_or(|prefix| entry.path.starts_with(prefix))
        })
        .filter(|entry| has_allowed_extension(&entry.path, &config.extensions))
        .filter(|entry| {
            let fits = entry.size.unwrap_or(0) <= config.max_file_bytes;
            if !fits {
                tracing::debug!(path = %entry.path, size = ?entry.size, "skipping large file");
            }
            fits
        })
        .take(config.max_files)
        .map(|entry| entry.path.clone())
        .collect()
}

fn has_allowed_extension(path: &str, extensions: &[String]) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
}

#[derive(Debug, Deserialize)]
struct RepoInfo {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct Tree {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tree() -> Vec<TreeEntry> {
        serde_json::from_value::<Tree>(serde_json::json!({
            "sha": "abc",
            "truncated": false,
            "tree": [
                {"path": "README.md", "type": "blob", "size": 120},
                {"path": "src", "type": "tree"},
                {"path": "src/main.rs", "type": "blob", "size": 800},
                {"path": "src/logo.png", "type": "blob", "size": 300},
                {"path": "src/generated.rs", "type": "blob", "size": 900_000},
                {"path": "src/nested/lib.RS", "type": "blob", "size": 10},
                {"path": "srcfile.rs", "type": "blob", "size": 10},
                {"path": "docs/guide.md", "type": "blob", "size": 50}
            ]
        }))
        .unwrap()
        .tree
    }

    #[test]
    fn repository_listing_keeps_text_files_within_limits() {
        let paths = select_paths(&tree(), None, &FetchConfig::default());
        assert_eq!(
            paths,
            [
                "README.md",
                "src/main.rs",
                "src/nested/lib.RS",
                "srcfile.rs",
                "docs/guide.md"
            ]
        );
    }

    #[test]
    fn directory_listing_matches_whole_path_segments() {
        let paths = select_paths(&tree(), Some("src/"), &FetchConfig::default());
        assert_eq!(paths, ["src/main.rs", "src/nested/lib.RS"]);
    }

    #[test]
    fn file_count_is_capped() {
        let config = FetchConfig {
            max_files: 2,
            ..FetchConfig::default()
        };
        assert_eq!(select_paths(&tree(), None, &config).len(), 2);
    }

    #[test]
    fn urls_are_built_from_configured_hosts() {
        let fetcher = GitHubFetcher::new(
            FetchConfig {
                api_base_url: "http://localhost:8080/".to_string(),
                raw_base_url: "http://localhost:8081".to_string(),
                ..FetchConfig::default()
            },
            Some("  ".to_string()),
        )
        .unwrap();
        let loc = RepoLocation::parse("https://github.com/rust-lang/cargo").unwrap();

        assert!(fetcher.token.is_none());
        assert_eq!(fetcher.api_url("repos/rust-lang/cargo"), "http://localhost:8080/repos/rust-lang/cargo");
        assert_eq!(
            fetcher.raw_url(&loc, "master", "src/lib.rs").unwrap().as_str(),
            "http://localhost:8081/rust-lang/cargo/master/src/lib.rs"
        );
    }

    #[test]
    fn raw_urls_escape_reserved_characters_in_file_names() {
        let fetcher = GitHubFetcher::new(FetchConfig::default(), None).unwrap();
        let loc = RepoLocation::parse("https://github.com/o/r").unwrap();
        let raw = |path: &str| fetcher.raw_url(&loc, "main", path).unwrap();

        let hash = raw("docs/c#-notes.md");
        assert_eq!(hash.path(), "/o/r/main/docs/c%23-notes.md");
        assert_eq!(hash.fragment(), None);

        let question = raw("docs/why?.md");
        assert_eq!(question.path(), "/o/r/main/docs/why%3F.md");
        assert_eq!(question.query(), None);

        assert_eq!(raw("docs/100%.md").path(), "/o/r/main/docs/100%25.md");
    }

    #[test]
    fn raw_urls_keep_slashes_in_refs_as_segments() {
        let fetcher = GitHubFetcher::new(FetchConfig::default(), None).unwrap();
        let loc = RepoLocation::parse("https://github.com/o/r").unwrap();
        assert_eq!(
            fetcher.raw_url(&loc, "feature/x", "src/lib.rs").unwrap().path(),
            "/o/r/feature/x/src/lib.rs"
        );
    }
}
