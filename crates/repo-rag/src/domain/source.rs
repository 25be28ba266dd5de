use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RepoRagError, Result};

/// How much of a repository a URL should pull in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Repository,
    Directory,
    File,
}

impl SourceType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Repository => "repository",
            Self::Directory => "directory",
            Self::File => "file",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = RepoRagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "repository" | "repo" => Ok(Self::Repository),
            "directory" | "dir" | "folder" => Ok(Self::Directory),
            "file" | "blob" => Ok(Self::File),
            _ => Err(RepoRagError::fetch(format!("Unsupported source type: {s}"))),
        }
    }
}

/// A GitHub URL broken into its API coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLocation {
    pub owner: String,
    pub repo: String,
    pub git_ref: Option<String>,
    pub path: Option<String>,
}

impl RepoLocation {
    /// Accepts `github.com/{owner}/{repo}` optionally followed by
    /// `/tree/{ref}/{path}` or `/blob/{ref}/{path}`.
    ///
    /// The URL alone cannot tell where a ref ends and the path begins, so the
    /// ref is always the single segment after `tree`/`blob`. A branch such as
    /// `feature/x` is read as ref `feature` with `x` leading the path; name
    /// such branches by commit SHA instead.
    pub fn parse(url: &str) -> Result<Self> {
        let invalid = || RepoRagError::fetch(format!("Invalid GitHub URL: {url}"));

        let rest = url
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_start_matches("www.");
        let rest = rest.strip_prefix("github.com/").ok_or_else(invalid)?;

        let mut segments = rest.split('/').filter(|s| !s.is_empty());
        let owner = segments.next().ok_or_else(invalid)?.to_string();
        let repo = segments
            .next()
            .ok_or_else(invalid)?
            .trim_end_matches(".git")
            .to_string();
        if repo.is_empty() {
            return Err(invalid());
        }

        let (git_ref, path) = match segments.next() {
            Some("tree" | "blob") => {
                let git_ref = segments.next().map(str::to_string);
                let path = segments.collect::<Vec<_>>().join("/");
                (git_ref, (!path.is_empty()).then_some(path))
            }
            Some(_) => return Err(invalid()),
            None => (None, None),
        };

        Ok(Self {
            owner,
            repo,
            git_ref,
            path,
        })
    }

    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}
