//! Repository locations on a forge.

use std::path::{Path, PathBuf};

use url::Url;

use super::FetchError;

/// Forge used when a catalog does not configure one.
pub const DEFAULT_FORGE: &str = "https://github.com";

/// Where an `owner/repo` pair lives and where its caches go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLocator {
    pub owner: String,
    pub repo: String,
    url: Url,
}

impl RepoLocator {
    /// Locate `owner/repo` under `forge` (e.g. `https://github.com`).
    pub fn new(forge: &Url, owner: &str, repo: &str) -> Result<Self, FetchError> {
        if !is_plain_component(owner) || !is_plain_component(repo) {
            return Err(FetchError::MissingSource {
                id: format!("{}/{}", owner, repo),
            });
        }
        let url = forge
            .join(&format!("{}/{}", owner, repo))
            .map_err(|source| FetchError::InvalidUrl {
                name: format!("{}/{}", owner, repo),
                source,
            })?;
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            url,
        })
    }

    /// Parse a forge base URL. A trailing `/` is added so joins append.
    pub fn parse_forge(forge: &str) -> Result<Url, url::ParseError> {
        if forge.ends_with('/') {
            Url::parse(forge)
        } else {
            Url::parse(&format!("{}/", forge))
        }
    }

    pub fn repo_url(&self) -> &str {
        self.url.as_str()
    }

    /// Forge zip archive for a revision (`<repo>/archive/<rev>.zip`).
    pub fn archive_url(&self, rev: &str) -> String {
        format!("{}/archive/{}.zip", self.url.as_str().trim_end_matches('/'), rev)
    }

    /// Bare repository cache for this repo.
    pub fn bare_repo_dir(&self, state_dir: &Path) -> PathBuf {
        let hash = blake3::hash(self.url.as_str().as_bytes()).to_hex().to_string();
        state_dir.join("git").join(format!("{}.git", hash))
    }

    /// Exported tree cache for one commit of this repo.
    pub fn checkout_dir(&self, state_dir: &Path, commit: &str) -> PathBuf {
        state_dir
            .join("cache")
            .join("plugins")
            .join(&self.owner)
            .join(&self.repo)
            .join(commit)
    }
}

fn is_plain_component(part: &str) -> bool {
    !part.is_empty() && part != "." && part != ".." && !part.contains(['/', '\\'])
}
