//! Source fetching for plugins the registry cannot serve.
//!
//! The resolution engine only depends on the [`SourceFetcher`] contract:
//! given an owner, repo, reference and optional content hash, produce a
//! directory of plugin content or a [`FetchError`]. Two backends exist:
//! - [`GitFetcher`]: bare clone + tree export (default)
//! - [`ArchiveFetcher`]: forge zip archive download

mod archive;
mod error;
mod git;
mod source;
mod staging;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use archive::ArchiveFetcher;
pub use error::FetchError;
pub use git::GitFetcher;
pub use source::{DEFAULT_FORGE, RepoLocator};

/// Git reference to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum FetchRef {
    Tag(String),
    Commit(String),
    Branch(String),
    /// A version of unknown kind; resolved with rev-parse semantics
    Revision(String),
    /// Floating: whatever the default branch points at
    Head,
}

impl FetchRef {
    /// Revision string understood by git and forge archive URLs.
    pub fn rev(&self) -> &str {
        match self {
            FetchRef::Tag(name)
            | FetchRef::Commit(name)
            | FetchRef::Branch(name)
            | FetchRef::Revision(name) => name,
            FetchRef::Head => "HEAD",
        }
    }

    /// Floating references may move between runs and are always refreshed.
    pub fn is_floating(&self) -> bool {
        matches!(self, FetchRef::Branch(_) | FetchRef::Head)
    }
}

impl fmt::Display for FetchRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rev())
    }
}

/// Everything a backend needs to fetch one plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchRequest {
    pub owner: String,
    pub repo: String,
    pub reference: FetchRef,
    /// Expected tree hash; verified when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl FetchRequest {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, reference: FetchRef) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            reference,
            content_hash: None,
        }
    }

    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }

    pub fn display_name(&self) -> String {
        format!("{}/{}@{}", self.owner, self.repo, self.reference)
    }
}

/// Result of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedSource {
    /// Directory holding the plugin content
    pub path: PathBuf,
    /// Commit the reference resolved to, when the backend knows it
    pub commit: Option<String>,
    /// Tree hash of `path`
    pub tree_hash: String,
}

/// Contract between the resolution engine and a fetch backend.
pub trait SourceFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedSource, FetchError>;
}

impl<F: SourceFetcher + ?Sized> SourceFetcher for &F {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedSource, FetchError> {
        (**self).fetch(request)
    }
}

impl<F: SourceFetcher + ?Sized> SourceFetcher for Box<F> {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedSource, FetchError> {
        (**self).fetch(request)
    }
}

/// Which fetch backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchBackend {
    #[default]
    Git,
    Archive,
}

impl FetchBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchBackend::Git => "git",
            FetchBackend::Archive => "archive",
        }
    }

    /// Build the backend rooted at `state_dir`.
    pub fn build(
        self,
        state_dir: PathBuf,
        forge: &str,
    ) -> anyhow::Result<Box<dyn SourceFetcher>> {
        Ok(match self {
            FetchBackend::Git => Box::new(GitFetcher::new(state_dir, forge)?),
            FetchBackend::Archive => Box::new(ArchiveFetcher::new(state_dir, forge)?),
        })
    }
}

impl FromStr for FetchBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "git" => Ok(FetchBackend::Git),
            "archive" | "zip" => Ok(FetchBackend::Archive),
            _ => anyhow::bail!("Unknown fetch backend: {}. Use 'git' or 'archive'", s),
        }
    }
}
