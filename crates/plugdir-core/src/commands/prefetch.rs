//! Prefetch command: fetch one repository and report its tree hash, ready to
//! be pasted into a catalog entry.

use std::path::PathBuf;

use serde::Serialize;

use crate::fetch::{FetchRef, FetchRequest, SourceFetcher};
use crate::fs::{format_hash, normalize_hash};
use crate::naming::parse_identifier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefetchReport {
    pub id: String,
    pub reference: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// `blake3:`-prefixed, as catalogs expect it
    pub tree_hash: String,
}

pub struct PrefetchCommand<F> {
    fetcher: F,
}

impl<F: SourceFetcher> PrefetchCommand<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Fetch `id` (`owner/repo`) at `rev`, or at HEAD when `rev` is `None`.
    pub fn execute(&self, id: &str, rev: Option<&str>) -> anyhow::Result<PrefetchReport> {
        let (owner, repo) = parse_identifier(id)
            .ok_or_else(|| anyhow::anyhow!("Expected owner/repo, got '{}'", id))?;
        let reference = match rev.map(str::trim).filter(|r| !r.is_empty()) {
            Some(rev) => FetchRef::Revision(rev.to_string()),
            None => FetchRef::Head,
        };
        let request = FetchRequest::new(owner, repo, reference);
        let fetched = self.fetcher.fetch(&request)?;
        tracing::info!(id, rev = %request.reference, hash = %fetched.tree_hash, "prefetched");

        Ok(PrefetchReport {
            id: id.to_string(),
            reference: request.reference.rev().to_string(),
            path: fetched.path,
            commit: fetched.commit,
            tree_hash: format_hash(&normalize_hash(&fetched.tree_hash)),
        })
    }
}
