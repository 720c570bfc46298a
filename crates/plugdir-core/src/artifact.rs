//! Resolved artifacts and the per-run arena that owns them.
//!
//! Link entries refer to artifacts by [`ArtifactId`], so every module of a
//! multi-module package points at the very same slot.

use std::ops::Index;

use serde::Serialize;

use crate::fetch::{FetchRequest, FetchedSource};
use crate::registry::RegistryEntry;
use crate::types::{ArtifactRef, Provenance};

/// Stable index of an artifact within one resolution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ArtifactId(usize);

impl ArtifactId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedArtifact {
    /// Registry key (or multi-module package) the artifact was resolved under
    pub lookup_key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<ArtifactRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub concrete_version: Option<String>,

    pub provenance: Provenance,

    /// Commit a fetch resolved to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    /// Tree hash of fetched content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree_hash: Option<String>,
}

impl ResolvedArtifact {
    pub fn from_registry(lookup_key: impl Into<String>, entry: &RegistryEntry) -> Self {
        Self {
            lookup_key: lookup_key.into(),
            reference: Some(entry.reference()),
            concrete_version: entry.version.clone(),
            provenance: Provenance::Registry,
            commit: None,
            tree_hash: None,
        }
    }

    pub fn fetched(
        lookup_key: impl Into<String>,
        request: &FetchRequest,
        source: FetchedSource,
    ) -> Self {
        Self {
            lookup_key: lookup_key.into(),
            reference: Some(ArtifactRef::new(source.path)),
            concrete_version: Some(request.reference.rev().to_string()),
            provenance: Provenance::Fetched,
            commit: source.commit,
            tree_hash: Some(source.tree_hash),
        }
    }

    pub fn unresolved(lookup_key: impl Into<String>) -> Self {
        Self {
            lookup_key: lookup_key.into(),
            reference: None,
            concrete_version: None,
            provenance: Provenance::Unresolved,
            commit: None,
            tree_hash: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.provenance != Provenance::Unresolved && self.reference.is_some()
    }
}

/// Append-only artifact storage for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArtifactArena {
    artifacts: Vec<ResolvedArtifact>,
}

impl ArtifactArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, artifact: ResolvedArtifact) -> ArtifactId {
        self.artifacts.push(artifact);
        ArtifactId(self.artifacts.len() - 1)
    }

    pub fn get(&self, id: ArtifactId) -> Option<&ResolvedArtifact> {
        self.artifacts.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl Index<ArtifactId> for ArtifactArena {
    type Output = ResolvedArtifact;

    fn index(&self, id: ArtifactId) -> &Self::Output {
        &self.artifacts[id.0]
    }
}
