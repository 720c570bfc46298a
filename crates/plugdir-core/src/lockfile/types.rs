//! Lockfile types for the resolved layout.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::Resolution;
use crate::reconcile::Strategy;
use crate::types::Provenance;

pub const LOCKFILE_VERSION: u32 = 1;

/// What the last run linked, and from where
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockfile {
    /// Lockfile format version
    pub version: u32,

    /// Timestamp when lockfile was generated
    pub generated_at: chrono::DateTime<chrono::Utc>,

    pub strategy: Strategy,

    /// One record per link, in layout order
    #[serde(default)]
    pub plugins: Vec<LockedPlugin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedPlugin {
    pub link_name: String,

    /// Catalog identifier that won the link name
    pub id: String,

    pub provenance: Provenance,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_hash: Option<String>,

    pub path: PathBuf,
}

impl Lockfile {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            version: LOCKFILE_VERSION,
            generated_at: chrono::Utc::now(),
            strategy,
            plugins: Vec::new(),
        }
    }

    /// Snapshot the layout of a finished run.
    pub fn from_resolution(resolution: &Resolution, strategy: Strategy) -> Self {
        let mut lockfile = Self::new(strategy);
        for entry in &resolution.layout {
            let artifact = &resolution.artifacts[entry.artifact];
            let id = resolution
                .entries
                .iter()
                .find(|e| e.link_name == entry.link_name && e.artifact == entry.artifact)
                .map(|e| e.spec_id.clone())
                .unwrap_or_default();
            lockfile.plugins.push(LockedPlugin {
                link_name: entry.link_name.clone(),
                id,
                provenance: artifact.provenance,
                version: artifact.concrete_version.clone(),
                commit: artifact.commit.clone(),
                tree_hash: artifact.tree_hash.clone(),
                path: entry.reference.path().to_path_buf(),
            });
        }
        lockfile
    }

    /// Equal apart from the generation timestamp.
    pub fn same_content(&self, other: &Lockfile) -> bool {
        self.version == other.version
            && self.strategy == other.strategy
            && self.plugins == other.plugins
    }

    pub fn get(&self, link_name: &str) -> Option<&LockedPlugin> {
        self.plugins.iter().find(|p| p.link_name == link_name)
    }
}
