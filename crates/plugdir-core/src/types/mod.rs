//! Catalog data model shared by resolution, layout and reporting.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::naming::parse_identifier;

/// How a pinned version string should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionKind {
    Version,
    Tag,
    Commit,
    Branch,
}

/// The `pinned` field of a catalog entry.
///
/// In catalog files this is either a string or the literal `false`, which
/// marks a plugin that has no fixed release and must track its default branch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PinnedVersion {
    #[default]
    Absent,
    /// `pinned = false`
    NoRelease,
    Version(String),
}

impl PinnedVersion {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PinnedRepr {
    Flag(bool),
    Version(String),
}

impl<'de> Deserialize<'de> for PinnedVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match PinnedRepr::deserialize(deserializer)? {
            PinnedRepr::Flag(false) => Self::NoRelease,
            // `pinned = true` carries no version to pin to
            PinnedRepr::Flag(true) => Self::Absent,
            PinnedRepr::Version(v) => Self::Version(v),
        })
    }
}

impl Serialize for PinnedVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Absent => serializer.serialize_none(),
            Self::NoRelease => serializer.serialize_bool(false),
            Self::Version(v) => serializer.serialize_str(v),
        }
    }
}

/// Partial version metadata attached to a catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionInfo {
    #[serde(default, skip_serializing_if = "PinnedVersion::is_absent")]
    pub pinned: PinnedVersion,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<VersionKind>,

    /// Explicit release tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Explicit commit SHA
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    /// Latest version observed upstream by the catalog maintainer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,

    /// Content hash used to verify a fetched source tree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl VersionInfo {
    pub fn pinned(mut self, version: impl Into<String>, kind: VersionKind) -> Self {
        self.pinned = PinnedVersion::Version(version.into());
        self.kind = Some(kind);
        self
    }

    pub fn no_release(mut self) -> Self {
        self.pinned = PinnedVersion::NoRelease;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }

    pub fn with_latest(mut self, latest: impl Into<String>) -> Self {
        self.latest = Some(latest.into());
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// The content hash, if one was given and is non-blank.
    pub fn content_hash(&self) -> Option<&str> {
        self.hash.as_deref().filter(|h| !h.trim().is_empty())
    }
}

/// Which catalog a spec came from. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvenanceTag {
    Core,
    Extra,
    #[default]
    User,
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSpec {
    /// Canonical `owner/repo` identifier
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    #[serde(default)]
    pub version: VersionInfo,

    #[serde(default)]
    pub provenance: ProvenanceTag,
}

impl PluginSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: None,
            repo: None,
            version: VersionInfo::default(),
            provenance: ProvenanceTag::default(),
        }
    }

    pub fn with_version(mut self, version: VersionInfo) -> Self {
        self.version = version;
        self
    }

    pub fn with_source(mut self, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self.repo = Some(repo.into());
        self
    }

    pub fn with_provenance(mut self, provenance: ProvenanceTag) -> Self {
        self.provenance = provenance;
        self
    }

    /// Owner and repository to fetch from.
    ///
    /// Explicit overrides win; missing parts are taken from `id`. Returns
    /// `None` when either part cannot be determined.
    pub fn source(&self) -> Option<(&str, &str)> {
        let parsed = parse_identifier(&self.id);
        let owner = self
            .owner
            .as_deref()
            .or(parsed.map(|(owner, _)| owner))?;
        let repo = self.repo.as_deref().or(parsed.map(|(_, repo)| repo))?;
        if owner.is_empty() || repo.is_empty() {
            return None;
        }
        Some((owner, repo))
    }
}

/// Opaque handle to built plugin content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(PathBuf);

impl ArtifactRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Where a resolved artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Registry,
    Fetched,
    Unresolved,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Registry => "registry",
            Provenance::Fetched => "fetched",
            Provenance::Unresolved => "unresolved",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
