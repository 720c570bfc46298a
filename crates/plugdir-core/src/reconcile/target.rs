//! Target version selection.

use serde::Serialize;

use crate::fetch::FetchRef;
use crate::types::{PinnedVersion, VersionInfo, VersionKind};

/// Where a target version was taken from, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionSource {
    Pinned,
    Tag,
    LatestObserved,
    Commit,
}

impl VersionSource {
    /// Highest priority first.
    pub const PRIORITY: [VersionSource; 4] = [
        VersionSource::Pinned,
        VersionSource::Tag,
        VersionSource::LatestObserved,
        VersionSource::Commit,
    ];

    fn select(self, info: &VersionInfo) -> Option<&str> {
        let value = match self {
            VersionSource::Pinned => match &info.pinned {
                PinnedVersion::Version(v) if !is_wildcard(v) => Some(v.as_str()),
                _ => None,
            },
            VersionSource::Tag => info.tag.as_deref(),
            VersionSource::LatestObserved => info.latest.as_deref(),
            VersionSource::Commit => info.commit.as_deref(),
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }
}

/// The version a spec asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetVersion {
    pub source: VersionSource,
    pub value: String,
}

impl TargetVersion {
    /// Git reference for fetching this target.
    ///
    /// A pinned value follows the declared kind; untyped pins and the
    /// latest-observed version are plain revisions.
    pub fn fetch_ref(&self, kind: Option<VersionKind>) -> FetchRef {
        let value = self.value.clone();
        match self.source {
            VersionSource::Pinned => match kind {
                Some(VersionKind::Tag) => FetchRef::Tag(value),
                Some(VersionKind::Commit) => FetchRef::Commit(value),
                Some(VersionKind::Branch) => FetchRef::Branch(value),
                Some(VersionKind::Version) | None => FetchRef::Revision(value),
            },
            VersionSource::Tag => FetchRef::Tag(value),
            VersionSource::Commit => FetchRef::Commit(value),
            VersionSource::LatestObserved => FetchRef::Revision(value),
        }
    }
}

/// Pins that mean "any version".
pub fn is_wildcard(version: &str) -> bool {
    matches!(version.trim(), "" | "*" | "latest")
}

/// First available version source in priority order; `None` means
/// floating/HEAD.
pub fn target_version(info: &VersionInfo) -> Option<TargetVersion> {
    VersionSource::PRIORITY.iter().find_map(|source| {
        source.select(info).map(|value| TargetVersion {
            source: *source,
            value: value.to_string(),
        })
    })
}

/// Branch-tracking and `pinned = false` specs never use the registry.
pub fn forces_fetch(info: &VersionInfo) -> bool {
    info.kind == Some(VersionKind::Branch) || info.pinned == PinnedVersion::NoRelease
}
