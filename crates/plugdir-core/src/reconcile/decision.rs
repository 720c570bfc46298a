use std::cmp::Ordering;

use serde::Serialize;

use crate::fetch::FetchRequest;
use crate::registry::RegistryEntry;

/// Outcome of reconciling one spec, before any fetch runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "kebab-case")]
pub enum Decision {
    /// Use the pre-built registry entry
    Registry {
        entry: RegistryEntry,
        /// Set when the entry does not match the target version
        #[serde(skip_serializing_if = "Option::is_none")]
        fallback: Option<MismatchFallback>,
    },
    /// Fetch from source
    Fetch(FetchPlan),
    /// Nothing can provide this spec
    Unresolved { reason: UnresolvedReason },
}

impl Decision {
    pub fn is_registry(&self) -> bool {
        matches!(self, Decision::Registry { .. })
    }
}

/// A fetch the engine should run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchPlan {
    pub request: FetchRequest,
}

impl FetchPlan {
    pub fn new(request: FetchRequest) -> Self {
        Self { request }
    }

    /// Verified fetches carry a content hash.
    pub fn is_verified(&self) -> bool {
        self.request.content_hash.is_some()
    }
}

/// Registry entry used although it does not match the target version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MismatchFallback {
    pub wanted: String,
    pub available: Option<String>,
}

impl MismatchFallback {
    pub fn message(&self) -> String {
        match &self.available {
            Some(available) => {
                let relation = match compare_versions(available, &self.wanted) {
                    Ordering::Less => "older",
                    Ordering::Greater => "newer",
                    Ordering::Equal => "different",
                };
                format!(
                    "wanted {}, using registry {} ({} build, no verified source to fetch)",
                    self.wanted, available, relation
                )
            }
            None => format!(
                "wanted {}, using unversioned registry build (no verified source to fetch)",
                self.wanted
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnresolvedReason {
    /// No registry entry and no fetch material
    NoCandidate,
    /// A fetch was required but owner/repo could not be determined
    NoSource,
}

impl UnresolvedReason {
    pub fn message(self) -> &'static str {
        match self {
            UnresolvedReason::NoCandidate => "not in registry and no content hash to fetch with",
            UnresolvedReason::NoSource => "fetch required but owner/repo could not be determined",
        }
    }
}

/// Order two version strings: semver when both parse (a leading `v` is
/// ignored), plain string order otherwise.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| semver::Version::parse(v.strip_prefix('v').unwrap_or(v));
    match (parse(a), parse(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}
