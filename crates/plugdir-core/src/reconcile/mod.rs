//! Version reconciliation: registry artifact, source fetch, or unresolved.
//!
//! [`reconcile`] only decides; it never touches the network or the
//! filesystem. The engine executes [`Decision::Fetch`] plans afterwards.

mod decision;
mod strategy;
mod target;

use crate::fetch::{FetchRef, FetchRequest};
use crate::registry::{Registry, RegistryEntry};
use crate::types::PluginSpec;

pub use decision::{
    Decision, FetchPlan, MismatchFallback, UnresolvedReason, compare_versions,
};
pub use strategy::Strategy;
pub use target::{TargetVersion, VersionSource, forces_fetch, is_wildcard, target_version};

/// Choose where `spec` (looked up as `lookup_key`) comes from.
pub fn reconcile<R: Registry + ?Sized>(
    spec: &PluginSpec,
    lookup_key: &str,
    registry: &R,
    strategy: Strategy,
) -> Decision {
    let target = target_version(&spec.version);
    let forced = forces_fetch(&spec.version);
    let hash = spec.version.content_hash();
    let entry = registry.lookup(lookup_key).filter(|_| !forced);

    let matches = entry.is_some_and(|entry| match &target {
        None => true,
        Some(target) => entry.version.as_deref() == Some(target.value.as_str()),
    });
    let can_fetch = hash.is_some() || forced;

    let unresolved = Decision::Unresolved {
        reason: UnresolvedReason::NoCandidate,
    };

    match (strategy, entry) {
        (Strategy::PreferFreshest, Some(found)) if matches => use_registry(found, None),
        (Strategy::PreferFreshest, _) if can_fetch => plan_fetch(spec, target.as_ref(), hash),
        (Strategy::PreferFreshest, Some(found)) => {
            use_registry(found, mismatch(target.as_ref(), found.version.as_deref()))
        }
        (Strategy::PreferStable, Some(found)) => {
            if matches {
                use_registry(found, None)
            } else if hash.is_some() {
                plan_fetch(spec, target.as_ref(), hash)
            } else {
                use_registry(found, mismatch(target.as_ref(), found.version.as_deref()))
            }
        }
        (Strategy::PreferStable, None) if can_fetch => plan_fetch(spec, target.as_ref(), hash),
        (_, None) => unresolved,
    }
}

fn use_registry(entry: &RegistryEntry, fallback: Option<MismatchFallback>) -> Decision {
    Decision::Registry {
        entry: entry.clone(),
        fallback,
    }
}

fn plan_fetch(spec: &PluginSpec, target: Option<&TargetVersion>, hash: Option<&str>) -> Decision {
    let Some((owner, repo)) = spec.source() else {
        return Decision::Unresolved {
            reason: UnresolvedReason::NoSource,
        };
    };
    let reference = match target {
        Some(target) => target.fetch_ref(spec.version.kind),
        None => FetchRef::Head,
    };
    let mut request = FetchRequest::new(owner, repo, reference);
    if let Some(hash) = hash {
        request = request.with_content_hash(hash.trim());
    }
    Decision::Fetch(FetchPlan::new(request))
}

fn mismatch(target: Option<&TargetVersion>, available: Option<&str>) -> Option<MismatchFallback> {
    target.map(|target| MismatchFallback {
        wanted: target.value.clone(),
        available: available.map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistrySnapshot;
    use crate::types::{VersionInfo, VersionKind};

    fn registry() -> RegistrySnapshot {
        RegistrySnapshot::new()
            .with_entry("foo-widget", Some("v1.0"), "/reg/foo-widget")
            .with_entry("bar", Some("v2.3"), "/reg/bar")
    }

    #[test]
    fn test_stable_uses_matching_registry() {
        let spec = PluginSpec::new("acme/foo.widget")
            .with_version(VersionInfo::default().pinned("v1.0", VersionKind::Version));
        let decision = reconcile(&spec, "foo-widget", &registry(), Strategy::PreferStable);
        assert!(matches!(decision, Decision::Registry { fallback: None, .. }));
    }

    #[test]
    fn test_branch_never_uses_registry() {
        let spec = PluginSpec::new("acme/bar")
            .with_version(VersionInfo::default().pinned("main", VersionKind::Branch));
        for strategy in [Strategy::PreferStable, Strategy::PreferFreshest] {
            let Decision::Fetch(plan) = reconcile(&spec, "bar", &registry(), strategy) else {
                panic!("expected fetch for {}", strategy);
            };
            assert_eq!(plan.request.reference, FetchRef::Branch("main".into()));
            assert!(!plan.is_verified());
        }
    }

    #[test]
    fn test_stable_fetches_verified_pin_on_mismatch() {
        let spec = PluginSpec::new("acme/bar").with_version(
            VersionInfo::default()
                .pinned("v2.4", VersionKind::Tag)
                .with_hash("blake3:abcd"),
        );
        let Decision::Fetch(plan) = reconcile(&spec, "bar", &registry(), Strategy::PreferStable)
        else {
            panic!("expected fetch");
        };
        assert_eq!(plan.request.reference, FetchRef::Tag("v2.4".into()));
        assert_eq!(plan.request.content_hash.as_deref(), Some("blake3:abcd"));
    }

    #[test]
    fn test_stable_falls_back_without_hash() {
        let spec = PluginSpec::new("acme/bar")
            .with_version(VersionInfo::default().pinned("v2.4", VersionKind::Tag));
        let decision = reconcile(&spec, "bar", &registry(), Strategy::PreferStable);
        let Decision::Registry {
            fallback: Some(fallback),
            ..
        } = decision
        else {
            panic!("expected registry fallback");
        };
        assert_eq!(fallback.wanted, "v2.4");
        assert_eq!(fallback.available.as_deref(), Some("v2.3"));
    }

    #[test]
    fn test_stable_ignores_hash_when_registry_matches() {
        let spec = PluginSpec::new("acme/bar").with_version(
            VersionInfo::default()
                .with_tag("v2.3")
                .with_hash("blake3:abcd"),
        );
        let decision = reconcile(&spec, "bar", &registry(), Strategy::PreferStable);
        assert!(decision.is_registry());
    }

    #[test]
    fn test_freshest_fetches_when_hash_available() {
        let spec = PluginSpec::new("acme/bar").with_version(
            VersionInfo::default()
                .with_latest("v2.5")
                .with_hash("blake3:abcd"),
        );
        let Decision::Fetch(plan) = reconcile(&spec, "bar", &registry(), Strategy::PreferFreshest)
        else {
            panic!("expected fetch");
        };
        assert_eq!(plan.request.reference, FetchRef::Revision("v2.5".into()));
    }

    #[test]
    fn test_freshest_falls_back_to_stale_registry() {
        let spec = PluginSpec::new("acme/bar")
            .with_version(VersionInfo::default().with_latest("v2.5"));
        let decision = reconcile(&spec, "bar", &registry(), Strategy::PreferFreshest);
        assert!(matches!(
            decision,
            Decision::Registry {
                fallback: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_floating_spec_matches_any_registry_version() {
        let spec = PluginSpec::new("acme/bar");
        for strategy in [Strategy::PreferStable, Strategy::PreferFreshest] {
            let decision = reconcile(&spec, "bar", &registry(), strategy);
            assert!(matches!(decision, Decision::Registry { fallback: None, .. }));
        }
    }

    #[test]
    fn test_unresolved_without_registry_or_hash() {
        let spec = PluginSpec::new("acme/missing")
            .with_version(VersionInfo::default().pinned("v1", VersionKind::Tag));
        for strategy in [Strategy::PreferStable, Strategy::PreferFreshest] {
            let decision = reconcile(&spec, "missing", &registry(), strategy);
            assert_eq!(
                decision,
                Decision::Unresolved {
                    reason: UnresolvedReason::NoCandidate
                }
            );
        }
    }

    #[test]
    fn test_no_release_fetches_head() {
        let spec = PluginSpec::new("acme/bar").with_version(VersionInfo::default().no_release());
        let Decision::Fetch(plan) = reconcile(&spec, "bar", &registry(), Strategy::PreferStable)
        else {
            panic!("expected fetch");
        };
        assert_eq!(plan.request.reference, FetchRef::Head);
    }

    #[test]
    fn test_forced_fetch_without_source_is_unresolved() {
        let spec = PluginSpec::new("bar")
            .with_version(VersionInfo::default().pinned("main", VersionKind::Branch));
        let decision = reconcile(&spec, "bar", &registry(), Strategy::PreferFreshest);
        assert_eq!(
            decision,
            Decision::Unresolved {
                reason: UnresolvedReason::NoSource
            }
        );
    }
}
