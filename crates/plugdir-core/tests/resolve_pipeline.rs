mod support;

use std::path::Path;

use plugdir_core::engine::Resolver;
use plugdir_core::fetch::FetchRef;
use plugdir_core::naming::{MappingTable, NameMapping};
use plugdir_core::reconcile::Strategy;
use plugdir_core::registry::RegistrySnapshot;
use plugdir_core::report::DiagnosticKind;
use plugdir_core::types::{PluginSpec, Provenance, VersionInfo, VersionKind};

use support::{FakeFetcher, NoFetch};

fn registry() -> RegistrySnapshot {
    RegistrySnapshot::new()
        .with_entry("foo-widget", Some("v1.0"), "/reg/foo-widget")
        .with_entry("bar", Some("v2.3"), "/reg/bar")
        .with_entry("mini-pkg", Some("2024.1"), "/reg/mini-pkg")
}

fn mini_mappings() -> MappingTable {
    let mut mappings = MappingTable::new();
    mappings.insert(
        "grp/mini.alpha".into(),
        NameMapping::multi_module("mini-pkg", "mini.alpha"),
    );
    mappings.insert(
        "grp/mini.beta".into(),
        NameMapping::multi_module("mini-pkg", "mini.beta"),
    );
    mappings
}

#[test]
fn registry_and_fetched_specs_share_one_layout() {
    let tmp = tempfile::tempdir().expect("tempdir should succeed");
    let fetcher = FakeFetcher::new(tmp.path());
    let mut mappings = MappingTable::new();
    mappings.insert("acme/foo.widget".into(), NameMapping::alias("foo-widget"));

    let specs = vec![
        PluginSpec::new("acme/foo.widget")
            .with_version(VersionInfo::default().pinned("v1.0", VersionKind::Tag)),
        PluginSpec::new("acme/bar")
            .with_version(VersionInfo::default().pinned("main", VersionKind::Branch)),
    ];

    let resolver = Resolver::new(mappings, registry(), &fetcher);
    let resolution = resolver.resolve(&specs);

    let report = &resolution.report.specs;
    assert_eq!(report[0].provenance, Provenance::Registry);
    assert_eq!(report[0].concrete_version.as_deref(), Some("v1.0"));
    assert_eq!(report[1].provenance, Provenance::Fetched);
    assert_eq!(report[1].concrete_version.as_deref(), Some("main"));

    assert_eq!(resolution.link_names(), vec!["foo.widget", "bar"]);
    let bar = resolution.layout.get("bar").expect("bar should be linked");
    assert_eq!(
        bar.reference.path(),
        tmp.path().join("acme").join("bar").join("main")
    );
    assert_eq!(
        resolution.layout.get("foo.widget").map(|e| e.reference.path()),
        Some(Path::new("/reg/foo-widget"))
    );

    // Branch fetches carry no hash
    assert_eq!(
        resolution
            .report
            .diagnostics_of(DiagnosticKind::UnverifiedFetch)
            .count(),
        1
    );
    assert_eq!(fetcher.requests().len(), 1);
}

#[test]
fn multi_module_siblings_link_to_the_same_artifact() {
    let resolver = Resolver::new(mini_mappings(), registry(), NoFetch);
    let resolution = resolver.resolve(&[
        PluginSpec::new("grp/mini.alpha"),
        PluginSpec::new("grp/mini.beta"),
    ]);

    assert_eq!(resolution.link_names(), vec!["mini.alpha", "mini.beta"]);
    let alpha = resolution.layout.get("mini.alpha").expect("alpha linked");
    let beta = resolution.layout.get("mini.beta").expect("beta linked");
    assert_eq!(alpha.artifact, beta.artifact);
    assert_eq!(alpha.reference, beta.reference);
    assert_eq!(resolution.artifacts.len(), 1);
    assert!(resolution.report.diagnostics.is_empty());
}

#[test]
fn sibling_with_other_version_is_flagged() {
    let resolver = Resolver::new(mini_mappings(), registry(), NoFetch);
    let resolution = resolver.resolve(&[
        PluginSpec::new("grp/mini.alpha"),
        PluginSpec::new("grp/mini.beta")
            .with_version(VersionInfo::default().pinned("2023.9", VersionKind::Version)),
    ]);

    assert_eq!(resolution.layout.len(), 2);
    let mismatches: Vec<_> = resolution
        .report
        .diagnostics_of(DiagnosticKind::VersionMismatchFallback)
        .collect();
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].position, 1);
    assert!(resolution.report.specs[1].warning.is_some());
}

#[test]
fn branch_module_fetches_the_whole_package() {
    let tmp = tempfile::tempdir().expect("tempdir should succeed");
    let fetcher = FakeFetcher::new(tmp.path());
    let resolver = Resolver::new(mini_mappings(), registry(), &fetcher);
    let resolution = resolver.resolve(&[
        PluginSpec::new("grp/mini.alpha"),
        PluginSpec::new("grp/mini.beta")
            .with_version(VersionInfo::default().pinned("main", VersionKind::Branch)),
    ]);

    let provenances: Vec<_> = resolution.report.specs.iter().map(|s| s.provenance).collect();
    assert_eq!(provenances, vec![Provenance::Fetched, Provenance::Fetched]);
    assert_eq!(resolution.artifacts.len(), 1);

    let requests = fetcher.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].repo, "mini.beta");
    assert_eq!(requests[0].reference, FetchRef::Branch("main".into()));
    assert_eq!(
        resolution.layout.get("mini.alpha").map(|e| e.reference.path()),
        Some(tmp.path().join("grp").join("mini.beta").join("main").as_path())
    );

    let unverified: Vec<_> = resolution
        .report
        .diagnostics_of(DiagnosticKind::UnverifiedFetch)
        .collect();
    assert_eq!(unverified.len(), 1);
    assert_eq!(unverified[0].position, 1);
}

#[test]
fn hashed_module_rescues_unresolved_package() {
    let tmp = tempfile::tempdir().expect("tempdir should succeed");
    let fetcher = FakeFetcher::new(tmp.path());
    let resolver = Resolver::new(mini_mappings(), RegistrySnapshot::new(), &fetcher);
    let resolution = resolver.resolve(&[
        PluginSpec::new("grp/mini.alpha"),
        PluginSpec::new("grp/mini.beta").with_version(
            VersionInfo::default()
                .pinned("v1", VersionKind::Tag)
                .with_hash("blake3:mini.beta"),
        ),
    ]);

    let provenances: Vec<_> = resolution.report.specs.iter().map(|s| s.provenance).collect();
    assert_eq!(provenances, vec![Provenance::Fetched, Provenance::Fetched]);
    assert_eq!(resolution.report.specs[0].concrete_version.as_deref(), Some("v1"));
    assert_eq!(resolution.link_names(), vec!["mini.alpha", "mini.beta"]);
    assert!(resolution.report.diagnostics.is_empty());

    let requests = fetcher.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].content_hash.as_deref(), Some("blake3:mini.beta"));
}

#[test]
fn unresolved_package_reports_every_module() {
    let resolver = Resolver::new(mini_mappings(), RegistrySnapshot::new(), NoFetch);
    let resolution = resolver.resolve(&[
        PluginSpec::new("grp/mini.alpha"),
        PluginSpec::new("grp/mini.beta")
            .with_version(VersionInfo::default().pinned("v1", VersionKind::Tag)),
    ]);

    assert!(resolution.layout.is_empty());
    let unresolved: Vec<_> = resolution
        .report
        .diagnostics_of(DiagnosticKind::UnresolvedSpec)
        .map(|d| d.position)
        .collect();
    assert_eq!(unresolved, vec![0, 1]);
    assert_eq!(
        resolution
            .report
            .diagnostics_of(DiagnosticKind::VersionMismatchFallback)
            .count(),
        0
    );
}

#[test]
fn empty_identifier_is_reported_not_fatal() {
    let resolver = Resolver::new(MappingTable::new(), registry(), NoFetch);
    let resolution = resolver.resolve(&[PluginSpec::new(""), PluginSpec::new("acme/bar")]);

    assert_eq!(resolution.report.specs.len(), 2);
    assert_eq!(resolution.report.specs[0].link_name, "");
    assert_eq!(
        resolution
            .report
            .diagnostics_of(DiagnosticKind::DegenerateName)
            .count(),
        1
    );
    assert_eq!(
        resolution
            .report
            .diagnostics_of(DiagnosticKind::MalformedIdentifier)
            .count(),
        0
    );
    assert_eq!(resolution.link_names(), vec!["bar"]);
    assert!(resolution.report.has_errors());
}

#[test]
fn link_name_collision_keeps_first_entry() {
    let registry = RegistrySnapshot::new()
        .with_entry("tool", Some("1"), "/reg/tool-a")
        .with_entry("tool_alt", Some("1"), "/reg/tool-b");
    let mut mappings = MappingTable::new();
    mappings.insert("other/tool".into(), NameMapping::alias("tool_alt"));

    let resolver = Resolver::new(mappings, registry, NoFetch);
    let resolution = resolver.resolve(&[PluginSpec::new("acme/tool"), PluginSpec::new("other/tool")]);

    assert_eq!(resolution.layout.len(), 1);
    assert_eq!(
        resolution.layout.get("tool").map(|e| e.reference.path()),
        Some(Path::new("/reg/tool-a"))
    );
    let ambiguous: Vec<_> = resolution
        .report
        .diagnostics_of(DiagnosticKind::AmbiguousLinkName)
        .collect();
    assert_eq!(ambiguous.len(), 1);
    assert_eq!(ambiguous[0].spec_id, "other/tool");
}

#[test]
fn fetch_failure_leaves_other_specs_intact() {
    let tmp = tempfile::tempdir().expect("tempdir should succeed");
    let fetcher = FakeFetcher::new(tmp.path()).failing("broken");

    let resolver = Resolver::new(MappingTable::new(), registry(), &fetcher);
    let resolution = resolver.resolve(&[
        PluginSpec::new("acme/broken").with_version(VersionInfo::default().no_release()),
        PluginSpec::new("acme/bar"),
    ]);

    let summary = resolution.report.summary();
    assert_eq!(summary.unresolved, 1);
    assert_eq!(summary.registry, 1);
    assert_eq!(resolution.link_names(), vec!["bar"]);

    let errors: Vec<_> = resolution
        .report
        .diagnostics_of(DiagnosticKind::FetchError)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("connection refused"));
    // Unverified is only reported for fetches that produced something
    assert_eq!(
        resolution
            .report
            .diagnostics_of(DiagnosticKind::UnverifiedFetch)
            .count(),
        0
    );
}

#[test]
fn freshest_fetches_hashed_spec_on_registry_mismatch() {
    let tmp = tempfile::tempdir().expect("tempdir should succeed");
    let fetcher = FakeFetcher::new(tmp.path());
    let spec = PluginSpec::new("acme/bar").with_version(
        VersionInfo::default()
            .pinned("v2.4", VersionKind::Tag)
            .with_hash("blake3:bar"),
    );

    let resolver =
        Resolver::new(MappingTable::new(), registry(), &fetcher).with_strategy(Strategy::PreferFreshest);
    let resolution = resolver.resolve(std::slice::from_ref(&spec));

    assert_eq!(resolution.report.specs[0].provenance, Provenance::Fetched);
    assert_eq!(resolution.report.specs[0].concrete_version.as_deref(), Some("v2.4"));
    assert!(resolution.report.diagnostics.is_empty());
    assert_eq!(
        fetcher.requests()[0].content_hash.as_deref(),
        Some("blake3:bar")
    );
}

#[test]
fn resolution_is_deterministic() {
    let specs = vec![
        PluginSpec::new("grp/mini.beta"),
        PluginSpec::new("acme/bar"),
        PluginSpec::new("grp/mini.alpha"),
        PluginSpec::new("acme/missing"),
    ];
    let resolver = Resolver::new(mini_mappings(), registry(), NoFetch);

    let first = resolver.resolve(&specs);
    let second = resolver.resolve(&specs);

    assert_eq!(first, second);
    assert_eq!(first.link_names(), vec!["mini.beta", "bar", "mini.alpha"]);
    assert_eq!(
        first
            .report
            .diagnostics_of(DiagnosticKind::UnresolvedSpec)
            .map(|d| d.spec_id.as_str())
            .collect::<Vec<_>>(),
        vec!["acme/missing"]
    );
}
