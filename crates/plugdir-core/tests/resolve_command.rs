#![cfg(unix)]

mod support;

use std::fs;
use std::path::Path;

use plugdir_core::commands::{ResolveCommand, ResolveOptions};
use plugdir_core::fetch::FetchBackend;
use plugdir_core::lockfile::LockfileStore;
use plugdir_core::reconcile::Strategy;
use plugdir_core::report::DiagnosticKind;
use plugdir_core::types::Provenance;

use support::{FakeFetcher, NoFetch, write_file};

const CATALOG: &str = r#"
[settings]
registry = "registry.json"

[[plugin]]
id = "acme/foo.widget"

[plugin.version]
pinned = "v1.0"
kind = "tag"

[[plugin]]
id = "acme/bar"

[plugin.version]
pinned = "main"
kind = "branch"

[[plugin]]
id = "grp/mini.alpha"

[[plugin]]
id = "grp/mini.beta"

[mapping]
"acme/foo.widget" = "foo-widget"
"grp/mini.alpha" = { package = "mini-pkg", module = "mini.alpha" }
"grp/mini.beta" = { package = "mini-pkg", module = "mini.beta" }
"#;

/// Project with a catalog and a registry whose builds live under `store/`.
fn project(root: &Path) {
    write_file(&root.join("plugdir.toml"), CATALOG);
    write_file(
        &root.join("registry.json"),
        r#"{
  "foo-widget": { "version": "v1.0", "path": "store/foo-widget" },
  "bar": { "version": "v2.3", "path": "store/bar" },
  "mini-pkg": { "version": "2024.1", "path": "store/mini-pkg" }
}"#,
    );
    for name in ["foo-widget", "bar", "mini-pkg"] {
        fs::create_dir_all(root.join("store").join(name))
            .expect("create_dir_all should succeed in test temp dirs");
    }
}

fn command(root: &Path) -> ResolveCommand {
    ResolveCommand::new(root.to_path_buf(), root.join("state"))
}

#[test]
fn resolves_links_and_writes_lockfile() {
    let tmp = tempfile::tempdir().expect("tempdir should succeed");
    let root = tmp.path();
    project(root);
    let fetcher = FakeFetcher::new(root.join("fetched"));

    let report = command(root)
        .execute_with(&ResolveOptions::new(), &fetcher)
        .expect("resolve should succeed");

    assert_eq!(report.settings.strategy, Strategy::PreferStable);
    assert_eq!(report.settings.backend, FetchBackend::Git);
    assert_eq!(report.settings.link_dir, root.join("pack/plugdir/start"));
    assert_eq!(
        report.resolution.link_names(),
        vec!["foo.widget", "bar", "mini.alpha", "mini.beta"]
    );

    let specs = &report.resolution.report.specs;
    assert_eq!(specs[0].provenance, Provenance::Registry);
    assert_eq!(specs[1].provenance, Provenance::Fetched);

    let links = root.join("pack/plugdir/start");
    assert_eq!(
        fs::read_link(links.join("foo.widget")).expect("foo.widget should be a link"),
        root.join("store/foo-widget")
    );
    assert_eq!(
        fs::read_link(links.join("mini.alpha")).expect("mini.alpha should be a link"),
        fs::read_link(links.join("mini.beta")).expect("mini.beta should be a link"),
    );
    assert_eq!(
        fs::read_link(links.join("bar")).expect("bar should be a link"),
        root.join("fetched/acme/bar/main")
    );

    assert!(report.lockfile_written);
    let lockfile = LockfileStore::new(root.join("plugdir.lock"))
        .load()
        .expect("lockfile should load")
        .expect("lockfile should exist");
    assert_eq!(lockfile.plugins.len(), 4);
}

#[test]
fn rerun_changes_nothing() {
    let tmp = tempfile::tempdir().expect("tempdir should succeed");
    let root = tmp.path();
    project(root);
    let fetcher = FakeFetcher::new(root.join("fetched"));
    let cmd = command(root);

    cmd.execute_with(&ResolveOptions::new(), &fetcher)
        .expect("first run should succeed");
    let second = cmd
        .execute_with(&ResolveOptions::new(), &fetcher)
        .expect("second run should succeed");

    let layout = second.layout.expect("layout should be written");
    assert!(!layout.changed());
    assert_eq!(layout.unchanged.len(), 4);
    assert!(!second.lockfile_written);
}

#[test]
fn dry_run_writes_nothing() {
    let tmp = tempfile::tempdir().expect("tempdir should succeed");
    let root = tmp.path();
    project(root);
    let fetcher = FakeFetcher::new(root.join("fetched"));

    let report = command(root)
        .execute_with(&ResolveOptions::new().with_dry_run(true), &fetcher)
        .expect("dry run should succeed");

    assert!(report.layout.is_none());
    assert_eq!(report.resolution.layout.len(), 4);
    assert!(!root.join("pack").exists());
    assert!(!root.join("plugdir.lock").exists());
}

#[test]
fn options_override_catalog_settings() {
    let tmp = tempfile::tempdir().expect("tempdir should succeed");
    let root = tmp.path();
    project(root);
    write_file(&root.join("empty-registry.json"), "{}");

    let options = ResolveOptions::new()
        .with_registry("empty-registry.json")
        .with_strategy(Strategy::PreferFreshest)
        .with_link_dir("out")
        .with_lockfile("out.lock")
        .with_dry_run(true);
    let fetcher = FakeFetcher::new(root.join("fetched"));
    let report = command(root)
        .execute_with(&options, &fetcher)
        .expect("resolve should succeed");

    assert_eq!(report.settings.strategy, Strategy::PreferFreshest);
    assert_eq!(report.settings.link_dir, root.join("out"));
    assert_eq!(report.settings.lockfile, root.join("out.lock"));
    // Only the branch-tracking spec survives an empty registry
    assert_eq!(report.resolution.link_names(), vec!["bar"]);
}

#[test]
fn catalog_layers_from_options() {
    let tmp = tempfile::tempdir().expect("tempdir should succeed");
    let root = tmp.path();
    project(root);
    write_file(
        &root.join("user.toml"),
        "[[plugin]]\nid = \"acme/bar\"\n\n[settings]\nlink_dir = \"user-links\"\n",
    );

    let options = ResolveOptions::new()
        .with_catalog("plugdir.toml")
        .with_catalog("user.toml")
        .with_dry_run(true);
    let fetcher = FakeFetcher::new(root.join("fetched"));
    let report = command(root)
        .execute_with(&options, &fetcher)
        .expect("resolve should succeed");

    assert_eq!(report.settings.link_dir, root.join("user-links"));
    assert_eq!(report.resolution.report.specs.len(), 5);
    assert_eq!(report.resolution.layout.len(), 4);

    // The user layer's registry-backed bar loses to the fetched one
    let ambiguous: Vec<_> = report
        .resolution
        .report
        .diagnostics_of(DiagnosticKind::AmbiguousLinkName)
        .collect();
    assert_eq!(ambiguous.len(), 1);
    assert_eq!(ambiguous[0].position, 4);
}

#[test]
fn missing_registry_file_is_an_error() {
    let tmp = tempfile::tempdir().expect("tempdir should succeed");
    let root = tmp.path();
    write_file(&root.join("plugdir.toml"), "[settings]\nregistry = \"nope.json\"\n");

    let err = command(root)
        .execute_with(&ResolveOptions::new(), NoFetch)
        .expect_err("unreadable registry should fail the run");
    assert!(format!("{:#}", err).contains("nope.json"));
}
