//! Resolve command implementation.
//!
//! Loads the catalog layers, resolves every plugin against the registry
//! (fetching from source where needed), then writes the link layout and the
//! lockfile.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use crate::catalog::{
    CatalogFile, CatalogStore, DEFAULT_LINK_DIR, LOCKFILE_NAME, default_catalog_path,
    default_state_dir,
};
use crate::engine::{Resolution, Resolver};
use crate::fetch::{DEFAULT_FORGE, FetchBackend, SourceFetcher};
use crate::layout::{LayoutWriter, WriteReport};
use crate::lockfile::{Lockfile, LockfileStore};
use crate::reconcile::Strategy;
use crate::registry::RegistrySnapshot;

/// Options for the resolve command. Anything set here overrides the
/// catalog's `[settings]`.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Catalog layers, lowest precedence first; defaults to `./plugdir.toml`
    pub catalogs: Vec<PathBuf>,
    pub registry: Option<PathBuf>,
    pub strategy: Option<Strategy>,
    pub backend: Option<FetchBackend>,
    pub forge: Option<String>,
    pub link_dir: Option<PathBuf>,
    pub lockfile: Option<PathBuf>,
    pub state_dir: Option<PathBuf>,
    /// Replace non-symlink entries in the link directory
    pub force: bool,
    /// Resolve only; write neither links nor lockfile
    pub dry_run: bool,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalogs.push(path.into());
        self
    }

    pub fn with_registry(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry = Some(path.into());
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_backend(mut self, backend: FetchBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_forge(mut self, forge: impl Into<String>) -> Self {
        self.forge = Some(forge.into());
        self
    }

    pub fn with_link_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.link_dir = Some(dir.into());
        self
    }

    pub fn with_lockfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.lockfile = Some(path.into());
        self
    }

    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = Some(dir.into());
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Settings after layering defaults, catalog and options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSettings {
    pub strategy: Strategy,
    pub backend: FetchBackend,
    pub forge: String,
    pub registry: Option<PathBuf>,
    pub link_dir: PathBuf,
    pub lockfile: PathBuf,
    pub state_dir: PathBuf,
}

/// Result of a resolve run
#[derive(Debug, Clone, Serialize)]
pub struct ResolveReport {
    pub settings: RunSettings,
    pub resolution: Resolution,
    /// `None` on dry runs
    pub layout: Option<WriteReport>,
    pub lockfile_written: bool,
}

#[derive(Debug, Clone)]
pub struct ResolveCommand {
    project_root: PathBuf,
    state_dir: PathBuf,
}

impl ResolveCommand {
    pub fn new(project_root: PathBuf, state_dir: PathBuf) -> Self {
        Self {
            project_root,
            state_dir,
        }
    }

    /// Current directory as project root, platform state directory.
    pub fn with_defaults() -> anyhow::Result<Self> {
        let project_root = std::env::current_dir().context("Failed to get current directory")?;
        Ok(Self::new(project_root, default_state_dir()?))
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Load and merge the catalog layers named by `options`.
    pub fn load_catalog(&self, options: &ResolveOptions) -> anyhow::Result<CatalogFile> {
        let paths = if options.catalogs.is_empty() {
            vec![default_catalog_path(&self.project_root)]
        } else {
            options
                .catalogs
                .iter()
                .map(|p| self.absolute(p))
                .collect()
        };
        CatalogStore::from_paths(paths).load()
    }

    /// Options override the catalog, which overrides the defaults.
    pub fn settings(&self, catalog: &CatalogFile, options: &ResolveOptions) -> RunSettings {
        let settings = &catalog.settings;
        RunSettings {
            strategy: options.strategy.or(settings.strategy).unwrap_or_default(),
            backend: options.backend.or(settings.backend).unwrap_or_default(),
            forge: options
                .forge
                .clone()
                .or_else(|| settings.forge.clone())
                .unwrap_or_else(|| DEFAULT_FORGE.to_string()),
            registry: options
                .registry
                .as_deref()
                .map(|p| self.absolute(p))
                .or_else(|| settings.registry.clone()),
            link_dir: options
                .link_dir
                .as_deref()
                .map(|p| self.absolute(p))
                .or_else(|| settings.link_dir.clone())
                .unwrap_or_else(|| self.project_root.join(DEFAULT_LINK_DIR)),
            lockfile: options
                .lockfile
                .as_deref()
                .map(|p| self.absolute(p))
                .or_else(|| settings.lockfile.clone())
                .unwrap_or_else(|| self.project_root.join(LOCKFILE_NAME)),
            state_dir: options
                .state_dir
                .as_deref()
                .map(|p| self.absolute(p))
                .or_else(|| settings.state_dir.clone())
                .unwrap_or_else(|| self.state_dir.clone()),
        }
    }

    /// Run with the fetch backend the settings select.
    pub fn execute(&self, options: &ResolveOptions) -> anyhow::Result<ResolveReport> {
        let catalog = self.load_catalog(options)?;
        let settings = self.settings(&catalog, options);
        let fetcher = settings
            .backend
            .build(settings.state_dir.clone(), &settings.forge)
            .with_context(|| format!("Failed to set up {} fetcher", settings.backend.as_str()))?;
        self.run(catalog, settings, options, fetcher)
    }

    /// Run with a caller-supplied fetcher.
    pub fn execute_with<F: SourceFetcher>(
        &self,
        options: &ResolveOptions,
        fetcher: F,
    ) -> anyhow::Result<ResolveReport> {
        let catalog = self.load_catalog(options)?;
        let settings = self.settings(&catalog, options);
        self.run(catalog, settings, options, fetcher)
    }

    fn run<F: SourceFetcher>(
        &self,
        catalog: CatalogFile,
        settings: RunSettings,
        options: &ResolveOptions,
        fetcher: F,
    ) -> anyhow::Result<ResolveReport> {
        let registry = match &settings.registry {
            Some(path) => RegistrySnapshot::load(path)?,
            None => RegistrySnapshot::new(),
        };

        let resolver = Resolver::new(catalog.mapping, registry, fetcher)
            .with_strategy(settings.strategy);
        let resolution = resolver.resolve(&catalog.plugins);

        if options.dry_run {
            return Ok(ResolveReport {
                settings,
                resolution,
                layout: None,
                lockfile_written: false,
            });
        }

        let layout = LayoutWriter::new()
            .with_force(options.force)
            .write(&resolution.layout, &settings.link_dir)
            .with_context(|| {
                format!("Failed to write layout to {}", settings.link_dir.display())
            })?;

        let lockfile = Lockfile::from_resolution(&resolution, settings.strategy);
        let lockfile_written = LockfileStore::new(&settings.lockfile).save_if_changed(&lockfile)?;

        Ok(ResolveReport {
            settings,
            resolution,
            layout: Some(layout),
            lockfile_written,
        })
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}
