//! `plugdir.toml` schema.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::fetch::{FetchBackend, RepoLocator};
use crate::naming::MappingTable;
use crate::reconcile::Strategy;
use crate::types::PluginSpec;

/// One catalog file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    #[serde(default)]
    pub settings: Settings,

    /// Plugin specs in catalog order
    #[serde(default, rename = "plugin", skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<PluginSpec>,

    /// Identifier overrides
    #[serde(default, skip_serializing_if = "MappingTable::is_empty")]
    pub mapping: MappingTable,
}

/// `[settings]`; every field is optional so layers can override selectively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<FetchBackend>,

    /// Base URL repositories are fetched from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forge: Option<String>,

    /// Registry snapshot (JSON)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<PathBuf>,

    /// Directory the layout is written to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lockfile: Option<PathBuf>,

    /// Fetch caches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
}

impl CatalogFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (id, mapping) in &self.mapping {
            mapping.validate(id)?;
        }

        if let Some(forge) = &self.settings.forge {
            RepoLocator::parse_forge(forge)
                .with_context(|| format!("Invalid forge URL in settings: '{}'", forge))?;
        }

        Ok(())
    }
}

impl Settings {
    /// Apply every field `layer` sets on top of `self`.
    pub fn overlay(&mut self, layer: Settings) {
        let Settings {
            strategy,
            backend,
            forge,
            registry,
            link_dir,
            lockfile,
            state_dir,
        } = layer;
        self.strategy = strategy.or(self.strategy);
        self.backend = backend.or(self.backend);
        self.forge = forge.or(self.forge.take());
        self.registry = registry.or(self.registry.take());
        self.link_dir = link_dir.or(self.link_dir.take());
        self.lockfile = lockfile.or(self.lockfile.take());
        self.state_dir = state_dir.or(self.state_dir.take());
    }

    /// Make relative paths relative to `base` (the catalog's directory).
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.registry,
            &mut self.link_dir,
            &mut self.lockfile,
            &mut self.state_dir,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}
