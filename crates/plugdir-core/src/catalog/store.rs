//! Loads and merges catalog files.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{CatalogFile, merge::merge_catalog, parser};

#[derive(Debug, Clone)]
pub struct CatalogStore {
    paths: Vec<PathBuf>,
}

impl CatalogStore {
    /// Catalog layers, lowest precedence first.
    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Load every layer and merge them.
    ///
    /// Missing files count as empty layers. Relative paths in each file's
    /// settings are resolved against that file's directory before merging.
    pub fn load(&self) -> anyhow::Result<CatalogFile> {
        let mut merged = CatalogFile::new();
        for path in &self.paths {
            if !path.exists() {
                tracing::debug!(path = %path.display(), "catalog not found, skipping");
                continue;
            }
            let mut layer = parser::parse_catalog(path)?;
            layer.settings.resolve_paths(catalog_dir(path));
            tracing::debug!(
                path = %path.display(),
                plugins = layer.plugins.len(),
                mappings = layer.mapping.len(),
                "loaded catalog"
            );
            merge_catalog(&mut merged, layer);
        }
        Ok(merged)
    }

    /// Write `catalog` to the highest-precedence layer.
    pub fn save(&self, catalog: &CatalogFile) -> anyhow::Result<()> {
        let path = self
            .paths
            .last()
            .ok_or_else(|| anyhow::anyhow!("No catalog path configured"))?;
        let content = parser::to_toml(catalog)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create catalog directory: {}", parent.display())
            })?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write catalog file: {}", path.display()))?;
        Ok(())
    }
}

fn catalog_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
