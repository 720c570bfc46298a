//! File-backed registry snapshot.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;

use super::{Registry, RegistryEntry};

/// Immutable registry contents for one resolution run.
///
/// Loaded from a JSON object keyed by lookup key:
///
/// ```json
/// { "foo-widget": { "version": "v1.0", "path": "/store/foo-widget-v1.0" } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    entries: BTreeMap<String, RegistryEntry>,
}

impl RegistrySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and embedding.
    pub fn with_entry(
        mut self,
        key: impl Into<String>,
        version: Option<&str>,
        path: impl Into<std::path::PathBuf>,
    ) -> Self {
        self.insert(key, RegistryEntry::new(version, path));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: RegistryEntry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Parse snapshot JSON. Relative paths are kept as-is.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let entries: BTreeMap<String, RegistryEntry> =
            serde_json::from_str(json).context("Failed to parse registry snapshot JSON")?;
        Ok(Self { entries })
    }

    /// Load a snapshot file, resolving relative entry paths against the
    /// file's directory.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read registry snapshot: {}", path.display()))?;
        let mut snapshot = Self::from_json(&content)
            .with_context(|| format!("Invalid registry snapshot: {}", path.display()))?;

        if let Some(base) = path.parent() {
            for entry in snapshot.entries.values_mut() {
                if entry.path.is_relative() {
                    entry.path = base.join(&entry.path);
                }
            }
        }

        tracing::debug!(
            path = %path.display(),
            entries = snapshot.len(),
            "loaded registry snapshot"
        );
        Ok(snapshot)
    }
}

impl Registry for RegistrySnapshot {
    fn lookup(&self, key: &str) -> Option<&RegistryEntry> {
        self.entries.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_with_and_without_version() {
        let json = r#"{
            "foo-widget": { "version": "v1.0", "path": "/store/foo" },
            "bare": { "path": "/store/bare" }
        }"#;
        let snapshot = RegistrySnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            snapshot.lookup("foo-widget").unwrap().version.as_deref(),
            Some("v1.0")
        );
        assert_eq!(snapshot.lookup("bare").unwrap().version, None);
        assert!(snapshot.lookup("missing").is_none());
    }

    #[test]
    fn test_from_json_rejects_missing_path() {
        assert!(RegistrySnapshot::from_json(r#"{ "x": { "version": "1" } }"#).is_err());
    }
}
