//! Lockfile persistence.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use super::types::Lockfile;

#[derive(Debug, Clone)]
pub struct LockfileStore {
    path: PathBuf,
}

impl LockfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the lockfile, or `None` when there is none yet.
    pub fn load(&self) -> anyhow::Result<Option<Lockfile>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read lockfile: {}", self.path.display()))?;
        let lockfile: Lockfile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse lockfile: {}", self.path.display()))?;
        Ok(Some(lockfile))
    }

    /// Write the lockfile atomically (temp file + rename).
    pub fn save(&self, lockfile: &Lockfile) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create lockfile directory: {}", parent.display())
            })?;
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(format!(".{}.tmp", std::process::id()));
        let tmp_path = PathBuf::from(tmp_name);

        // Serialize first to catch errors before touching the disk
        let mut bytes =
            serde_json::to_vec_pretty(lockfile).context("Failed to serialize lockfile")?;
        bytes.push(b'\n');

        fs::write(&tmp_path, bytes)
            .with_context(|| format!("Failed to write tmp lockfile: {}", tmp_path.display()))?;

        // Remove target first on Windows for replace semantics
        if cfg!(windows) && self.path.exists() {
            fs::remove_file(&self.path).with_context(|| {
                format!("Failed to remove existing lockfile: {}", self.path.display())
            })?;
        }
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to rename tmp lockfile: {}", tmp_path.display()))?;

        Ok(())
    }

    /// Save unless the stored lockfile already has the same content.
    ///
    /// Returns whether anything was written.
    pub fn save_if_changed(&self, lockfile: &Lockfile) -> anyhow::Result<bool> {
        if let Some(existing) = self.load()?
            && existing.same_content(lockfile)
        {
            tracing::debug!(path = %self.path.display(), "lockfile unchanged");
            return Ok(false);
        }
        self.save(lockfile)?;
        tracing::info!(path = %self.path.display(), plugins = lockfile.plugins.len(), "lockfile written");
        Ok(true)
    }
}
