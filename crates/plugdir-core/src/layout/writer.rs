//! Materializes a [`DevPathLayout`] as a directory of symlinks.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use super::DevPathLayout;

#[derive(Debug, Clone)]
pub struct LayoutWriter {
    /// Replace regular files and directories standing where a link goes
    pub force: bool,
    /// Remove symlinks in the directory that are not part of the layout
    pub prune: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub created: Vec<String>,
    pub unchanged: Vec<String>,
    pub removed: Vec<String>,
}

impl WriteReport {
    pub fn changed(&self) -> bool {
        !self.created.is_empty() || !self.removed.is_empty()
    }
}

impl Default for LayoutWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutWriter {
    pub fn new() -> Self {
        Self {
            force: false,
            prune: true,
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    /// Make `dir` contain exactly one symlink per layout entry.
    pub fn write(&self, layout: &DevPathLayout, dir: &Path) -> anyhow::Result<WriteReport> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create layout directory: {}", dir.display()))?;

        let mut report = WriteReport::default();

        for entry in layout {
            let link = dir.join(&entry.link_name);
            let target = entry.reference.path();

            if let Ok(current) = fs::read_link(&link)
                && current == target
            {
                report.unchanged.push(entry.link_name.clone());
                continue;
            }

            self.replace_with_symlink(target, &link)?;
            tracing::debug!(link = %link.display(), target = %target.display(), "linked");
            report.created.push(entry.link_name.clone());
        }

        if self.prune {
            report.removed = prune_stale_links(layout, dir)?;
        }

        Ok(report)
    }

    fn replace_with_symlink(&self, target: &Path, link: &Path) -> anyhow::Result<()> {
        if let Ok(meta) = fs::symlink_metadata(link)
            && !meta.file_type().is_symlink()
        {
            if !self.force {
                anyhow::bail!(
                    "Refusing to replace non-symlink entry: {} (use force to override)",
                    link.display()
                );
            }
            remove_path(link).with_context(|| {
                format!("Failed to remove existing entry: {}", link.display())
            })?;
        }

        let tmp = unique_temp_path(link)?;
        if let Err(err) = create_dir_symlink(target, &tmp) {
            let _ = fs::remove_file(&tmp);
            return Err(anyhow::Error::new(err).context(format!(
                "Failed to create symlink {} -> {}",
                link.display(),
                target.display()
            )));
        }

        // rename replaces an existing symlink in one step
        if let Err(err) = fs::rename(&tmp, link) {
            let _ = fs::remove_file(&tmp);
            return Err(anyhow::Error::new(err).context(format!(
                "Failed to move temp link {} into place at {}",
                tmp.display(),
                link.display()
            )));
        }
        Ok(())
    }
}

fn prune_stale_links(layout: &DevPathLayout, dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut removed = Vec::new();
    let mut entries: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read layout directory: {}", dir.display()))?
        .collect::<Result<_, _>>()
        .with_context(|| format!("Failed to read entry in {}", dir.display()))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        if layout.get(&name).is_some() {
            continue;
        }
        let is_symlink = entry
            .file_type()
            .with_context(|| format!("Failed to stat {}", entry.path().display()))?
            .is_symlink();
        if !is_symlink {
            continue;
        }
        fs::remove_file(entry.path())
            .with_context(|| format!("Failed to remove stale link: {}", entry.path().display()))?;
        tracing::debug!(link = %entry.path().display(), "removed stale link");
        removed.push(name);
    }
    Ok(removed)
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn unique_temp_path(link: &Path) -> anyhow::Result<PathBuf> {
    let parent = link
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Link path has no parent: {}", link.display()))?;
    let base = link
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Link path has no filename: {}", link.display()))?;

    for attempt in 0u32..1000 {
        let name = if attempt == 0 {
            format!(".{}.tmp.{}", base.to_string_lossy(), std::process::id())
        } else {
            format!(
                ".{}.tmp.{}.{}",
                base.to_string_lossy(),
                std::process::id(),
                attempt
            )
        };
        let candidate = parent.join(name);
        if fs::symlink_metadata(&candidate).is_err() {
            return Ok(candidate);
        }
    }

    anyhow::bail!("Failed to allocate a unique temp path for {}", link.display());
}

#[cfg(unix)]
fn create_dir_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_dir_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(not(any(unix, windows)))]
fn create_dir_symlink(_target: &Path, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "Symlinks are not supported on this platform",
    ))
}
