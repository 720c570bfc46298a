//! Cache directory staging shared by the fetch backends.
//!
//! Backends build a tree in a hidden sibling of its cache directory and
//! rename it into place, so a cache directory is either absent or complete.

use std::fs;
use std::path::{Path, PathBuf};

use super::FetchError;

/// Whether `dir` exists and holds at least one entry.
pub(super) fn is_populated(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// A fresh hidden sibling of `dest` to build into.
pub(super) fn unique_temp_dir(dest: &Path) -> Result<PathBuf, FetchError> {
    let parent = dest.parent().unwrap_or(dest);
    let base = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    for attempt in 0u32..1000 {
        let candidate = parent.join(format!(".{}.tmp.{}.{}", base, std::process::id(), attempt));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(FetchError::io(
        dest,
        std::io::Error::other("failed to allocate a temp directory"),
    ))
}

/// Build a tree with `fill` in a temp sibling of `dest`, then move it over
/// `dest`. On failure the temp sibling is removed and `dest` is untouched.
pub(super) fn build_into<T>(
    dest: &Path,
    fill: impl FnOnce(&Path) -> Result<T, FetchError>,
) -> Result<T, FetchError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| FetchError::io(parent, e))?;
    }
    let staging = unique_temp_dir(dest)?;
    fs::create_dir_all(&staging).map_err(|e| FetchError::io(&staging, e))?;

    let value = match fill(&staging) {
        Ok(value) => value,
        Err(err) => {
            let _ = fs::remove_dir_all(&staging);
            return Err(err);
        }
    };

    if dest.exists() {
        fs::remove_dir_all(dest).map_err(|e| FetchError::io(dest, e))?;
    }
    fs::rename(&staging, dest).map_err(|e| FetchError::io(dest, e))?;
    Ok(value)
}

#[cfg(unix)]
pub(super) fn create_file_symlink(target: &str, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
pub(super) fn create_file_symlink(target: &str, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(not(any(unix, windows)))]
pub(super) fn create_file_symlink(target: &str, link: &Path) -> std::io::Result<()> {
    fs::write(link, target)
}
