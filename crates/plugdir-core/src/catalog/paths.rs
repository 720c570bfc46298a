//! Default locations.

use std::path::{Path, PathBuf};

pub const CATALOG_FILE_NAME: &str = "plugdir.toml";
pub const LOCKFILE_NAME: &str = "plugdir.lock";
pub const DEFAULT_LINK_DIR: &str = "pack/plugdir/start";

/// `plugdir.toml` in the given directory.
pub fn default_catalog_path(dir: &Path) -> PathBuf {
    dir.join(CATALOG_FILE_NAME)
}

/// Where fetch caches live.
///
/// # Returns
/// - Unix: `$XDG_STATE_HOME/plugdir` or `~/.local/state/plugdir`
/// - Windows: `%LOCALAPPDATA%\plugdir`
pub fn default_state_dir() -> anyhow::Result<PathBuf> {
    let base = if cfg!(unix) {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .ok_or_else(|| anyhow::anyhow!("Cannot determine state directory"))?
    } else {
        dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot determine local app data directory"))?
    };
    Ok(base.join("plugdir"))
}
