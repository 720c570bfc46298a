//! Deterministic tree hashing for fetched plugin sources
//!
//! The tree hash is the content hash catalogs pin (`version.hash`). It is
//! computed over the exported source tree. Both backends recreate symlinks
//! as links, so the same commit hashes alike from git and from an archive
//! unless the forge leaves `export-ignore` paths out of the archive.

use anyhow::Context;
use std::fs;
use std::path::Path;

/// Prefix accepted (and emitted) in catalog hash tokens.
pub const HASH_PREFIX: &str = "blake3:";

/// Compute deterministic tree hash of a directory
///
/// # Algorithm
/// - Recursive traversal, entries sorted by file name
/// - Files: `relative_path || 0x00 || content`
/// - Directories: `relative_path || 0xFF`, then their contents
/// - Symlinks: `relative_path || 0x01 || link_target` (never followed)
/// - `.git` entries are skipped
/// - Output: lowercase hex
pub fn hash_tree(path: &Path) -> anyhow::Result<String> {
    let mut hasher = blake3::Hasher::new();
    hash_dir_recursive(&mut hasher, path, "")?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Normalize a catalog hash token to bare lowercase hex.
pub fn normalize_hash(token: &str) -> String {
    let token = token.trim();
    token
        .strip_prefix(HASH_PREFIX)
        .unwrap_or(token)
        .to_ascii_lowercase()
}

/// Format a tree hash the way catalogs expect it.
pub fn format_hash(hex: &str) -> String {
    format!("{}{}", HASH_PREFIX, hex)
}

/// Compare an expected catalog token with a computed tree hash.
pub fn hash_matches(expected: &str, actual: &str) -> bool {
    normalize_hash(expected) == normalize_hash(actual)
}

// Separator bytes between an entry's path and its payload
const FILE_TAG: u8 = 0x00;
const LINK_TAG: u8 = 0x01;
const DIR_TAG: u8 = 0xFF;

fn hash_dir_recursive(hasher: &mut blake3::Hasher, dir: &Path, base: &str) -> anyhow::Result<()> {
    let mut children = fs::read_dir(dir)
        .and_then(|entries| entries.collect::<std::io::Result<Vec<_>>>())
        .with_context(|| format!("Cannot list {}", dir.display()))?;
    children.sort_by_key(|child| child.file_name());

    for child in children.into_iter().filter(|c| c.file_name() != ".git") {
        let path = child.path();
        let relative = match base {
            "" => child.file_name().to_string_lossy().into_owned(),
            _ => format!("{base}/{}", child.file_name().to_string_lossy()),
        };
        let kind = child
            .file_type()
            .with_context(|| format!("Cannot stat {}", path.display()))?;

        hasher.update(relative.as_bytes());
        if kind.is_symlink() {
            let target =
                fs::read_link(&path).with_context(|| format!("Cannot read link {}", path.display()))?;
            hasher.update(&[LINK_TAG]);
            hasher.update(target.to_string_lossy().as_bytes());
        } else if kind.is_dir() {
            hasher.update(&[DIR_TAG]);
            hash_dir_recursive(hasher, &path, &relative)?;
        } else if kind.is_file() {
            let bytes = fs::read(&path).with_context(|| format!("Cannot read {}", path.display()))?;
            hasher.update(&[FILE_TAG]);
            hasher.update(&bytes);
        } else {
            anyhow::bail!("{} is neither a file, a directory nor a symlink", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create_dir_all should succeed in test temp dirs");
        }
        fs::write(path, content).expect("write should succeed in test temp dirs");
    }

    #[test]
    fn test_empty_directory_hash() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let hash = hash_tree(tmp.path()).expect("hash_tree should succeed");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_deterministic_order() {
        let tmp1 = TempDir::new().expect("tempdir should succeed");
        write_file(&tmp1.path().join("plugin/a.lua"), "a");
        write_file(&tmp1.path().join("doc/b.txt"), "b");

        let tmp2 = TempDir::new().expect("tempdir should succeed");
        write_file(&tmp2.path().join("doc/b.txt"), "b");
        write_file(&tmp2.path().join("plugin/a.lua"), "a");

        assert_eq!(
            hash_tree(tmp1.path()).unwrap(),
            hash_tree(tmp2.path()).unwrap()
        );
    }

    #[test]
    fn test_git_dir_is_ignored() {
        let tmp1 = TempDir::new().expect("tempdir should succeed");
        write_file(&tmp1.path().join("init.lua"), "return {}");

        let tmp2 = TempDir::new().expect("tempdir should succeed");
        write_file(&tmp2.path().join("init.lua"), "return {}");
        write_file(&tmp2.path().join(".git/HEAD"), "ref: refs/heads/main");

        assert_eq!(
            hash_tree(tmp1.path()).unwrap(),
            hash_tree(tmp2.path()).unwrap()
        );
    }

    #[test]
    fn test_hash_changes_with_content() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let file = tmp.path().join("init.lua");
        write_file(&file, "original");
        let hash1 = hash_tree(tmp.path()).unwrap();
        write_file(&file, "modified");
        let hash2 = hash_tree(tmp.path()).unwrap();
        assert_ne!(hash1, hash2);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_hashed_by_target() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        write_file(&tmp.path().join("real.lua"), "x");
        std::os::unix::fs::symlink("real.lua", tmp.path().join("alias.lua")).unwrap();
        let hash1 = hash_tree(tmp.path()).unwrap();

        fs::remove_file(tmp.path().join("alias.lua")).unwrap();
        std::os::unix::fs::symlink("elsewhere.lua", tmp.path().join("alias.lua")).unwrap();
        let hash2 = hash_tree(tmp.path()).unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_hash_token_normalization() {
        assert!(hash_matches("blake3:ABCDEF", "abcdef"));
        assert!(hash_matches(" abcdef ", "blake3:abcdef"));
        assert!(!hash_matches("blake3:abc", "abd"));
        assert_eq!(format_hash("abc"), "blake3:abc");
    }

    #[test]
    fn test_nonexistent_path_fails() {
        assert!(hash_tree(Path::new("/nonexistent/path/that/does/not/exist")).is_err());
    }
}
