//! Git fetcher: bare clone per repository, tree export per commit.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use anyhow::Context;
use git2::{ObjectType, Oid, Repository};
use url::Url;

use super::staging::{build_into, create_file_symlink, is_populated};
use super::{FetchError, FetchRef, FetchRequest, FetchedSource, RepoLocator, SourceFetcher};
use crate::fs::tree_hash::{hash_matches, hash_tree};

const FILEMODE_EXECUTABLE: i32 = 0o100755;
const FILEMODE_LINK: i32 = 0o120000;

/// Outcome of the git version check, run once per process.
static GIT_CHECK: OnceLock<Result<(), String>> = OnceLock::new();

/// Fetches plugin sources with the git CLI and exports trees with libgit2.
///
/// Layout under `state_dir`:
/// - `git/<blake3(url)>.git`: bare clone, reused across runs
/// - `cache/plugins/<owner>/<repo>/<commit>`: exported tree, immutable
#[derive(Debug)]
pub struct GitFetcher {
    state_dir: PathBuf,
    forge: Url,
}

impl GitFetcher {
    pub fn new(state_dir: PathBuf, forge: &str) -> anyhow::Result<Self> {
        let forge = RepoLocator::parse_forge(forge)
            .with_context(|| format!("Invalid forge URL: {}", forge))?;
        Ok(Self { state_dir, forge })
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Ensure git is installed and at least 2.25.
    pub fn ensure_git_version() -> anyhow::Result<()> {
        let output = Command::new("git")
            .arg("--version")
            .output()
            .context("Failed to invoke git --version")?;
        if !output.status.success() {
            anyhow::bail!("Failed to run git --version");
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = stdout
            .split_whitespace()
            .nth(2)
            .ok_or_else(|| anyhow::anyhow!("Unexpected git version output: {}", stdout))?;
        let mut parts = version.split('.');
        let major: u32 = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("Invalid git version: {}", version))?
            .parse()?;
        let minor: u32 = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("Invalid git version: {}", version))?
            .parse()?;
        if major > 2 || (major == 2 && minor >= 25) {
            return Ok(());
        }
        anyhow::bail!("Git 2.25+ is required. Please upgrade git.");
    }

    /// Clone the bare repository if needed. Returns whether it was just cloned.
    fn ensure_bare_repo(&self, locator: &RepoLocator) -> Result<(PathBuf, bool), FetchError> {
        let bare_dir = locator.bare_repo_dir(&self.state_dir);
        if bare_dir.exists() {
            return Ok((bare_dir, false));
        }

        let parent = bare_dir
            .parent()
            .ok_or_else(|| FetchError::git(locator.repo_url(), "bare repo directory has no parent"))?;
        fs::create_dir_all(parent).map_err(|e| FetchError::io(parent, e))?;

        let bare_str = bare_dir.to_string_lossy().to_string();
        tracing::debug!(url = locator.repo_url(), "cloning bare repository");
        Self::run_git(None, &["clone", "--bare", "--quiet", locator.repo_url(), &bare_str])
            .map_err(|e| {
                let _ = fs::remove_dir_all(&bare_dir);
                FetchError::git(locator.repo_url(), format!("{:#}", e))
            })?;

        Ok((bare_dir, true))
    }

    /// Resolve a reference to a commit SHA.
    ///
    /// Fixed references are looked up locally first. Floating references are
    /// refreshed from the remote unless the clone is brand new.
    fn resolve_commit(
        &self,
        bare_dir: &Path,
        locator: &RepoLocator,
        reference: &FetchRef,
        fresh_clone: bool,
    ) -> Result<String, FetchError> {
        let rev = reference.rev();

        if fresh_clone || !reference.is_floating() {
            if let Ok(commit) = Self::local_commit(bare_dir, rev) {
                return Ok(commit);
            }
        }

        Self::run_git(Some(bare_dir), &["fetch", "--quiet", "origin", rev])
            .map_err(|e| FetchError::git(locator.repo_url(), format!("{:#}", e)))?;
        let fetched = Self::git_rev_parse(Some(bare_dir), "FETCH_HEAD")
            .map_err(|e| FetchError::git(locator.repo_url(), format!("{:#}", e)))?;

        // FETCH_HEAD may name an annotated tag; peel it
        Self::local_commit(bare_dir, &fetched).map_err(|source| FetchError::Reference {
            url: locator.repo_url().to_string(),
            reference: rev.to_string(),
            source,
        })
    }

    fn local_commit(bare_dir: &Path, rev: &str) -> Result<String, git2::Error> {
        let repo = Repository::open_bare(bare_dir)?;
        let object = repo.revparse_single(rev)?;
        let commit = object.peel_to_commit()?;
        Ok(commit.id().to_string())
    }

    /// Write the tree of `commit` into `dest`.
    fn export_commit(
        &self,
        bare_dir: &Path,
        dest: &Path,
        commit: &str,
        locator: &RepoLocator,
    ) -> Result<(), FetchError> {
        let git_err = |e: git2::Error| FetchError::git(locator.repo_url(), e.message());

        let repo = Repository::open_bare(bare_dir).map_err(git_err)?;
        let oid = Oid::from_str(commit).map_err(git_err)?;
        let tree = repo
            .find_commit(oid)
            .and_then(|c| c.tree())
            .map_err(git_err)?;

        build_into(dest, |dir| write_tree(&repo, &tree, dir, locator))
    }

    /// Run a git command.
    fn run_git(cwd: Option<&Path>, args: &[&str]) -> anyhow::Result<()> {
        let mut cmd = Command::new("git");
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let output = cmd
            .output()
            .with_context(|| format!("Failed to run git {:?}", args))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Git command failed {:?}: {}", args, stderr.trim());
        }
        Ok(())
    }

    /// Run git rev-parse and return the result.
    fn git_rev_parse(cwd: Option<&Path>, rev: &str) -> anyhow::Result<String> {
        let mut cmd = Command::new("git");
        cmd.args(["rev-parse", rev]);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let output = cmd
            .output()
            .with_context(|| format!("Failed to run git rev-parse {}", rev))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("git rev-parse {} failed: {}", rev, stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl SourceFetcher for GitFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedSource, FetchError> {
        check_git()?;

        let locator = RepoLocator::new(&self.forge, &request.owner, &request.repo)?;
        let (bare_dir, fresh_clone) = self.ensure_bare_repo(&locator)?;
        let commit = self.resolve_commit(&bare_dir, &locator, &request.reference, fresh_clone)?;

        let checkout = locator.checkout_dir(&self.state_dir, &commit);
        if is_populated(&checkout) {
            tracing::debug!(path = %checkout.display(), "reusing exported tree");
        } else {
            self.export_commit(&bare_dir, &checkout, &commit, &locator)?;
        }

        let tree_hash = hash_tree(&checkout).map_err(|e| FetchError::TreeHash {
            path: checkout.clone(),
            message: format!("{:#}", e),
        })?;

        if let Some(expected) = request.content_hash.as_deref()
            && !hash_matches(expected, &tree_hash)
        {
            let _ = fs::remove_dir_all(&checkout);
            return Err(FetchError::HashMismatch {
                name: request.display_name(),
                expected: expected.to_string(),
                actual: tree_hash,
            });
        }

        Ok(FetchedSource {
            path: checkout,
            commit: Some(commit),
            tree_hash,
        })
    }
}

fn write_tree(
    repo: &Repository,
    tree: &git2::Tree<'_>,
    dir: &Path,
    locator: &RepoLocator,
) -> Result<(), FetchError> {
    let git_err = |e: git2::Error| FetchError::git(locator.repo_url(), e.message());

    for entry in tree.iter() {
        let Some(name) = entry.name() else {
            tracing::warn!(repo = locator.repo_url(), "skipping non UTF-8 tree entry");
            continue;
        };
        let path = dir.join(name);

        match entry.kind() {
            Some(ObjectType::Tree) => {
                fs::create_dir_all(&path).map_err(|e| FetchError::io(&path, e))?;
                let subtree = repo.find_tree(entry.id()).map_err(git_err)?;
                write_tree(repo, &subtree, &path, locator)?;
            }
            Some(ObjectType::Blob) => {
                let blob = repo.find_blob(entry.id()).map_err(git_err)?;
                if entry.filemode() == FILEMODE_LINK {
                    let target = String::from_utf8_lossy(blob.content()).to_string();
                    create_file_symlink(&target, &path).map_err(|e| FetchError::io(&path, e))?;
                } else {
                    fs::write(&path, blob.content()).map_err(|e| FetchError::io(&path, e))?;
                    if entry.filemode() == FILEMODE_EXECUTABLE {
                        mark_executable(&path).map_err(|e| FetchError::io(&path, e))?;
                    }
                }
            }
            // Submodule commits are not part of the plugin tree
            _ => {}
        }
    }
    Ok(())
}

fn check_git() -> Result<(), FetchError> {
    GIT_CHECK
        .get_or_init(|| GitFetcher::ensure_git_version().map_err(|e| format!("{:#}", e)))
        .clone()
        .map_err(|message| FetchError::git("git", message))
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
