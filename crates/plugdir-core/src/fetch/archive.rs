//! Archive fetcher: downloads forge zip archives and extracts them.
//!
//! Useful where git is unavailable. Archives carry no commit id, so
//! [`FetchedSource::commit`] is always `None` for this backend. Symlink
//! entries are recreated as links so tree hashes match a git export of the
//! same commit, except where the forge drops `export-ignore` paths.

use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};

/// `S_IFMT` and `S_IFLNK` from a zip entry's unix mode
const MODE_TYPE_MASK: u32 = 0o170000;
const MODE_SYMLINK: u32 = 0o120000;

use anyhow::Context;
use url::Url;

use super::staging::{build_into, create_file_symlink, is_populated};
use super::{FetchError, FetchRequest, FetchedSource, RepoLocator, SourceFetcher};
use crate::fs::tree_hash::{hash_matches, hash_tree};

/// Downloads `<forge>/<owner>/<repo>/archive/<rev>.zip` into
/// `<state_dir>/cache/archives/<blake3(url)>`.
#[derive(Debug)]
pub struct ArchiveFetcher {
    cache_dir: PathBuf,
    forge: Url,
    runtime: tokio::runtime::Runtime,
}

impl ArchiveFetcher {
    pub fn new(state_dir: PathBuf, forge: &str) -> anyhow::Result<Self> {
        let forge = RepoLocator::parse_forge(forge)
            .with_context(|| format!("Invalid forge URL: {}", forge))?;
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| anyhow::anyhow!("Failed to create tokio runtime: {}", e))?;
        Ok(Self {
            cache_dir: state_dir.join("cache").join("archives"),
            forge,
            runtime,
        })
    }

    /// Download a file from a URL
    async fn download(url: &str) -> Result<Vec<u8>, FetchError> {
        let download_err = |message: String| FetchError::Download {
            url: url.to_string(),
            message,
        };

        let client = reqwest::Client::builder()
            .user_agent(concat!("plugdir/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| download_err(e.to_string()))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| download_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(download_err(format!("HTTP {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_err(format!("failed to read response body: {}", e)))?;

        Ok(bytes.to_vec())
    }

    /// Extract a zip archive into `dest`, stripping the single top-level
    /// directory forges wrap archives in.
    fn extract(data: &[u8], dest: &Path, url: &str) -> Result<(), FetchError> {
        let archive_err = |message: String| FetchError::Archive {
            url: url.to_string(),
            message,
        };

        std::fs::create_dir_all(dest).map_err(|e| FetchError::io(dest, e))?;

        let cursor = std::io::Cursor::new(data);
        let mut archive =
            zip::ZipArchive::new(cursor).map_err(|e| archive_err(e.to_string()))?;

        let strip_root = common_root(&mut archive);
        // Links are created last so no entry is ever written through one
        let mut links = Vec::new();

        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| archive_err(format!("entry {}: {}", i, e)))?;

            // enclosed_name rejects absolute paths and traversal
            let Some(enclosed) = file.enclosed_name() else {
                continue;
            };
            let relative = match &strip_root {
                Some(root) => enclosed
                    .strip_prefix(root)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| enclosed.clone()),
                None => enclosed,
            };
            if relative.as_os_str().is_empty() {
                continue;
            }
            let outpath = dest.join(&relative);

            if file.is_dir() {
                std::fs::create_dir_all(&outpath).map_err(|e| FetchError::io(&outpath, e))?;
                continue;
            }

            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent).map_err(|e| FetchError::io(parent, e))?;
            }

            let mut buffer = Vec::new();
            file.read_to_end(&mut buffer)
                .map_err(|e| archive_err(format!("{}: {}", file.name(), e)))?;

            let mode = file.unix_mode();
            if mode.is_some_and(|mode| mode & MODE_TYPE_MASK == MODE_SYMLINK) {
                links.push((outpath, String::from_utf8_lossy(&buffer).into_owned()));
                continue;
            }

            let mut outfile =
                std::fs::File::create(&outpath).map_err(|e| FetchError::io(&outpath, e))?;
            outfile
                .write_all(&buffer)
                .map_err(|e| FetchError::io(&outpath, e))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = mode {
                    std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))
                        .ok();
                }
            }
        }

        for (link, target) in links {
            create_file_symlink(&target, &link).map_err(|e| FetchError::io(&link, e))?;
        }

        Ok(())
    }

    /// Make `dest` hold the extracted archive. Fixed references reuse an
    /// existing copy; `download` only runs when there is none.
    fn materialize(
        dest: &Path,
        floating: bool,
        url: &str,
        download: impl FnOnce() -> Result<Vec<u8>, FetchError>,
    ) -> Result<(), FetchError> {
        if !floating && is_populated(dest) {
            tracing::debug!(path = %dest.display(), "reusing extracted archive");
            return Ok(());
        }
        let bytes = download()?;
        build_into(dest, |dir| Self::extract(&bytes, dir, url))
    }

    fn hash_url(url: &str) -> String {
        let hash = blake3::hash(url.as_bytes());
        hash.to_hex()[..32].to_string()
    }
}

impl SourceFetcher for ArchiveFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedSource, FetchError> {
        let locator = RepoLocator::new(&self.forge, &request.owner, &request.repo)?;
        let url = locator.archive_url(request.reference.rev());
        let extract_dir = self.cache_dir.join(Self::hash_url(&url));

        Self::materialize(&extract_dir, request.reference.is_floating(), &url, || {
            tracing::debug!(url = %url, "downloading archive");
            self.runtime.block_on(Self::download(&url))
        })?;

        let tree_hash = hash_tree(&extract_dir).map_err(|e| FetchError::TreeHash {
            path: extract_dir.clone(),
            message: format!("{:#}", e),
        })?;

        if let Some(expected) = request.content_hash.as_deref()
            && !hash_matches(expected, &tree_hash)
        {
            let _ = std::fs::remove_dir_all(&extract_dir);
            return Err(FetchError::HashMismatch {
                name: request.display_name(),
                expected: expected.to_string(),
                actual: tree_hash,
            });
        }

        Ok(FetchedSource {
            path: extract_dir,
            commit: None,
            tree_hash,
        })
    }
}

/// The single top-level directory shared by every entry, if there is one.
fn common_root<R: Read + std::io::Seek>(archive: &mut zip::ZipArchive<R>) -> Option<PathBuf> {
    let mut root: Option<PathBuf> = None;
    for i in 0..archive.len() {
        let file = archive.by_index(i).ok()?;
        let path = file.enclosed_name()?;
        let first = match path.components().next()? {
            Component::Normal(first) => PathBuf::from(first),
            _ => return None,
        };
        // A file at the top level means there is nothing to strip
        if !file.is_dir() && path.components().count() == 1 {
            return None;
        }
        match &root {
            Some(existing) if *existing != first => return None,
            Some(_) => {}
            None => root = Some(first),
        }
    }
    root
}
