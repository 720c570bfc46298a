//! Fetch failures.

use std::path::PathBuf;

/// Why a fetch did not produce plugin content.
///
/// Every variant degrades the affected spec to unresolved; none aborts a run.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("No fetchable source for '{id}': owner/repo could not be determined")]
    MissingSource { id: String },

    #[error("Invalid repository URL for {name}: {source}")]
    InvalidUrl {
        name: String,
        #[source]
        source: url::ParseError,
    },

    #[error("git failed for {url}: {message}")]
    Git { url: String, message: String },

    #[error("Could not resolve '{reference}' in {url}: {source}")]
    Reference {
        url: String,
        reference: String,
        #[source]
        source: git2::Error,
    },

    #[error("Download failed for {url}: {message}")]
    Download { url: String, message: String },

    #[error("Invalid archive from {url}: {message}")]
    Archive { url: String, message: String },

    #[error("Content hash mismatch for {name}: expected {expected}, got {actual}")]
    HashMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Failed to hash {}: {message}", path.display())]
    TreeHash { path: PathBuf, message: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn git(url: &str, err: impl std::fmt::Display) -> Self {
        Self::Git {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
