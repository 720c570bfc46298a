#![allow(dead_code)]

pub mod git;

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use plugdir_core::fetch::{FetchError, FetchRequest, FetchedSource, SourceFetcher};

/// Fetcher that materialises a small directory per request under `root` and
/// records every request it saw.
pub struct FakeFetcher {
    root: PathBuf,
    failing: Vec<String>,
    requests: RefCell<Vec<FetchRequest>>,
}

impl FakeFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            failing: Vec::new(),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Fail every request for `repo`.
    pub fn failing(mut self, repo: &str) -> Self {
        self.failing.push(repo.to_string());
        self
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.borrow().clone()
    }
}

impl SourceFetcher for FakeFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedSource, FetchError> {
        self.requests.borrow_mut().push(request.clone());

        if self.failing.contains(&request.repo) {
            return Err(FetchError::Download {
                url: request.display_name(),
                message: "connection refused".into(),
            });
        }

        let path = self
            .root
            .join(&request.owner)
            .join(&request.repo)
            .join(request.reference.rev());
        fs::create_dir_all(&path).map_err(|source| FetchError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(FetchedSource {
            path,
            commit: Some(format!("commit-{}", request.reference.rev())),
            tree_hash: format!("blake3:{}", request.repo),
        })
    }
}

/// Fetcher for runs that must never reach the network.
pub struct NoFetch;

impl SourceFetcher for NoFetch {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedSource, FetchError> {
        panic!("unexpected fetch of {}", request.display_name());
    }
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create_dir_all should succeed in test temp dirs");
    }
    fs::write(path, content).expect("write should succeed in test temp dirs");
}
