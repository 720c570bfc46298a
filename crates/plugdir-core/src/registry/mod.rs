//! Pre-built artifact registry.
//!
//! The registry is a read-only index of already-built plugins keyed by
//! lookup key (see [`crate::naming`]). A run queries it through the
//! [`Registry`] trait; [`RegistrySnapshot`] is the file-backed implementation.

mod snapshot;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::ArtifactRef;

pub use snapshot::RegistrySnapshot;

/// One pre-built plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Version the registry reports for this build
    #[serde(default)]
    pub version: Option<String>,

    /// Location of the built content
    pub path: PathBuf,
}

impl RegistryEntry {
    pub fn new(version: Option<&str>, path: impl Into<PathBuf>) -> Self {
        Self {
            version: version.map(str::to_string),
            path: path.into(),
        }
    }

    pub fn reference(&self) -> ArtifactRef {
        ArtifactRef::new(self.path.clone())
    }
}

/// Read-only registry query interface.
pub trait Registry {
    fn lookup(&self, key: &str) -> Option<&RegistryEntry>;
}

impl<R: Registry + ?Sized> Registry for &R {
    fn lookup(&self, key: &str) -> Option<&RegistryEntry> {
        (**self).lookup(key)
    }
}
