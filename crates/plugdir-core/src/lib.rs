//! plugdir core library
//!
//! Resolves a catalog of editor plugins into a deduplicated directory of
//! named links, choosing per plugin between a pre-built registry artifact
//! and a freshly fetched source tree.

pub mod artifact;
pub mod catalog;
pub mod commands;
pub mod engine;
pub mod fetch;
pub mod fs;
pub mod layout;
pub mod lockfile;
pub mod names;
pub mod naming;
pub mod reconcile;
pub mod registry;
pub mod report;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Catalog
    pub use crate::catalog::{CatalogFile, CatalogStore, Settings};
    pub use crate::types::{
        ArtifactRef, PinnedVersion, PluginSpec, Provenance, ProvenanceTag, VersionInfo,
        VersionKind,
    };

    // Naming
    pub use crate::naming::{MappingTable, NameMapping, NameResolver, SpecTarget};

    // Resolution
    pub use crate::artifact::{ArtifactArena, ArtifactId, ResolvedArtifact};
    pub use crate::engine::{Resolution, Resolver};
    pub use crate::reconcile::{Decision, Strategy};
    pub use crate::registry::{Registry, RegistryEntry, RegistrySnapshot};
    pub use crate::report::{Diagnostic, DiagnosticKind, ResolutionReport, SpecReport};

    // Fetching
    pub use crate::fetch::{
        FetchBackend, FetchError, FetchRef, FetchRequest, FetchedSource, SourceFetcher,
    };

    // Layout
    pub use crate::layout::{DevPathLayout, LayoutWriter, LinkEntry};
    pub use crate::lockfile::{Lockfile, LockfileStore};
    pub use crate::names::{NamesFormat, render_link_names};
}
