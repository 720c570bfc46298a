//! High-level commands for plugdir operations.
//!
//! These wire catalog loading, resolution, layout writing and the lockfile
//! together, and are what the CLI calls.

pub mod prefetch;
pub mod resolve;

pub use prefetch::{PrefetchCommand, PrefetchReport};
pub use resolve::{ResolveCommand, ResolveOptions, ResolveReport, RunSettings};
