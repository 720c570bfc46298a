//! Catalog loading: `plugdir.toml` files holding plugin specs, identifier
//! mappings and settings.
//!
//! Several catalogs (core, extras, user) can be layered; see
//! [`merge_catalogs`] for the rules.

mod merge;
mod parser;
mod paths;
mod schema;
mod store;

pub use merge::{merge_catalog, merge_catalogs};
pub use parser::{parse_catalog, parse_catalog_str, to_toml};
pub use paths::{
    CATALOG_FILE_NAME, DEFAULT_LINK_DIR, LOCKFILE_NAME, default_catalog_path, default_state_dir,
};
pub use schema::{CatalogFile, Settings};
pub use store::CatalogStore;
