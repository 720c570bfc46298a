//! Filesystem primitives shared across features.

pub mod tree_hash;

pub use tree_hash::{format_hash, hash_matches, hash_tree, normalize_hash};
