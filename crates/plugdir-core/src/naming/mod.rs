//! Name resolution for catalog identifiers.
//!
//! Turns an `owner/repo` identifier into:
//! - a registry lookup key (aliases, multi-module packages, or the
//!   automatic `-` → `_`, `.` → `-` transformation)
//! - a link name for the assembled layout

mod expander;
mod mapping;
mod resolver;

pub use expander::{ExpandedSpec, SpecTarget, expand, link_name};
pub use mapping::{MappingTable, NameMapping};
pub use resolver::{NameResolver, automatic_key, parse_identifier, trailing_segment};
