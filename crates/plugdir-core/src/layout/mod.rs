//! Layout assembly and materialization.
//!
//! [`assemble`] turns per-spec link entries into a [`DevPathLayout`] with
//! one entry per link name; [`LayoutWriter`] writes it to disk as symlinks.

mod assembler;
mod writer;

pub use assembler::{
    Assembly, DevPathLayout, LayoutEntry, LinkEntry, assemble, is_valid_link_name,
};
pub use writer::{LayoutWriter, WriteReport};
