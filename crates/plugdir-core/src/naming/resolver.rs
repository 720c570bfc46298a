//! Identifier → registry lookup key.

use super::{MappingTable, NameMapping};

/// Split a well-formed `owner/repo` identifier.
///
/// Returns `None` unless there are exactly two non-empty segments.
pub fn parse_identifier(id: &str) -> Option<(&str, &str)> {
    let (owner, repo) = id.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner, repo))
}

/// Trailing segment of an identifier, or the whole string if it is malformed.
pub fn trailing_segment(id: &str) -> &str {
    parse_identifier(id).map(|(_, repo)| repo).unwrap_or(id)
}

/// Registry key derived from an identifier with no mapping entry.
///
/// `-` becomes `_` and `.` becomes `-`, in a single pass.
pub fn automatic_key(id: &str) -> String {
    trailing_segment(id)
        .chars()
        .map(|c| match c {
            '-' => '_',
            '.' => '-',
            c => c,
        })
        .collect()
}

/// Resolves identifiers against a mapping table.
#[derive(Debug, Clone, Copy)]
pub struct NameResolver<'a> {
    mappings: &'a MappingTable,
}

impl<'a> NameResolver<'a> {
    pub fn new(mappings: &'a MappingTable) -> Self {
        Self { mappings }
    }

    pub fn mapping(&self, id: &str) -> Option<&'a NameMapping> {
        self.mappings.get(id)
    }

    /// Registry lookup key for `id`. Never fails.
    pub fn resolve(&self, id: &str) -> String {
        match self.mappings.get(id) {
            Some(mapping) => mapping.lookup_key().to_string(),
            None => automatic_key(id),
        }
    }
}
