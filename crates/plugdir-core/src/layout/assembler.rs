//! Deduplicating layout assembly.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::artifact::{ArtifactArena, ArtifactId};
use crate::report::{Diagnostic, DiagnosticKind};
use crate::types::ArtifactRef;

/// One requested link, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEntry {
    pub link_name: String,
    pub artifact: ArtifactId,
    /// Catalog position of the spec that asked for this link
    pub position: usize,
    pub spec_id: String,
}

/// A single link in the final layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutEntry {
    pub link_name: String,
    pub artifact: ArtifactId,
    pub reference: ArtifactRef,
}

/// Unique link names mapped to artifacts, in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DevPathLayout {
    entries: Vec<LayoutEntry>,
}

impl DevPathLayout {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, link_name: &str) -> Option<&LayoutEntry> {
        self.entries.iter().find(|e| e.link_name == link_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayoutEntry> {
        self.entries.iter()
    }

    pub fn link_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.link_name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a DevPathLayout {
    type Item = &'a LayoutEntry;
    type IntoIter = std::slice::Iter<'a, LayoutEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    pub layout: DevPathLayout,
    pub diagnostics: Vec<Diagnostic>,
}

/// A link name that can be created as a single directory entry.
pub fn is_valid_link_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Collapse `entries` into one link per name.
///
/// Unresolved artifacts and unusable names are left out. Within a name the
/// first entry in catalog order wins; losers that point at a different
/// artifact are reported as ambiguous.
pub fn assemble(entries: &[LinkEntry], artifacts: &ArtifactArena) -> Assembly {
    let mut diagnostics = Vec::new();
    let mut winners: BTreeMap<&str, (usize, &LinkEntry)> = BTreeMap::new();
    let mut layout = DevPathLayout::default();

    for entry in entries {
        if !is_valid_link_name(&entry.link_name) {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::DegenerateName,
                entry.position,
                &entry.spec_id,
                format!("link name {:?} cannot be used in a layout", entry.link_name),
            ));
            continue;
        }

        let Some(reference) = artifacts
            .get(entry.artifact)
            .filter(|a| a.is_resolved())
            .and_then(|a| a.reference.as_ref())
        else {
            continue;
        };

        match winners.get(entry.link_name.as_str()) {
            Some((slot, winner)) => {
                let kept = &layout.entries[*slot];
                if kept.artifact != entry.artifact && kept.reference != *reference {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::AmbiguousLinkName,
                        entry.position,
                        &entry.spec_id,
                        format!(
                            "link name '{}' is already provided by {}; this entry is ignored",
                            entry.link_name, winner.spec_id
                        ),
                    ));
                }
            }
            None => {
                winners.insert(&entry.link_name, (layout.entries.len(), entry));
                layout.entries.push(LayoutEntry {
                    link_name: entry.link_name.clone(),
                    artifact: entry.artifact,
                    reference: reference.clone(),
                });
            }
        }
    }

    Assembly {
        layout,
        diagnostics,
    }
}
