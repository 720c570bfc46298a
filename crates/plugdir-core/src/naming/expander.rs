//! Link names and multi-module detection.

use serde::Serialize;

use super::resolver::{NameResolver, trailing_segment};
use super::{MappingTable, NameMapping};
use crate::types::PluginSpec;

/// What a spec resolves against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SpecTarget {
    Regular { lookup_key: String },
    MultiModule { package: String, module: String },
}

impl SpecTarget {
    pub fn lookup_key(&self) -> &str {
        match self {
            Self::Regular { lookup_key } => lookup_key,
            Self::MultiModule { package, .. } => package,
        }
    }

    pub fn is_multi_module(&self) -> bool {
        matches!(self, Self::MultiModule { .. })
    }
}

/// A spec's link name together with its resolution target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandedSpec {
    pub link_name: String,
    pub target: SpecTarget,
}

/// Link name for a spec.
///
/// Multi-module members use their module name; everything else keeps the
/// repo-style trailing segment of the id, without key substitution.
pub fn link_name(spec: &PluginSpec, mappings: &MappingTable) -> String {
    expand(spec, mappings).link_name
}

pub fn expand(spec: &PluginSpec, mappings: &MappingTable) -> ExpandedSpec {
    let resolver = NameResolver::new(mappings);
    match resolver.mapping(&spec.id) {
        Some(NameMapping::MultiModule { package, module }) => ExpandedSpec {
            link_name: module.clone(),
            target: SpecTarget::MultiModule {
                package: package.clone(),
                module: module.clone(),
            },
        },
        _ => ExpandedSpec {
            link_name: trailing_segment(&spec.id).to_string(),
            target: SpecTarget::Regular {
                lookup_key: resolver.resolve(&spec.id),
            },
        },
    }
}
