//! Override table entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Override for how a catalog identifier maps onto the registry.
///
/// In catalog files an alias is a bare string and a multi-module member is
/// an inline table:
///
/// ```toml
/// [mapping]
/// "acme/foo.widget" = "foo-widget"
/// "grp/mini.alpha" = { package = "mini-pkg", module = "mini.alpha" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NameMapping {
    /// Registry key to use instead of the automatic one
    Alias(String),
    /// One module of a package that ships several
    MultiModule { package: String, module: String },
}

impl NameMapping {
    pub fn alias(key: impl Into<String>) -> Self {
        Self::Alias(key.into())
    }

    pub fn multi_module(package: impl Into<String>, module: impl Into<String>) -> Self {
        Self::MultiModule {
            package: package.into(),
            module: module.into(),
        }
    }

    /// Registry key this mapping points at.
    pub fn lookup_key(&self) -> &str {
        match self {
            Self::Alias(key) => key,
            Self::MultiModule { package, .. } => package,
        }
    }

    pub fn validate(&self, id: &str) -> anyhow::Result<()> {
        match self {
            Self::Alias(key) if key.trim().is_empty() => {
                anyhow::bail!("Mapping for '{}' has an empty alias", id)
            }
            Self::MultiModule { package, module }
                if package.trim().is_empty() || module.trim().is_empty() =>
            {
                anyhow::bail!(
                    "Mapping for '{}' needs both a non-empty package and module",
                    id
                )
            }
            _ => Ok(()),
        }
    }
}

/// Mapping table keyed by canonical identifier.
pub type MappingTable = BTreeMap<String, NameMapping>;
