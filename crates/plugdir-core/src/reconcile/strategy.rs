use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How to weigh the registry against fresh fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Use the registry whenever it has the plugin; fetch only to honour a
    /// verifiable pin the registry does not match.
    #[default]
    PreferStable,
    /// Use the registry only when it matches the target version exactly.
    PreferFreshest,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::PreferStable => "prefer-stable",
            Strategy::PreferFreshest => "prefer-freshest",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "prefer-stable" | "stable" => Ok(Strategy::PreferStable),
            "prefer-freshest" | "freshest" | "fresh" => Ok(Strategy::PreferFreshest),
            _ => anyhow::bail!(
                "Unknown strategy: {}. Use 'prefer-stable' or 'prefer-freshest'",
                s
            ),
        }
    }
}
