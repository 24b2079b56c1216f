//! Fetch strategy identifiers shared between the registry and the fetchers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the fetcher kinds the cascade picks among.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    Native,
    Enhanced,
}

impl FetchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStrategy::Native => "native",
            FetchStrategy::Enhanced => "enhanced",
        }
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A learned mapping from a URL pattern (`host/a/b/`) to a preferred strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyEntry {
    pub pattern: String,
    pub preferred_strategy: FetchStrategy,
    pub learned_at: chrono::DateTime<chrono::Utc>,
    pub sample_count: u64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Which optimization mode the cascade should favor when no learned
/// strategy applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizeFor {
    Cost,
    Speed,
}
