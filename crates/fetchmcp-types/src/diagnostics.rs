//! Diagnostics attached to a fully-failed scrape.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeDiagnostics {
    pub strategies_attempted: Vec<String>,
    pub strategy_errors: HashMap<String, String>,
    pub timing_ms: HashMap<String, u64>,
    pub auth_error: bool,
}

impl ScrapeDiagnostics {
    pub fn record_attempt(&mut self, strategy: &str, elapsed_ms: u64, error: Option<&str>) {
        self.strategies_attempted.push(strategy.to_string());
        self.timing_ms.insert(strategy.to_string(), elapsed_ms);
        if let Some(err) = error {
            self.strategy_errors.insert(strategy.to_string(), err.to_string());
        }
    }
}
