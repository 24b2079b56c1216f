//! Request-shaping options shared between the scrape pipeline and the
//! tool handlers that front it.

use serde::{Deserialize, Serialize};

/// Controls whether a call persists its result, returns it, or both.
/// `SaveOnly` skips cache lookup and pagination entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultHandling {
    SaveOnly,
    SaveAndReturn,
    ReturnOnly,
}

impl Default for ResultHandling {
    fn default() -> Self {
        ResultHandling::SaveAndReturn
    }
}

impl ResultHandling {
    pub fn skips_cache_lookup(&self) -> bool {
        matches!(self, ResultHandling::SaveOnly)
    }

    pub fn should_persist(&self) -> bool {
        !matches!(self, ResultHandling::ReturnOnly)
    }

    pub fn should_return_content(&self) -> bool {
        !matches!(self, ResultHandling::SaveOnly)
    }
}
