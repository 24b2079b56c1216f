//! Session identity and lifecycle states for the MCP session runtime.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A freshly generated, opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        SessionId(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The per-session state machine described in the session runtime contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Initialized,
    Serving,
    Closed,
    TimedOut,
}

impl SessionState {
    /// `initialize` is only accepted in `Created`.
    pub fn accepts_initialize(&self) -> bool {
        matches!(self, SessionState::Created)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::TimedOut)
    }
}
