//! Session table, per-session lifecycle state machine, and the resumable
//! event store the MCP transports drive.
//!
//! The table follows a get-or-create/touch/remove shape over a
//! `DashMap`-keyed concurrent map, so lookups and idle-sweeping never
//! contend on a single lock.

mod events;
mod sweeper;
mod table;

pub use events::{EventStore, MemoryEventStore};
pub use table::{Session, SessionTable};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No valid session ID or not an initialization request")]
    MissingOrInvalidInit,
    #[error("unknown session: {0}")]
    NotFound(String),
    #[error("session {0} already initialized")]
    AlreadyInitialized(String),
}

impl From<SessionError> for fetchmcp_types::IngestError {
    fn from(err: SessionError) -> Self {
        fetchmcp_types::IngestError::Session { message: err.to_string() }
    }
}

pub use sweeper::{spawn_idle_sweeper, IdleSweeperHandle};
