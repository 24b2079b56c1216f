//! The session table: `{session_id -> handler}`, where the handler here
//! is the lifecycle state machine and activity clock a transport drives.
//! Actual JSON-RPC dispatch lives above this crate; a `Session` only
//! tracks identity, state, and idle-ness.

use crate::SessionError;
use fetchmcp_types::session::{SessionId, SessionState};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn now_nanos() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos() as u64
}

pub struct Session {
    pub id: SessionId,
    pub created_at_nanos: u64,
    last_activity_nanos: AtomicU64,
    state: RwLock<SessionState>,
}

impl Session {
    fn new(id: SessionId) -> Self {
        let now = now_nanos();
        Self { id, created_at_nanos: now, last_activity_nanos: AtomicU64::new(now), state: RwLock::new(SessionState::Created) }
    }

    pub fn state(&self) -> SessionState {
        *self.state.read().unwrap()
    }

    pub fn last_activity_nanos(&self) -> u64 {
        self.last_activity_nanos.load(Ordering::SeqCst)
    }

    pub fn touch(&self) {
        self.last_activity_nanos.store(now_nanos(), Ordering::SeqCst);
    }

    /// `initialize` is only valid in `Created`.
    pub fn mark_initialized(&self) -> Result<(), SessionError> {
        let mut state = self.state.write().unwrap();
        if !state.accepts_initialize() {
            return Err(SessionError::AlreadyInitialized(self.id.to_string()));
        }
        *state = SessionState::Initialized;
        self.touch();
        Ok(())
    }

    /// `notifications/initialized` moves the session to `serving`.
    pub fn mark_serving(&self) {
        *self.state.write().unwrap() = SessionState::Serving;
        self.touch();
    }

    pub fn mark_closed(&self) {
        *self.state.write().unwrap() = SessionState::Closed;
    }

    fn mark_timed_out(&self) {
        *self.state.write().unwrap() = SessionState::TimedOut;
    }
}

/// Concurrent `{session_id -> Session}` map plus the idle-timeout policy
/// the background sweeper enforces.
pub struct SessionTable {
    sessions: DashMap<SessionId, std::sync::Arc<Session>>,
    idle_timeout: Duration,
}

impl SessionTable {
    pub fn new(idle_timeout: Duration) -> Self {
        Self { sessions: DashMap::new(), idle_timeout }
    }

    /// Mints a fresh session id in `created` state and inserts it.
    pub fn create(&self) -> std::sync::Arc<Session> {
        let session = std::sync::Arc::new(Session::new(SessionId::generate()));
        self.sessions.insert(session.id.clone(), session.clone());
        session
    }

    pub fn get(&self, id: &SessionId) -> Result<std::sync::Arc<Session>, SessionError> {
        self.sessions.get(id).map(|s| s.clone()).ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Removes and closes a session, mirroring an explicit DELETE.
    pub fn close(&self, id: &SessionId) -> Option<std::sync::Arc<Session>> {
        let removed = self.sessions.remove(id).map(|(_, s)| s);
        if let Some(session) = &removed {
            session.mark_closed();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Removes every session idle past the configured timeout, marking
    /// each `timed_out` before eviction, and returns their ids so the
    /// caller can free any associated event-store state.
    pub fn sweep_idle(&self) -> Vec<SessionId> {
        let now = now_nanos();
        let timeout_nanos = self.idle_timeout.as_nanos() as u64;
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| now.saturating_sub(entry.value().last_activity_nanos()) > timeout_nanos)
            .map(|entry| entry.key().clone())
            .collect();

        for id in &expired {
            if let Some((_, session)) = self.sessions.remove(id) {
                session.mark_timed_out();
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_starts_in_created_state() {
        let table = SessionTable::new(Duration::from_secs(1800));
        let session = table.create();
        assert_eq!(session.state(), SessionState::Created);
    }

    #[test]
    fn initialize_twice_is_rejected() {
        let table = SessionTable::new(Duration::from_secs(1800));
        let session = table.create();
        session.mark_initialized().unwrap();
        assert!(matches!(session.mark_initialized(), Err(SessionError::AlreadyInitialized(_))));
    }

    #[test]
    fn get_unknown_session_errors() {
        let table = SessionTable::new(Duration::from_secs(1800));
        assert!(matches!(table.get(&SessionId::generate()), Err(SessionError::NotFound(_))));
    }

    #[test]
    fn close_removes_and_marks_closed() {
        let table = SessionTable::new(Duration::from_secs(1800));
        let session = table.create();
        let id = session.id.clone();
        let closed = table.close(&id).unwrap();
        assert_eq!(closed.state(), SessionState::Closed);
        assert!(table.get(&id).is_err());
    }

    #[test]
    fn sweep_idle_evicts_only_past_timeout() {
        let table = SessionTable::new(Duration::from_nanos(1));
        let session = table.create();
        session.last_activity_nanos.store(0, Ordering::SeqCst);

        let swept = table.sweep_idle();
        assert_eq!(swept, vec![session.id.clone()]);
        assert!(table.is_empty());
    }

    #[test]
    fn sweep_idle_leaves_active_sessions() {
        let table = SessionTable::new(Duration::from_secs(1800));
        table.create();
        assert!(table.sweep_idle().is_empty());
        assert_eq!(table.len(), 1);
    }
}
