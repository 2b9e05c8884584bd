//! Session-store boundary.
//!
//! The durable store (in-memory, Redis, ...) lives outside this crate; the
//! gateway only requires load-then-save semantics per request. Concurrent
//! requests for the same session identifier resolve last-writer-wins.

use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

use super::UserSession;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session store failure: {0}")]
    Backend(String),
}

/// Load/save access to session records keyed by an opaque identifier.
pub trait SessionStore: Send + Sync {
    /// Load a session record; `Ok(None)` when the identifier is unknown.
    ///
    /// # Errors
    /// Returns `SessionStoreError` when the backend is unreachable.
    fn load(&self, session_id: &str) -> Result<Option<UserSession>, SessionStoreError>;

    /// Persist a session record under the identifier.
    ///
    /// # Errors
    /// Returns `SessionStoreError` when the backend rejects the write.
    fn save(&self, session_id: &str, session: UserSession) -> Result<(), SessionStoreError>;
}

/// Process-local session store used for wiring and tests.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, UserSession>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session under a freshly minted opaque identifier.
    pub fn insert(&self, session: UserSession) -> String {
        let session_id = Uuid::new_v4().simple().to_string();
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(session_id.clone(), session);
        }
        session_id
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, session_id: &str) -> Result<Option<UserSession>, SessionStoreError> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|err| SessionStoreError::Backend(err.to_string()))?;
        Ok(sessions.get(session_id).cloned())
    }

    fn save(&self, session_id: &str, session: UserSession) -> Result<(), SessionStoreError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|err| SessionStoreError::Backend(err.to_string()))?;
        sessions.insert(session_id.to_string(), session);
        Ok(())
    }
}
