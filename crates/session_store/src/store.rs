//! Session registry with per-session serialization
//!
//! The map lock is held only to look up or insert a handle. All reads and
//! writes of one session go through that session's own async mutex, so two
//! listeners touching the same `session_id` are serialized while different
//! sessions proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::ContractError;
use tracing::debug;

use crate::session::{FieldChange, Session, SessionField};

/// Shared, lockable session record
pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

/// Registry of live sessions keyed by `session_id`
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle of the live session, creating it if absent
    ///
    /// Creation on first sight is the normal lazy-configure path.
    pub fn get_or_create(&self, session_id: &str) -> SessionHandle {
        let mut map = self.map();
        if let Some(handle) = map.get(session_id) {
            return Arc::clone(handle);
        }
        let handle = Arc::new(tokio::sync::Mutex::new(Session::new(session_id)));
        map.insert(session_id.to_string(), Arc::clone(&handle));
        observability::record_live_sessions(map.len());
        debug!(session_id, "Session created");
        handle
    }

    /// Handle of the live session, if any
    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.map().get(session_id).cloned()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.map().contains_key(session_id)
    }

    /// Write one field under the session lock
    pub async fn set(&self, session_id: &str, field: SessionField) -> FieldChange {
        let handle = self.get_or_create(session_id);
        let mut session = handle.lock().await;
        session.apply(field)
    }

    /// Take a session out of the registry without waiting on its lock
    ///
    /// The next `get_or_create` for this id starts a fresh session. Callers
    /// that lock the returned handle see any in-flight holder finish first.
    pub fn remove(&self, session_id: &str) -> Option<SessionHandle> {
        let mut map = self.map();
        let removed = map.remove(session_id);
        observability::record_live_sessions(map.len());
        removed
    }

    /// Remove a session and mark it retired
    ///
    /// Waits for any in-flight holder of the session lock, then returns the
    /// final record.
    ///
    /// # Errors
    /// `SessionNotFound` if no live session has this id; callers treat it as benign.
    pub async fn delete(&self, session_id: &str) -> Result<Session, ContractError> {
        let Some(handle) = self.remove(session_id) else {
            debug!(session_id, "Delete for unknown session");
            return Err(ContractError::session_not_found(session_id));
        };
        let mut session = handle.lock().await;
        session.retired = true;
        debug!(session_id, pointings = session.pointings.len(), "Session deleted");
        Ok(session.clone())
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// Live session ids, sorted
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.map().keys().cloned().collect();
        ids.sort();
        ids
    }
}
