//! Process-wide session registry
//!
//! Keyed by agent id. Creation is first-writer-wins: a second create for a
//! live id is rejected without touching the existing session. Removal is
//! idempotent; a removed session's in-flight work may keep running, but its
//! events land on a detached emitter and vanish.

use crate::session::agent::AgentSession;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<AgentSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session under its id.
    ///
    /// Returns false (leaving the existing entry untouched) when the id is
    /// already live.
    pub fn create_session(&self, session: Arc<AgentSession>) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        if sessions.contains_key(session.id()) {
            tracing::warn!(session = %session.id(), "Session already exists");
            return false;
        }
        sessions.insert(session.id().to_string(), session);
        true
    }

    pub fn get_session(&self, id: &str) -> Option<Arc<AgentSession>> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    /// Remove a session; always succeeds, whether or not the id was live
    pub fn remove_session(&self, id: &str) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
        if let Some(session) = removed {
            session.cancel();
            tracing::info!(session = %id, "Session removed");
        }
        true
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
