//! Session Management
//!
//! One session per WebSocket connection: a fresh conversation context bound
//! to the selected persona. Sessions have no idle expiry; they live until
//! the client disconnects or the server shuts down.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use datavoice_core::{AgentProfile, ConversationContext};

use crate::ServerError;

/// Session state
pub struct Session {
    /// Session ID
    pub id: String,
    /// Persona this session runs under
    pub agent_id: String,
    /// Dialogue history, shared with the session's stage chain
    pub context: Arc<Mutex<ConversationContext>>,
    /// Creation time
    pub created_at: Instant,
    /// Is active
    active: RwLock<bool>,
}

impl Session {
    /// Create a new session seeded with the persona's system prompt.
    pub fn new(profile: &AgentProfile) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            agent_id: profile.id.clone(),
            context: Arc::new(Mutex::new(ConversationContext::new(profile.prompt.clone()))),
            created_at: Instant::now(),
            active: RwLock::new(true),
        }
    }

    /// Close session
    pub fn close(&self) {
        *self.active.write() = false;
    }

    /// Is session active
    pub fn is_active(&self) -> bool {
        *self.active.read()
    }
}

/// Session manager
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    max_sessions: usize,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
        }
    }

    /// Create a new session for the given persona.
    pub fn create(&self, profile: &AgentProfile) -> Result<Arc<Session>, ServerError> {
        let mut sessions = self.sessions.write();

        if sessions.len() >= self.max_sessions {
            return Err(ServerError::Session("max sessions reached".to_string()));
        }

        let session = Arc::new(Session::new(profile));
        sessions.insert(session.id.clone(), session.clone());

        tracing::info!(session_id = %session.id, agent_id = %session.agent_id, "created session");

        Ok(session)
    }

    /// Get a session by ID
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Remove a session
    pub fn remove(&self, id: &str) {
        let mut sessions = self.sessions.write();
        if let Some(session) = sessions.remove(id) {
            session.close();
            tracing::info!(session_id = %id, "removed session");
        }
    }

    /// Get active session count
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// List all session IDs
    pub fn list(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}
