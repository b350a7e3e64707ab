//! Kiosk sessions: one per visitor conversation.
//!
//! Sessions are owned by the orchestrator and destroyed on explicit end or
//! TTL lapse. A session's absence implies "new conversation" framing in the
//! router's fallback prompt.

use crate::language::Language;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// One visitor conversation at the kiosk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub language: Language,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl Session {
    fn new(language: Language) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4().to_string(),
            language,
            created_at: now,
            last_activity_at: now,
        }
    }

    /// True once the session has been idle longer than `ttl`.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        let idle = Utc::now().signed_duration_since(self.last_activity_at);
        idle.to_std().map(|d| d > ttl).unwrap_or(false)
    }
}

/// Session table shared across the pipeline. Append-only activity updates;
/// no locking beyond the DashMap shards.
pub struct SessionManager {
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Create a new session in the given language and return a snapshot.
    pub fn create(&self, language: Language) -> Session {
        let session = Session::new(language);
        info!(session_id = %session.session_id, language = language.code(), "session created");
        self.sessions.insert(session.session_id.clone(), session.clone());
        session
    }

    /// Snapshot of a live (non-expired) session. Expired sessions are removed
    /// on access.
    pub fn get(&self, session_id: &str) -> Option<Session> {
        let expired = match self.sessions.get(session_id) {
            Some(s) if !s.is_expired(self.ttl) => return Some(s.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.sessions.remove(session_id);
            debug!(session_id, "expired session dropped on access");
        }
        None
    }

    /// Record activity on a session so the TTL window restarts.
    pub fn touch(&self, session_id: &str) {
        if let Some(mut s) = self.sessions.get_mut(session_id) {
            s.last_activity_at = Utc::now();
        }
    }

    /// Explicit language switch. The only way a session language changes
    /// besides a high-confidence auto detection in the router.
    pub fn set_language(&self, session_id: &str, language: Language) {
        if let Some(mut s) = self.sessions.get_mut(session_id) {
            info!(session_id, language = language.code(), "session language switched");
            s.language = language;
        }
    }

    /// End a session explicitly.
    pub fn end(&self, session_id: &str) -> Option<Session> {
        self.sessions.remove(session_id).map(|(_, s)| s)
    }

    /// Drop all sessions past the TTL. Returns how many were removed.
    pub fn expire_idle(&self) -> usize {
        let ttl = self.ttl;
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired(ttl));
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_get() {
        let mgr = SessionManager::new(Duration::from_secs(180));
        let s = mgr.create(Language::Japanese);
        let got = mgr.get(&s.session_id).unwrap();
        assert_eq!(got.language, Language::Japanese);
    }

    #[test]
    fn expired_session_is_dropped_on_access() {
        let mgr = SessionManager::new(Duration::from_millis(10));
        let s = mgr.create(Language::English);
        std::thread::sleep(Duration::from_millis(30));
        assert!(mgr.get(&s.session_id).is_none());
        assert!(mgr.is_empty());
    }

    #[test]
    fn explicit_language_switch() {
        let mgr = SessionManager::new(Duration::from_secs(180));
        let s = mgr.create(Language::Japanese);
        mgr.set_language(&s.session_id, Language::English);
        assert_eq!(mgr.get(&s.session_id).unwrap().language, Language::English);
    }
}
