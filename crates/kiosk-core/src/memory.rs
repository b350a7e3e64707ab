//! Contextual memory: per-session, TTL-bounded conversation log.
//!
//! Entries are immutable once appended, so concurrent responder reads need no
//! locking beyond the DashMap shard and writes never conflict. Entries past
//! the TTL are excluded from context assembly even before they are physically
//! purged. Long-term retention is only a hook: [`PromotionSink`] receives the
//! turn and a human-readable reason; its backing store lives elsewhere.

use crate::error::{KioskError, KioskResult};
use crate::knowledge::KnowledgeStore;
use crate::language::Language;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Optional annotations attached to a turn at append time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnMetadata {
    #[serde(default)]
    pub emotion: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub request_type: Option<String>,
    /// Options offered by a clarification turn, recorded so the next turn can
    /// resolve the reference without re-asking.
    #[serde(default)]
    pub clarification_options: Vec<String>,
}

/// One immutable entry in the session log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: TurnMetadata,
}

/// Hook for promoting a short-term turn into longer-lived storage. The
/// backing store is an external concern; implementations must not block the
/// answer path.
#[async_trait]
pub trait PromotionSink: Send + Sync {
    async fn promote(&self, turn: &ConversationTurn, reason: &str) -> KioskResult<()>;
}

/// Options for [`MemoryStore::get_context`].
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// Also merge a knowledge-store lookup into the context string.
    pub include_knowledge: bool,
    pub language: Language,
}

/// Session-scoped, TTL-bounded message log shared by all responders.
pub struct MemoryStore {
    turns: DashMap<String, Vec<ConversationTurn>>,
    ttl: Duration,
    max_context_turns: usize,
    context_byte_cap: usize,
    promotion: Option<Arc<dyn PromotionSink>>,
}

impl MemoryStore {
    pub fn new(ttl: Duration, max_context_turns: usize, context_byte_cap: usize) -> Self {
        Self {
            turns: DashMap::new(),
            ttl,
            max_context_turns,
            context_byte_cap,
            promotion: None,
        }
    }

    /// Attach a promotion sink for long-term retention.
    pub fn with_promotion(mut self, sink: Arc<dyn PromotionSink>) -> Self {
        self.promotion = Some(sink);
        self
    }

    /// Append a turn. Entries are immutable once written; the append is
    /// atomic under the session's shard. Callers on the answer path treat a
    /// failure as log-only (`MemoryWriteFailure`), never as a turn abort.
    pub fn add_message(
        &self,
        session_id: &str,
        role: Role,
        content: impl Into<String>,
        metadata: TurnMetadata,
    ) -> KioskResult<Uuid> {
        let content = content.into();
        if session_id.is_empty() {
            return Err(KioskError::MemoryWrite("empty session id".to_string()));
        }
        let turn = ConversationTurn {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            role,
            content,
            timestamp: Utc::now(),
            metadata,
        };
        let id = turn.id;
        self.turns.entry(session_id.to_string()).or_default().push(turn);
        Ok(id)
    }

    fn within_ttl(&self, turn: &ConversationTurn, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(turn.timestamp)
            .to_std()
            .map(|d| d <= self.ttl)
            .unwrap_or(true)
    }

    /// Non-expired recent turns, oldest first, capped at `max_context_turns`.
    pub fn recent_turns(&self, session_id: &str) -> Vec<ConversationTurn> {
        let now = Utc::now();
        let Some(log) = self.turns.get(session_id) else {
            return Vec::new();
        };
        let live: Vec<ConversationTurn> = log
            .iter()
            .filter(|t| self.within_ttl(t, now))
            .cloned()
            .collect();
        let skip = live.len().saturating_sub(self.max_context_turns);
        live.into_iter().skip(skip).collect()
    }

    /// Assemble a bounded context string: recent turns plus an optional
    /// knowledge lookup, trimmed to the byte cap so prompts never grow
    /// unbounded.
    pub async fn get_context(
        &self,
        session_id: &str,
        query: &str,
        opts: &ContextOptions,
        knowledge: Option<&dyn KnowledgeStore>,
    ) -> String {
        let mut sections: Vec<String> = Vec::new();

        if opts.include_knowledge {
            if let Some(store) = knowledge {
                match store.search(query, opts.language, 3).await {
                    Ok(passages) if !passages.is_empty() => {
                        let joined = passages
                            .iter()
                            .map(|p| format!("- {}", p.text))
                            .collect::<Vec<_>>()
                            .join("\n");
                        sections.push(format!("[knowledge]\n{}", joined));
                    }
                    Ok(_) => {}
                    Err(e) => debug!(session_id, "knowledge lookup skipped: {}", e),
                }
            }
        }

        let turns = self.recent_turns(session_id);
        if !turns.is_empty() {
            let history = turns
                .iter()
                .map(|t| format!("{}: {}", t.role.as_str(), t.content))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(format!("[conversation]\n{}", history));
        }

        let mut out = sections.join("\n\n");
        if out.len() > self.context_byte_cap {
            // Trim from the front: older material goes first.
            let cut = out.len() - self.context_byte_cap;
            let mut idx = cut;
            while !out.is_char_boundary(idx) {
                idx += 1;
            }
            out = out.split_off(idx);
        }
        out
    }

    /// True iff the most recent turn is within the TTL window. The router
    /// uses this to frame prompts as "continuing" vs "new" conversation.
    pub fn is_conversation_active(&self, session_id: &str) -> bool {
        let now = Utc::now();
        self.turns
            .get(session_id)
            .and_then(|log| log.last().map(|t| self.within_ttl(t, now)))
            .unwrap_or(false)
    }

    /// Clarification options offered in the most recent non-expired assistant
    /// turn, if any. Lets the router resolve a follow-up like "the first one".
    pub fn last_offered_options(&self, session_id: &str) -> Vec<String> {
        self.recent_turns(session_id)
            .iter()
            .rev()
            .find(|t| t.role == Role::Assistant && !t.metadata.clarification_options.is_empty())
            .map(|t| t.metadata.clarification_options.clone())
            .unwrap_or_default()
    }

    /// Copy a turn into longer-lived storage with a human-readable reason.
    /// No-op when no sink is attached.
    pub async fn promote(&self, session_id: &str, turn_id: Uuid, reason: &str) -> KioskResult<()> {
        let Some(sink) = self.promotion.as_ref() else {
            return Ok(());
        };
        let turn = self
            .turns
            .get(session_id)
            .and_then(|log| log.iter().find(|t| t.id == turn_id).cloned())
            .ok_or_else(|| KioskError::MemoryWrite(format!("turn {} not found", turn_id)))?;
        sink.promote(&turn, reason).await
    }

    /// Explicit purge of one session's log (session end or on demand).
    pub fn cleanup(&self, session_id: &str) {
        self.turns.remove(session_id);
    }

    /// Purge entries past the TTL across all sessions; empty logs are
    /// dropped. Returns the number of purged turns.
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut purged = 0usize;
        self.turns.retain(|_, log| {
            let before = log.len();
            log.retain(|t| {
                now.signed_duration_since(t.timestamp)
                    .to_std()
                    .map(|d| d <= self.ttl)
                    .unwrap_or(true)
            });
            purged += before - log.len();
            !log.is_empty()
        });
        if purged > 0 {
            debug!(purged, "expired memory entries purged");
        }
        purged
    }

    /// Fire-and-forget append used on the answer path: failures are logged,
    /// never retried inline, never block answer delivery.
    pub fn note(&self, session_id: &str, role: Role, content: &str, metadata: TurnMetadata) {
        if let Err(e) = self.add_message(session_id, role, content, metadata) {
            warn!(session_id, "memory write dropped: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn store_with_ttl(ttl_ms: u64) -> MemoryStore {
        MemoryStore::new(Duration::from_millis(ttl_ms), 20, 6000)
    }

    #[tokio::test]
    async fn context_contains_recent_turns() {
        let store = store_with_ttl(60_000);
        store
            .add_message("s1", Role::User, "where is the cafe", TurnMetadata::default())
            .unwrap();
        store
            .add_message("s1", Role::Assistant, "second floor", TurnMetadata::default())
            .unwrap();
        let ctx = store
            .get_context("s1", "cafe", &ContextOptions::default(), None)
            .await;
        assert!(ctx.contains("user: where is the cafe"));
        assert!(ctx.contains("assistant: second floor"));
    }

    #[tokio::test]
    async fn expired_entries_excluded_before_purge() {
        let store = store_with_ttl(30);
        store
            .add_message("s1", Role::User, "old question", TurnMetadata::default())
            .unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        // Not yet purged, but excluded from assembly.
        let ctx = store
            .get_context("s1", "anything", &ContextOptions::default(), None)
            .await;
        assert!(!ctx.contains("old question"));
        assert!(!store.is_conversation_active("s1"));
        assert_eq!(store.cleanup_expired(), 1);
    }

    #[tokio::test]
    async fn active_within_ttl() {
        let store = store_with_ttl(60_000);
        assert!(!store.is_conversation_active("s1"));
        store
            .add_message("s1", Role::User, "hello", TurnMetadata::default())
            .unwrap();
        assert!(store.is_conversation_active("s1"));
    }

    #[tokio::test]
    async fn context_cap_limits_turn_count() {
        let store = MemoryStore::new(Duration::from_secs(60), 4, 6000);
        for i in 0..10 {
            store
                .add_message("s1", Role::User, format!("turn {}", i), TurnMetadata::default())
                .unwrap();
        }
        let turns = store.recent_turns("s1");
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].content, "turn 6");
    }

    #[tokio::test]
    async fn clarification_options_round_trip() {
        let store = store_with_ttl(60_000);
        store.note(
            "s1",
            Role::Assistant,
            "Which hall did you mean?",
            TurnMetadata {
                clarification_options: vec!["Main Hall".to_string(), "Event Hall".to_string()],
                ..Default::default()
            },
        );
        assert_eq!(
            store.last_offered_options("s1"),
            vec!["Main Hall".to_string(), "Event Hall".to_string()]
        );
    }

    struct RecordingSink(Mutex<Vec<(String, String)>>);

    #[async_trait]
    impl PromotionSink for RecordingSink {
        async fn promote(&self, turn: &ConversationTurn, reason: &str) -> KioskResult<()> {
            self.0
                .lock()
                .unwrap()
                .push((turn.content.clone(), reason.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn promotion_invokes_sink_with_reason() {
        let sink = Arc::new(RecordingSink(Mutex::new(Vec::new())));
        let store = store_with_ttl(60_000).with_promotion(sink.clone());
        let id = store
            .add_message("s1", Role::User, "my name is Sato", TurnMetadata::default())
            .unwrap();
        store
            .promote("s1", id, "visitor introduced themselves")
            .await
            .unwrap();
        let recorded = sink.0.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].1, "visitor introduced themselves");
    }
}
