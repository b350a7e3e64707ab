//! Memory recall responder: answers "what did I say earlier" from the
//! session's short-term log, and promotes a turn when the visitor explicitly
//! asks to have something remembered.

use crate::responder::{AnswerRequest, Responder, ResponderAnswer, ResponderKind};
use async_trait::async_trait;
use kiosk_core::{KioskResult, Language, MemoryStore, Role};
use std::sync::Arc;
use tracing::warn;

const REMEMBER_MARKERS: &[&str] = &["remember this", "remember that", "覚えて", "覚えておいて"];

pub struct MemoryRecallResponder {
    memory: Arc<MemoryStore>,
}

impl MemoryRecallResponder {
    pub fn new(memory: Arc<MemoryStore>) -> Self {
        Self { memory }
    }

    fn nothing_yet(language: Language) -> &'static str {
        match language {
            Language::Japanese => "すみません、この会話ではまだ何も伺っていないようです。",
            Language::English => "I'm sorry, I don't have anything from earlier in this conversation.",
        }
    }
}

#[async_trait]
impl Responder for MemoryRecallResponder {
    fn kind(&self) -> ResponderKind {
        ResponderKind::Memory
    }

    async fn answer(&self, req: &AnswerRequest) -> KioskResult<ResponderAnswer> {
        // The workflow notes the user's utterance before the responder runs,
        // so the newest user turn is the question being answered. Dropping it
        // by position (not by content) keeps it excluded even when a resolved
        // referent was folded into the query.
        let turns = self.memory.recent_turns(&req.session_id);
        let mut earlier: Vec<_> = turns.iter().filter(|t| t.role == Role::User).collect();
        earlier.pop();

        // An explicit "remember this" promotes the latest statement beyond
        // the session TTL. Best-effort, never blocks the answer.
        let lowered = req.query.to_lowercase();
        if REMEMBER_MARKERS.iter().any(|m| lowered.contains(m)) {
            if let Some(turn) = earlier.last() {
                if let Err(e) = self
                    .memory
                    .promote(&req.session_id, turn.id, "visitor asked to remember")
                    .await
                {
                    warn!("promotion failed: {}", e);
                }
            }
        }

        if earlier.is_empty() {
            return Ok(ResponderAnswer {
                text: Self::nothing_yet(req.language).to_string(),
                emotion: "apologetic".to_string(),
                confidence: 0.3,
                sources: Vec::new(),
            });
        }

        let quoted: Vec<String> = earlier
            .iter()
            .rev()
            .take(3)
            .rev()
            .map(|t| match req.language {
                Language::Japanese => format!("「{}」", t.content),
                Language::English => format!("\"{}\"", t.content),
            })
            .collect();
        let text = match req.language {
            Language::Japanese => format!("先ほど、{}とおっしゃっていました。", quoted.join("、")),
            Language::English => format!("Earlier you said {}.", quoted.join(", then ")),
        };

        Ok(ResponderAnswer {
            text,
            emotion: "thinking".to_string(),
            confidence: 0.8,
            sources: vec!["session_memory".to_string()],
        })
    }
}
