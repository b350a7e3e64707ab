//! The responder contract: one narrow capability per implementation, composed
//! through the registry instead of a shared base type.

use async_trait::async_trait;
use kiosk_core::{KioskResult, Language};
use serde::{Deserialize, Serialize};

/// The six specialist capabilities the router can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponderKind {
    BusinessInfo,
    Facility,
    Event,
    Memory,
    Clarification,
    GeneralKnowledge,
}

impl ResponderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponderKind::BusinessInfo => "business_info",
            ResponderKind::Facility => "facility",
            ResponderKind::Event => "event",
            ResponderKind::Memory => "memory",
            ResponderKind::Clarification => "clarification",
            ResponderKind::GeneralKnowledge => "general_knowledge",
        }
    }
}

/// Everything a responder needs for one answer. Built by the workflow from
/// the routing decision; responders never reach back into the router.
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    pub session_id: String,
    pub query: String,
    /// Sub-classification for business/facility queries ("hours", "pricing",
    /// ...), used to filter retrieved passages.
    pub request_type: Option<String>,
    pub language: Language,
    /// True when the session has recent non-expired turns; responders frame
    /// their answer as a continuation instead of a fresh greeting.
    pub continuing: bool,
    /// Options to present, set only for the clarification responder.
    pub options: Vec<String>,
}

/// One responder's answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderAnswer {
    pub text: String,
    /// Emotion name from the avatar vocabulary.
    pub emotion: String,
    /// Answer confidence in [0, 1]. Raised only when independent sources
    /// agree; a no-content apology scores low.
    pub confidence: f32,
    /// Source identifiers (document ids, URLs, feed names) backing the text.
    pub sources: Vec<String>,
}

impl ResponderAnswer {
    /// Low-confidence apology in the session language. Responders return this
    /// when no source yields content, instead of inventing an answer.
    pub fn apology(language: Language) -> Self {
        let text = match language {
            Language::Japanese => {
                "申し訳ありません、その件についての情報が見つかりませんでした。スタッフにお尋ねいただけますか。"
            }
            Language::English => {
                "I'm sorry, I couldn't find information about that. Our staff will be happy to help."
            }
        };
        Self {
            text: text.to_string(),
            emotion: "apologetic".to_string(),
            confidence: 0.2,
            sources: Vec::new(),
        }
    }
}

/// Capability trait implemented by each specialist.
#[async_trait]
pub trait Responder: Send + Sync {
    fn kind(&self) -> ResponderKind;
    async fn answer(&self, req: &AnswerRequest) -> KioskResult<ResponderAnswer>;
}
