//! General-knowledge responder: the default fallback.
//!
//! Assembles the session context (recent turns plus a knowledge lookup) and
//! answers from the best matching passage. The framing follows the router's
//! continuation flag: a fresh session gets a greeting, a continuing one does
//! not.

use super::CONFIDENCE_KNOWLEDGE_ONLY;
use crate::responder::{AnswerRequest, Responder, ResponderAnswer, ResponderKind};
use async_trait::async_trait;
use kiosk_core::{ContextOptions, KioskResult, KnowledgeStore, Language, MemoryStore};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct GeneralKnowledgeResponder {
    knowledge: Arc<dyn KnowledgeStore>,
    memory: Arc<MemoryStore>,
}

impl GeneralKnowledgeResponder {
    pub fn new(knowledge: Arc<dyn KnowledgeStore>, memory: Arc<MemoryStore>) -> Self {
        Self { knowledge, memory }
    }

    fn greeting(language: Language) -> &'static str {
        match language {
            Language::Japanese => "こんにちは、ご案内します。",
            Language::English => "Hello! Happy to help. ",
        }
    }
}

#[async_trait]
impl Responder for GeneralKnowledgeResponder {
    fn kind(&self) -> ResponderKind {
        ResponderKind::GeneralKnowledge
    }

    async fn answer(&self, req: &AnswerRequest) -> KioskResult<ResponderAnswer> {
        let context = self
            .memory
            .get_context(
                &req.session_id,
                &req.query,
                &ContextOptions {
                    include_knowledge: true,
                    language: req.language,
                },
                Some(self.knowledge.as_ref()),
            )
            .await;
        debug!(context_bytes = context.len(), "general answer context assembled");

        let passages = match self.knowledge.search(&req.query, req.language, 2).await {
            Ok(p) => p,
            Err(e) => {
                warn!("knowledge lookup failed: {}", e);
                Vec::new()
            }
        };

        let Some(best) = passages.first() else {
            return Ok(ResponderAnswer::apology(req.language));
        };

        let text = if req.continuing {
            best.text.clone()
        } else {
            format!("{}{}", Self::greeting(req.language), best.text)
        };

        Ok(ResponderAnswer {
            text,
            emotion: "neutral".to_string(),
            confidence: CONFIDENCE_KNOWLEDGE_ONLY,
            sources: vec![best.source.clone()],
        })
    }
}
