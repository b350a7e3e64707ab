//! Clarification responder.
//!
//! Entered on low router confidence or an ambiguous referent. When options
//! are attached it presents them numbered and records them in memory
//! metadata, so the next turn can resolve the reference by keyword or
//! ordinal instead of re-asking.

use crate::responder::{AnswerRequest, Responder, ResponderAnswer, ResponderKind};
use async_trait::async_trait;
use kiosk_core::{KioskResult, Language, MemoryStore, Role, TurnMetadata};
use std::sync::Arc;

pub struct ClarificationResponder {
    memory: Arc<MemoryStore>,
}

impl ClarificationResponder {
    pub fn new(memory: Arc<MemoryStore>) -> Self {
        Self { memory }
    }

    fn generic(language: Language) -> &'static str {
        match language {
            Language::Japanese => "もう少し詳しく教えていただけますか？",
            Language::English => "Could you tell me a little more about what you're looking for?",
        }
    }

    fn options_text(options: &[String], language: Language) -> String {
        let numbered: Vec<String> = options
            .iter()
            .enumerate()
            .map(|(i, o)| format!("{}. {}", i + 1, o))
            .collect();
        match language {
            Language::Japanese => {
                format!("どちらのことでしょうか？ {}", numbered.join("、"))
            }
            Language::English => {
                format!("Which one did you mean? {}", numbered.join(", or "))
            }
        }
    }
}

#[async_trait]
impl Responder for ClarificationResponder {
    fn kind(&self) -> ResponderKind {
        ResponderKind::Clarification
    }

    async fn answer(&self, req: &AnswerRequest) -> KioskResult<ResponderAnswer> {
        let text = if req.options.is_empty() {
            Self::generic(req.language).to_string()
        } else {
            Self::options_text(&req.options, req.language)
        };

        // Record the offered options so the router can resolve the follow-up.
        self.memory.note(
            &req.session_id,
            Role::Assistant,
            &text,
            TurnMetadata {
                emotion: Some("thinking".to_string()),
                clarification_options: req.options.clone(),
                ..Default::default()
            },
        );

        Ok(ResponderAnswer {
            text,
            emotion: "thinking".to_string(),
            confidence: 0.9,
            sources: Vec::new(),
        })
    }
}
