//! Event responder: exhibitions, performances, today's schedule.
//!
//! Same merge discipline as the other live responders: curated knowledge
//! first, the event calendar feed as the live source, confidence raised only
//! when they agree.

use super::{
    join_passages, texts_agree, CONFIDENCE_CORROBORATED, CONFIDENCE_KNOWLEDGE_ONLY,
    CONFIDENCE_LIVE_ONLY,
};
use crate::responder::{AnswerRequest, Responder, ResponderAnswer, ResponderKind};
use async_trait::async_trait;
use kiosk_core::{retry_with_backoff, KioskResult, KnowledgeStore, RetryPolicy, StatusFeed};
use std::sync::Arc;
use tracing::warn;

pub struct EventResponder {
    knowledge: Arc<dyn KnowledgeStore>,
    calendar: Option<Arc<dyn StatusFeed>>,
    retry: RetryPolicy,
}

impl EventResponder {
    pub fn new(
        knowledge: Arc<dyn KnowledgeStore>,
        calendar: Option<Arc<dyn StatusFeed>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            knowledge,
            calendar,
            retry,
        }
    }
}

#[async_trait]
impl Responder for EventResponder {
    fn kind(&self) -> ResponderKind {
        ResponderKind::Event
    }

    async fn answer(&self, req: &AnswerRequest) -> KioskResult<ResponderAnswer> {
        let passages = match self.knowledge.search(&req.query, req.language, 4).await {
            Ok(p) => p,
            Err(e) => {
                warn!("knowledge lookup failed: {}", e);
                Vec::new()
            }
        };

        let live = match self.calendar.as_ref() {
            Some(feed) => match retry_with_backoff(self.retry, "event_calendar", || {
                feed.current_status(&req.query, req.language)
            })
            .await
            {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("event calendar unavailable, continuing without: {}", e);
                    None
                }
            },
            None => None,
        };

        if passages.is_empty() && live.is_none() {
            return Ok(ResponderAnswer::apology(req.language));
        }

        let sources: Vec<String> = passages
            .iter()
            .map(|p| p.source.clone())
            .chain(live.iter().map(|_| "event_calendar".to_string()))
            .collect();

        let (text, confidence) = match (&passages[..], &live) {
            ([], Some(entry)) => (entry.clone(), CONFIDENCE_LIVE_ONLY),
            (found, Some(entry)) => {
                let mut body = join_passages(found);
                let confidence = if texts_agree(&body, entry) {
                    CONFIDENCE_CORROBORATED
                } else {
                    CONFIDENCE_KNOWLEDGE_ONLY
                };
                body.push(' ');
                body.push_str(entry);
                (body, confidence)
            }
            (found, None) => (join_passages(found), CONFIDENCE_KNOWLEDGE_ONLY),
        };

        Ok(ResponderAnswer {
            text,
            emotion: "happy".to_string(),
            confidence,
            sources,
        })
    }
}
