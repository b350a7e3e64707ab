//! Business information responder: hours, pricing, reservations.
//!
//! Merges knowledge-store passages (filtered by request type) with a live
//! web search when one is configured. Confidence rises only when both
//! sources agree; no content at all yields the low-confidence apology.

use super::{
    join_passages, texts_agree, CONFIDENCE_CORROBORATED, CONFIDENCE_KNOWLEDGE_ONLY,
    CONFIDENCE_LIVE_ONLY,
};
use crate::filter::ContentFilter;
use crate::responder::{AnswerRequest, Responder, ResponderAnswer, ResponderKind};
use async_trait::async_trait;
use kiosk_core::{retry_with_backoff, KioskResult, KnowledgeStore, RetryPolicy, SearchHit, WebSearch};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct BusinessInfoResponder {
    knowledge: Arc<dyn KnowledgeStore>,
    search: Option<Arc<dyn WebSearch>>,
    filter: Arc<ContentFilter>,
    retry: RetryPolicy,
}

impl BusinessInfoResponder {
    pub fn new(
        knowledge: Arc<dyn KnowledgeStore>,
        search: Option<Arc<dyn WebSearch>>,
        filter: Arc<ContentFilter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            knowledge,
            search,
            filter,
            retry,
        }
    }

    async fn live_hits(&self, req: &AnswerRequest) -> Vec<SearchHit> {
        let Some(search) = self.search.as_ref() else {
            return Vec::new();
        };
        match retry_with_backoff(self.retry, "web_search", || {
            search.search(&req.query, req.language)
        })
        .await
        {
            Ok(hits) => hits,
            Err(e) => {
                // Secondary source down is not an answer failure.
                warn!("web search unavailable, continuing without: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Responder for BusinessInfoResponder {
    fn kind(&self) -> ResponderKind {
        ResponderKind::BusinessInfo
    }

    async fn answer(&self, req: &AnswerRequest) -> KioskResult<ResponderAnswer> {
        let passages = match self.knowledge.search(&req.query, req.language, 4).await {
            Ok(p) => p,
            Err(e) => {
                warn!("knowledge lookup failed: {}", e);
                Vec::new()
            }
        };
        let passages = self.filter.apply(req.request_type.as_deref(), passages);
        let hits = self.live_hits(req).await;

        if passages.is_empty() && hits.is_empty() {
            return Ok(ResponderAnswer::apology(req.language));
        }

        let mut sources: Vec<String> = passages.iter().map(|p| p.source.clone()).collect();
        sources.extend(hits.iter().map(|h| h.url.clone()));

        let (text, confidence) = if passages.is_empty() {
            (hits[0].snippet.clone(), CONFIDENCE_LIVE_ONLY)
        } else {
            let body = join_passages(&passages);
            let corroborated = hits.iter().any(|h| texts_agree(&body, &h.snippet));
            let confidence = if corroborated {
                CONFIDENCE_CORROBORATED
            } else {
                CONFIDENCE_KNOWLEDGE_ONLY
            };
            (body, confidence)
        };

        debug!(
            request_type = req.request_type.as_deref().unwrap_or(""),
            confidence, "business answer assembled"
        );
        Ok(ResponderAnswer {
            text,
            emotion: "neutral".to_string(),
            confidence,
            sources,
        })
    }
}
