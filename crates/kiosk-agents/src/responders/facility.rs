//! Facility responder: locations, floors, amenities, live occupancy.

use super::{
    join_passages, texts_agree, CONFIDENCE_CORROBORATED, CONFIDENCE_KNOWLEDGE_ONLY,
    CONFIDENCE_LIVE_ONLY,
};
use crate::filter::ContentFilter;
use crate::responder::{AnswerRequest, Responder, ResponderAnswer, ResponderKind};
use async_trait::async_trait;
use kiosk_core::{retry_with_backoff, KioskResult, KnowledgeStore, Language, RetryPolicy, StatusFeed};
use std::sync::Arc;
use tracing::warn;

pub struct FacilityResponder {
    knowledge: Arc<dyn KnowledgeStore>,
    status: Option<Arc<dyn StatusFeed>>,
    filter: Arc<ContentFilter>,
    retry: RetryPolicy,
}

impl FacilityResponder {
    pub fn new(
        knowledge: Arc<dyn KnowledgeStore>,
        status: Option<Arc<dyn StatusFeed>>,
        filter: Arc<ContentFilter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            knowledge,
            status,
            filter,
            retry,
        }
    }

    async fn live_status(&self, req: &AnswerRequest) -> Option<String> {
        let feed = self.status.as_ref()?;
        match retry_with_backoff(self.retry, "status_feed", || {
            feed.current_status(&req.query, req.language)
        })
        .await
        {
            Ok(status) => status,
            Err(e) => {
                warn!("status feed unavailable, continuing without: {}", e);
                None
            }
        }
    }

    fn status_prefix(language: Language) -> &'static str {
        match language {
            Language::Japanese => "現在の状況：",
            Language::English => "Right now: ",
        }
    }
}

#[async_trait]
impl Responder for FacilityResponder {
    fn kind(&self) -> ResponderKind {
        ResponderKind::Facility
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
        let status = self.live_status(req).await;

        if passages.is_empty() && status.is_none() {
            return Ok(ResponderAnswer::apology(req.language));
        }

        let sources: Vec<String> = passages
            .iter()
            .map(|p| p.source.clone())
            .chain(status.iter().map(|_| "status_feed".to_string()))
            .collect();

        let (mut text, confidence) = match (&passages[..], &status) {
            ([], Some(live)) => (live.clone(), CONFIDENCE_LIVE_ONLY),
            (found, Some(live)) => {
                let body = join_passages(found);
                let confidence = if texts_agree(&body, live) {
                    CONFIDENCE_CORROBORATED
                } else {
                    CONFIDENCE_KNOWLEDGE_ONLY
                };
                (body, confidence)
            }
            (found, None) => (join_passages(found), CONFIDENCE_KNOWLEDGE_ONLY),
        };
        if let (Some(live), false) = (&status, passages.is_empty()) {
            text.push(' ');
            text.push_str(Self::status_prefix(req.language));
            text.push_str(live);
        }

        Ok(ResponderAnswer {
            text,
            emotion: "neutral".to_string(),
            confidence,
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::StaticStatusFeed;
    use kiosk_core::StaticKnowledgeStore;

    fn store() -> Arc<StaticKnowledgeStore> {
        let mut s = StaticKnowledgeStore::new();
        s.add(
            Language::English,
            "floor-guide",
            "The cafe is on the second floor, next to the gift shop.",
        );
        Arc::new(s)
    }

    fn request(query: &str) -> AnswerRequest {
        AnswerRequest {
            session_id: "s1".to_string(),
            query: query.to_string(),
            request_type: None,
            language: Language::English,
            continuing: true,
            options: Vec::new(),
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            initial_delay: std::time::Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn merges_location_with_live_status() {
        let mut feed = StaticStatusFeed::new();
        feed.set(
            Language::English,
            "cafe",
            "the cafe has open tables at the moment.",
        );
        let responder = FacilityResponder::new(
            store(),
            Some(Arc::new(feed)),
            Arc::new(ContentFilter::new()),
            fast_retry(),
        );
        let a = responder.answer(&request("where is the cafe")).await.unwrap();
        assert!(a.text.contains("second floor"));
        assert!(a.text.contains("open tables"));
        assert!((a.confidence - CONFIDENCE_CORROBORATED).abs() < f32::EPSILON);
        assert!(a.sources.contains(&"status_feed".to_string()));
    }

    #[tokio::test]
    async fn works_without_status_feed() {
        let responder = FacilityResponder::new(
            store(),
            None,
            Arc::new(ContentFilter::new()),
            fast_retry(),
        );
        let a = responder.answer(&request("where is the cafe")).await.unwrap();
        assert!(a.text.contains("second floor"));
        assert!((a.confidence - CONFIDENCE_KNOWLEDGE_ONLY).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn unknown_facility_apologizes() {
        let responder = FacilityResponder::new(
            store(),
            None,
            Arc::new(ContentFilter::new()),
            fast_retry(),
        );
        let a = responder.answer(&request("zzz unknown wing")).await.unwrap();
        assert_eq!(a.emotion, "apologetic");
    }
}
