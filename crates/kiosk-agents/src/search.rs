//! Live data collaborators: web search and the facility status feed.
//!
//! Both are best-effort. Construction from a missing API key yields `None`
//! rather than an error, and responders degrade to knowledge-only answers
//! when a call fails.

use async_trait::async_trait;
use kiosk_core::{KioskError, KioskResult, Language, SearchHit, StatusFeed, WebSearch};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, warn};

const SEARCH_ENDPOINT: &str = "https://api.tavily.com/search";
const MAX_RESULTS: usize = 3;

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
}

/// Web search over the Tavily HTTP API.
pub struct HttpWebSearch {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl HttpWebSearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: SEARCH_ENDPOINT.to_string(),
        }
    }

    /// Build from `KIOSK_SEARCH_API_KEY`. A missing key means search is
    /// disabled, not broken.
    pub fn from_env() -> Option<Self> {
        match std::env::var("KIOSK_SEARCH_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Some(Self::new(key)),
            _ => {
                debug!("no search API key configured; web search disabled");
                None
            }
        }
    }
}

#[async_trait]
impl WebSearch for HttpWebSearch {
    async fn search(&self, query: &str, _language: Language) -> KioskResult<Vec<SearchHit>> {
        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": MAX_RESULTS,
        });
        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        if !response.status().is_success() {
            warn!(status = %response.status(), "search request rejected");
            return Err(KioskError::SourceUnavailable(format!(
                "search returned {}",
                response.status()
            )));
        }
        let parsed: SearchResponse = response.json().await?;
        Ok(parsed
            .results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                snippet: r.content,
                url: r.url,
            })
            .collect())
    }
}

/// In-memory status feed keyed by topic keyword, per language. Stands in for
/// the live occupancy/calendar feed in tests and the offline demo.
#[derive(Default)]
pub struct StaticStatusFeed {
    entries: HashMap<(Language, String), String>,
}

impl StaticStatusFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        &mut self,
        language: Language,
        topic: impl Into<String>,
        status: impl Into<String>,
    ) {
        self.entries
            .insert((language, topic.into().to_lowercase()), status.into());
    }
}

#[async_trait]
impl StatusFeed for StaticStatusFeed {
    async fn current_status(
        &self,
        topic: &str,
        language: Language,
    ) -> KioskResult<Option<String>> {
        let topic_lower = topic.to_lowercase();
        Ok(self
            .entries
            .iter()
            .find(|((lang, key), _)| *lang == language && topic_lower.contains(key.as_str()))
            .map(|(_, status)| status.clone()))
    }
}
