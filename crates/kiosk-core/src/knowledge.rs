//! Knowledge store port: semantic lookup over the kiosk's curated content.
//!
//! The vector backend itself is an external collaborator; this crate only
//! owns the trait and a small in-memory implementation used by tests and the
//! offline demo.

use crate::error::{KioskError, KioskResult};
use crate::language::Language;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One ranked passage returned by a knowledge lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub text: String,
    /// Relevance score in [0, 1], higher is better.
    pub score: f32,
    /// Source identifier (document id, URL, or feed name).
    pub source: String,
}

/// Semantic lookup collaborator: `(query, language, limit) -> ranked passages`.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn search(
        &self,
        query: &str,
        language: Language,
        limit: usize,
    ) -> KioskResult<Vec<ScoredPassage>>;
}

/// In-memory keyword-overlap store. Scoring is term overlap over whitespace
/// tokens plus substring hits for CJK text (which does not tokenize on
/// whitespace).
#[derive(Debug, Default)]
pub struct StaticKnowledgeStore {
    passages: Vec<(Language, String, String)>,
}

impl StaticKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a passage under a source id.
    pub fn add(&mut self, language: Language, source: impl Into<String>, text: impl Into<String>) {
        self.passages.push((language, source.into(), text.into()));
    }

    fn score(query: &str, text: &str) -> f32 {
        let text_lower = text.to_lowercase();
        let query_lower = query.to_lowercase();
        let mut hits = 0usize;
        let mut terms = 0usize;
        for term in query_lower.split_whitespace().filter(|t| t.len() > 1) {
            terms += 1;
            if text_lower.contains(term) {
                hits += 1;
            }
        }
        // CJK queries often arrive as a single "term"; fall back to counting
        // shared 2-grams so Japanese lookups still rank.
        if terms <= 1 {
            let chars: Vec<char> = query_lower.chars().collect();
            if chars.len() >= 2 {
                terms = chars.len() - 1;
                hits = chars
                    .windows(2)
                    .filter(|w| text_lower.contains(&w.iter().collect::<String>()))
                    .count();
            }
        }
        if terms == 0 {
            return 0.0;
        }
        hits as f32 / terms as f32
    }
}

#[async_trait]
impl KnowledgeStore for StaticKnowledgeStore {
    async fn search(
        &self,
        query: &str,
        language: Language,
        limit: usize,
    ) -> KioskResult<Vec<ScoredPassage>> {
        if query.trim().is_empty() {
            return Err(KioskError::Knowledge("empty query".to_string()));
        }
        let mut ranked: Vec<ScoredPassage> = self
            .passages
            .iter()
            .filter(|(lang, _, _)| *lang == language)
            .map(|(_, source, text)| ScoredPassage {
                score: Self::score(query, text),
                text: text.clone(),
                source: source.clone(),
            })
            .filter(|p| p.score > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(limit);
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ranks_by_term_overlap() {
        let mut store = StaticKnowledgeStore::new();
        store.add(Language::English, "doc1", "Opening hours are 9am to 6pm daily.");
        store.add(Language::English, "doc2", "The cafe serves seasonal menus.");
        let hits = store
            .search("opening hours today", Language::English, 5)
            .await
            .unwrap();
        assert_eq!(hits[0].source, "doc1");
    }

    #[tokio::test]
    async fn filters_by_language() {
        let mut store = StaticKnowledgeStore::new();
        store.add(Language::Japanese, "doc-ja", "営業時間は9時から18時です。");
        let hits = store.search("hours", Language::English, 5).await.unwrap();
        assert!(hits.is_empty());
        let hits = store.search("営業時間", Language::Japanese, 5).await.unwrap();
        assert_eq!(hits.len(), 1);
    }
}
