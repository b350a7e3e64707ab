//! Intent router: free text → responder kind + category + request type.
//!
//! Scoring is keyword-table based per language. Confidence combines match
//! strength with how decisively the winning category beats the runner-up;
//! an even split between two categories drops below the clarification
//! threshold. Ambiguous referents (two facilities sharing a name) route to
//! the clarification responder with the distinguishing options attached, and
//! a follow-up turn can resolve a pending clarification by option keyword or
//! ordinal.
//!
//! The keyword tables are a seed policy table, partial by design; extend the
//! tables, not the scoring.

use crate::responder::ResponderKind;
use kiosk_core::{detect_language, effective_language, Language, MemoryStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Output of one routing pass; consumed by the turn workflow, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub target: ResponderKind,
    /// Human-readable category tag for logging ("business", "facility", ...).
    pub category: String,
    pub request_type: Option<String>,
    pub confidence: f32,
    pub language: Language,
    /// True when the session has non-expired memory; frames the responder
    /// prompt as a continuation.
    pub continuing: bool,
    /// Options to offer, set when `target` is the clarification responder.
    pub clarification_options: Vec<String>,
    /// The referent a follow-up resolved from a previously offered option
    /// list, when applicable.
    pub resolved_referent: Option<String>,
}

struct CategoryRule {
    kind: ResponderKind,
    category: &'static str,
    keywords_en: &'static [&'static str],
    keywords_ja: &'static [&'static str],
}

const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        kind: ResponderKind::BusinessInfo,
        category: "business",
        keywords_en: &[
            "hour", "open", "close", "price", "cost", "fee", "ticket", "admission", "reserve",
            "reservation", "book",
        ],
        keywords_ja: &[
            "営業", "時間", "何時", "料金", "値段", "いくら", "チケット", "入場", "予約",
        ],
    },
    CategoryRule {
        kind: ResponderKind::Facility,
        category: "facility",
        keywords_en: &[
            "where", "restroom", "toilet", "cafe", "elevator", "floor", "hall", "locker", "map",
            "entrance", "shop",
        ],
        keywords_ja: &[
            "どこ", "トイレ", "お手洗い", "カフェ", "エレベーター", "ホール", "ロッカー", "場所",
            "入口", "売店", "階",
        ],
    },
    CategoryRule {
        kind: ResponderKind::Event,
        category: "event",
        keywords_en: &[
            "event", "schedule", "concert", "exhibition", "festival", "performance", "workshop",
        ],
        keywords_ja: &["イベント", "催し", "公演", "展示", "祭", "ワークショップ", "予定"],
    },
    CategoryRule {
        kind: ResponderKind::Memory,
        category: "memory",
        keywords_en: &["remember", "earlier", "before", "you said", "i said", "my name"],
        keywords_ja: &["さっき", "覚え", "先ほど", "前に", "名前", "言った"],
    },
];

struct RequestTypeRule {
    tag: &'static str,
    keywords: &'static [&'static str],
}

const REQUEST_TYPE_RULES: &[RequestTypeRule] = &[
    RequestTypeRule {
        tag: "hours",
        keywords: &[
            "hour", "open", "close", "when", "time", "営業", "時間", "何時", "開", "閉",
        ],
    },
    RequestTypeRule {
        tag: "pricing",
        keywords: &[
            "price", "cost", "fee", "ticket", "admission", "料金", "値段", "いくら", "チケット",
        ],
    },
    RequestTypeRule {
        tag: "access",
        keywords: &[
            "access", "direction", "station", "bus", "train", "parking", "アクセス", "行き方",
            "駅", "バス", "駐車",
        ],
    },
    RequestTypeRule {
        tag: "menu",
        keywords: &["menu", "food", "eat", "drink", "メニュー", "食事", "飲み"],
    },
    RequestTypeRule {
        tag: "seating",
        keywords: &["seat", "seating", "capacity", "席", "座席", "満席"],
    },
    RequestTypeRule {
        tag: "reservation",
        keywords: &["reserve", "reservation", "book", "予約", "申し込み"],
    },
];

/// A name shared by multiple known referents, with the distinguishing
/// options to offer.
pub struct AmbiguousReferent {
    pub triggers: Vec<String>,
    pub options: Vec<String>,
    pub kind: ResponderKind,
}

// "one"/"two" are deliberately absent: "the first one" and "the second one"
// both contain "one".
const ORDINALS_EN: &[(&str, usize)] = &[
    ("first", 0),
    ("1", 0),
    ("second", 1),
    ("2", 1),
    ("third", 2),
    ("3", 2),
];
const ORDINALS_JA: &[(&str, usize)] = &[
    ("一つ目", 0),
    ("最初", 0),
    ("1", 0),
    ("二つ目", 1),
    ("二番目", 1),
    ("2", 1),
    ("三つ目", 2),
    ("3", 2),
];

/// Classifies queries and carries the clarification state between turns via
/// the memory store.
pub struct IntentRouter {
    memory: Arc<MemoryStore>,
    clarification_threshold: f32,
    language_switch_threshold: f32,
    ambiguous: Vec<AmbiguousReferent>,
}

impl IntentRouter {
    pub fn new(
        memory: Arc<MemoryStore>,
        clarification_threshold: f32,
        language_switch_threshold: f32,
    ) -> Self {
        Self {
            memory,
            clarification_threshold,
            language_switch_threshold,
            ambiguous: Vec::new(),
        }
    }

    /// Register an ambiguous referent (e.g. two halls sharing a name).
    pub fn with_ambiguous_referent(mut self, referent: AmbiguousReferent) -> Self {
        self.ambiguous.push(referent);
        self
    }

    /// Route one validated query. `session_language` is the sticky session
    /// language; it only switches when detection confidence clears the
    /// configured threshold.
    pub fn route(&self, session_id: &str, query: &str, session_language: Language) -> RoutingDecision {
        let (detected, det_conf) = detect_language(query);
        let language = effective_language(
            session_language,
            detected,
            det_conf,
            self.language_switch_threshold,
        );
        let continuing = self.memory.is_conversation_active(session_id);
        let lowered = query.to_lowercase();

        // A pending clarification resolves before any fresh classification.
        if let Some(resolved) = self.resolve_pending_option(session_id, &lowered, language) {
            debug!(session_id, referent = %resolved, "clarification resolved");
            let target = self
                .ambiguous
                .iter()
                .find(|r| r.options.contains(&resolved))
                .map(|r| r.kind)
                .unwrap_or(ResponderKind::Facility);
            return RoutingDecision {
                target,
                category: target.as_str().to_string(),
                request_type: classify_request_type(&lowered),
                confidence: 0.9,
                language,
                continuing,
                clarification_options: Vec::new(),
                resolved_referent: Some(resolved),
            };
        }

        // Ambiguous referent with no distinguishing word → offer the options.
        if let Some(referent) = self.detect_ambiguity(&lowered) {
            return RoutingDecision {
                target: ResponderKind::Clarification,
                category: "clarification".to_string(),
                request_type: classify_request_type(&lowered),
                confidence: 0.9,
                language,
                continuing,
                clarification_options: referent.options.clone(),
                resolved_referent: None,
            };
        }

        let mut scores: Vec<(usize, usize)> = CATEGORY_RULES
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                let keywords: &[&str] = match language {
                    Language::English => rule.keywords_en,
                    Language::Japanese => rule.keywords_ja,
                };
                (i, keywords.iter().filter(|k| lowered.contains(*k)).count())
            })
            .collect();
        scores.sort_by(|a, b| b.1.cmp(&a.1));
        let (best_idx, best_hits) = scores[0];
        let second_hits = scores.get(1).map(|s| s.1).unwrap_or(0);

        if best_hits == 0 {
            // No category signal: a general question, not an unclear one.
            return RoutingDecision {
                target: ResponderKind::GeneralKnowledge,
                category: "general".to_string(),
                request_type: None,
                confidence: 0.5,
                language,
                continuing,
                clarification_options: Vec::new(),
                resolved_referent: None,
            };
        }

        let rule = &CATEGORY_RULES[best_idx];
        let strength = (0.4 + 0.2 * best_hits as f32).min(0.95);
        let decisiveness = best_hits as f32 / (best_hits + second_hits) as f32;
        let confidence = strength * decisiveness;

        if confidence < self.clarification_threshold {
            debug!(
                session_id,
                confidence, "routing confidence below threshold; asking to clarify"
            );
            return RoutingDecision {
                target: ResponderKind::Clarification,
                category: rule.category.to_string(),
                request_type: classify_request_type(&lowered),
                confidence,
                language,
                continuing,
                clarification_options: Vec::new(),
                resolved_referent: None,
            };
        }

        let request_type = match rule.kind {
            ResponderKind::BusinessInfo | ResponderKind::Facility => {
                classify_request_type(&lowered)
            }
            _ => None,
        };

        RoutingDecision {
            target: rule.kind,
            category: rule.category.to_string(),
            request_type,
            confidence,
            language,
            continuing,
            clarification_options: Vec::new(),
            resolved_referent: None,
        }
    }

    /// Resolve a follow-up against the most recently offered option list, by
    /// option keyword or by ordinal ("the first one", "二番目").
    fn resolve_pending_option(
        &self,
        session_id: &str,
        lowered: &str,
        language: Language,
    ) -> Option<String> {
        let offered = self.memory.last_offered_options(session_id);
        if offered.is_empty() {
            return None;
        }
        // Keyword match: score each option by how many of its words appear;
        // resolve only when one option wins outright (a word shared by all
        // options, like "hall", distinguishes nothing).
        let hits: Vec<usize> = offered
            .iter()
            .map(|option| {
                let option_lower = option.to_lowercase();
                let word_hits = option_lower
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| w.len() > 1)
                    .filter(|w| lowered.contains(w))
                    .count();
                let whole_hit =
                    !option_lower.is_ascii() && lowered.contains(option_lower.trim());
                word_hits + usize::from(whole_hit)
            })
            .collect();
        if let Some((best_idx, &best)) = hits.iter().enumerate().max_by_key(|(_, h)| **h) {
            if best > 0 && hits.iter().filter(|h| **h == best).count() == 1 {
                return Some(offered[best_idx].clone());
            }
        }
        // Ordinal match. English ordinals match on word boundaries so "1"
        // inside "B1" never counts; Japanese has no word boundaries to use.
        match language {
            Language::English => {
                let words: Vec<&str> = lowered
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                    .collect();
                for (word, idx) in ORDINALS_EN {
                    if words.contains(word) {
                        if let Some(option) = offered.get(*idx) {
                            return Some(option.clone());
                        }
                    }
                }
            }
            Language::Japanese => {
                for (word, idx) in ORDINALS_JA {
                    if lowered.contains(word) {
                        if let Some(option) = offered.get(*idx) {
                            return Some(option.clone());
                        }
                    }
                }
            }
        }
        None
    }

    fn detect_ambiguity(&self, lowered: &str) -> Option<&AmbiguousReferent> {
        self.ambiguous.iter().find(|r| {
            let triggered = r.triggers.iter().any(|t| lowered.contains(&t.to_lowercase()));
            let distinguished = r.options.iter().any(|o| {
                let o = o.to_lowercase();
                o.split(|c: char| !c.is_alphanumeric())
                    .filter(|w| w.len() > 1 && !r.triggers.iter().any(|t| t.eq_ignore_ascii_case(w)))
                    .any(|w| lowered.contains(w))
            });
            triggered && !distinguished
        })
    }
}

fn classify_request_type(lowered: &str) -> Option<String> {
    REQUEST_TYPE_RULES
        .iter()
        .map(|r| (r.tag, r.keywords.iter().filter(|k| lowered.contains(*k)).count()))
        .filter(|(_, hits)| *hits > 0)
        .max_by_key(|(_, hits)| *hits)
        .map(|(tag, _)| tag.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_core::{Role, TurnMetadata};
    use std::time::Duration;

    fn router() -> (IntentRouter, Arc<MemoryStore>) {
        let memory = Arc::new(MemoryStore::new(Duration::from_secs(180), 20, 6000));
        let router = IntentRouter::new(Arc::clone(&memory), 0.45, 0.98)
            .with_ambiguous_referent(AmbiguousReferent {
                triggers: vec!["hall".to_string(), "ホール".to_string()],
                options: vec![
                    "Main Hall (2F)".to_string(),
                    "Event Hall (B1)".to_string(),
                ],
                kind: ResponderKind::Facility,
            });
        (router, memory)
    }

    #[test]
    fn hours_query_routes_to_business_info() {
        let (router, _) = router();
        let d = router.route("s1", "What time do you open today?", Language::English);
        assert_eq!(d.target, ResponderKind::BusinessInfo);
        assert_eq!(d.request_type.as_deref(), Some("hours"));
        assert!(d.confidence >= 0.45);
    }

    #[test]
    fn japanese_facility_query() {
        let (router, _) = router();
        let d = router.route("s1", "トイレはどこですか", Language::Japanese);
        assert_eq!(d.target, ResponderKind::Facility);
        assert_eq!(d.language, Language::Japanese);
    }

    #[test]
    fn no_signal_falls_back_to_general_knowledge() {
        let (router, _) = router();
        let d = router.route("s1", "tell me something interesting", Language::English);
        assert_eq!(d.target, ResponderKind::GeneralKnowledge);
        assert_eq!(d.category, "general");
    }

    #[test]
    fn ambiguous_hall_asks_for_clarification() {
        let (router, _) = router();
        let d = router.route("s1", "how do I get to the hall?", Language::English);
        assert_eq!(d.target, ResponderKind::Clarification);
        assert_eq!(d.clarification_options.len(), 2);
    }

    #[test]
    fn distinguished_hall_does_not_clarify() {
        let (router, _) = router();
        let d = router.route("s1", "where is the main hall?", Language::English);
        assert_ne!(d.target, ResponderKind::Clarification);
    }

    #[test]
    fn follow_up_resolves_offered_option_by_keyword() {
        let (router, memory) = router();
        memory.note(
            "s1",
            Role::Assistant,
            "Which hall did you mean?",
            TurnMetadata {
                clarification_options: vec![
                    "Main Hall (2F)".to_string(),
                    "Event Hall (B1)".to_string(),
                ],
                ..Default::default()
            },
        );
        let d = router.route("s1", "the event hall please", Language::English);
        assert_eq!(d.resolved_referent.as_deref(), Some("Event Hall (B1)"));
        assert_eq!(d.target, ResponderKind::Facility);
    }

    #[test]
    fn follow_up_resolves_by_ordinal() {
        let (router, memory) = router();
        memory.note(
            "s1",
            Role::Assistant,
            "Which hall did you mean?",
            TurnMetadata {
                clarification_options: vec![
                    "Main Hall (2F)".to_string(),
                    "Event Hall (B1)".to_string(),
                ],
                ..Default::default()
            },
        );
        let d = router.route("s1", "the second one", Language::English);
        assert_eq!(d.resolved_referent.as_deref(), Some("Event Hall (B1)"));
    }

    #[test]
    fn language_stays_sticky_on_short_input() {
        let (router, _) = router();
        // Short English input cannot clear the 0.98 switch threshold.
        let d = router.route("s1", "event info", Language::Japanese);
        assert_eq!(d.language, Language::Japanese);
    }

    #[test]
    fn memory_queries_route_to_memory_responder() {
        let (router, _) = router();
        let d = router.route("s1", "do you remember what I said earlier?", Language::English);
        assert_eq!(d.target, ResponderKind::Memory);
    }

    #[test]
    fn continuing_flag_tracks_memory_activity() {
        let (router, memory) = router();
        let d = router.route("s1", "what are your hours", Language::English);
        assert!(!d.continuing);
        memory.note("s1", Role::User, "hello", TurnMetadata::default());
        let d = router.route("s1", "what are your hours", Language::English);
        assert!(d.continuing);
    }
}
