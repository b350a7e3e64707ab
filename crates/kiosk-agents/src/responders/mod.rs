//! The six specialist responders.

mod business;
mod clarify;
mod event;
mod facility;
mod general;
mod recall;

pub use business::BusinessInfoResponder;
pub use clarify::ClarificationResponder;
pub use event::EventResponder;
pub use facility::FacilityResponder;
pub use general::GeneralKnowledgeResponder;
pub use recall::MemoryRecallResponder;

use kiosk_core::ScoredPassage;

/// Confidence when an independent live source corroborates the knowledge
/// store; below it, knowledge-only and live-only answers.
pub(crate) const CONFIDENCE_CORROBORATED: f32 = 0.85;
pub(crate) const CONFIDENCE_KNOWLEDGE_ONLY: f32 = 0.55;
pub(crate) const CONFIDENCE_LIVE_ONLY: f32 = 0.45;

pub(crate) fn join_passages(passages: &[ScoredPassage]) -> String {
    passages
        .iter()
        .map(|p| p.text.trim())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Loose agreement check between two texts: a shared distinctive token, or a
/// shared CJK 3-gram for text that does not tokenize on whitespace.
pub(crate) fn texts_agree(a: &str, b: &str) -> bool {
    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    let token_hit = a_lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .any(|t| b_lower.contains(t));
    if token_hit {
        return true;
    }
    let cjk: Vec<char> = a_lower.chars().filter(|c| !c.is_ascii()).collect();
    cjk.windows(3)
        .any(|w| b_lower.contains(&w.iter().collect::<String>()))
}
