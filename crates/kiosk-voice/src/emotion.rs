//! Emotion markup parsing.
//!
//! Generated answers may embed bracketed markers like `[happy:0.8] ... [neutral] ...`.
//! The parser extracts an ordered tag list, computes a primary emotion (first
//! tag, or a lexical fallback when no tags are present), and produces clean
//! text safe for speech synthesis. The split is lossless: clean text plus the
//! extracted tags can reconstruct an equivalent rendering.

use kiosk_core::Language;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Fixed emotion vocabulary shared with the avatar's expression map. Markers
/// outside this list are treated as literal text, not stripped.
pub const EMOTION_VOCABULARY: &[&str] = &[
    "neutral",
    "happy",
    "sad",
    "angry",
    "surprised",
    "thinking",
    "apologetic",
    "excited",
];

const DEFAULT_INTENSITY: f32 = 0.6;

/// One emotion annotation over a span of the clean text.
/// `span_start` is the byte offset where the marker applied; `span_end` is
/// the start of the next marker (or the end of the text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionTag {
    pub emotion: String,
    /// Intensity in [0, 1].
    pub intensity: f32,
    pub span_start: usize,
    pub span_end: usize,
}

/// Result of parsing emotion markup out of generated text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedEmotion {
    /// Marker-free text, safe for the sanitizer and chunker.
    pub clean_text: String,
    /// Ordered tags with spans over `clean_text`.
    pub tags: Vec<EmotionTag>,
    /// First tag, or the lexical fallback when no markers were present.
    pub primary: EmotionTag,
}

impl ParsedEmotion {
    /// Reconstruct an equivalent marked-up rendering from clean text + tags.
    /// `parse(x).to_markup()` parses back to the same tags and clean text.
    pub fn to_markup(&self) -> String {
        if self.tags.is_empty() {
            return self.clean_text.clone();
        }
        let mut out = String::with_capacity(self.clean_text.len() + self.tags.len() * 12);
        let mut cursor = 0usize;
        for tag in &self.tags {
            out.push_str(&self.clean_text[cursor..tag.span_start]);
            out.push_str(&format!("[{}:{:.2}]", tag.emotion, tag.intensity));
            cursor = tag.span_start;
        }
        out.push_str(&self.clean_text[cursor..]);
        out
    }
}

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([a-zA-Z_]+)(?::([0-9]*\.?[0-9]+))?\]\s*").unwrap());

/// Parse bracketed emotion markers out of `text`.
pub fn parse_emotion_markup(text: &str, language: Language) -> ParsedEmotion {
    let mut clean = String::with_capacity(text.len());
    let mut tags: Vec<EmotionTag> = Vec::new();
    let mut cursor = 0usize;

    for caps in TAG_RE.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let name = caps[1].to_lowercase();
        if !EMOTION_VOCABULARY.contains(&name.as_str()) {
            continue; // literal bracketed text, e.g. a citation "[1]"
        }
        clean.push_str(&text[cursor..whole.start()]);
        let intensity = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<f32>().ok())
            .unwrap_or(DEFAULT_INTENSITY)
            .clamp(0.0, 1.0);
        tags.push(EmotionTag {
            emotion: name,
            intensity,
            span_start: clean.len(),
            span_end: 0, // patched below
        });
        cursor = whole.end();
    }
    clean.push_str(&text[cursor..]);

    let len = clean.len();
    let next_starts: Vec<usize> = tags
        .iter()
        .skip(1)
        .map(|t| t.span_start)
        .chain(std::iter::once(len))
        .collect();
    for (tag, end) in tags.iter_mut().zip(next_starts) {
        tag.span_end = end;
    }

    let primary = tags
        .first()
        .cloned()
        .unwrap_or_else(|| fallback_sentiment(&clean, language));

    ParsedEmotion {
        clean_text: clean,
        tags,
        primary,
    }
}

const POSITIVE_EN: &[&str] = &["thank", "great", "welcome", "glad", "happy", "enjoy", "wonderful"];
const NEGATIVE_EN: &[&str] = &["sorry", "unfortunately", "closed", "cannot", "unable", "apolog"];
const POSITIVE_JA: &[&str] = &["ありがとう", "ようこそ", "嬉しい", "楽しみ", "歓迎"];
const NEGATIVE_JA: &[&str] = &["申し訳", "すみません", "残念", "できません", "休業"];

/// Lexical sentiment fallback: seed word lists per language, never null.
fn fallback_sentiment(clean: &str, language: Language) -> EmotionTag {
    let lowered = clean.to_lowercase();
    let (positive, negative) = match language {
        Language::English => (POSITIVE_EN, NEGATIVE_EN),
        Language::Japanese => (POSITIVE_JA, NEGATIVE_JA),
    };
    let pos = positive.iter().filter(|w| lowered.contains(*w)).count();
    let neg = negative.iter().filter(|w| lowered.contains(*w)).count();
    let emotion = if neg > pos {
        "apologetic"
    } else if pos > 0 {
        "happy"
    } else {
        "neutral"
    };
    EmotionTag {
        emotion: emotion.to_string(),
        intensity: if pos + neg > 0 { 0.5 } else { 0.3 },
        span_start: 0,
        span_end: clean.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ordered_tags_and_clean_text() {
        let parsed = parse_emotion_markup(
            "[happy:0.8] Welcome to the center! [neutral] The cafe is on the second floor.",
            Language::English,
        );
        assert_eq!(parsed.tags.len(), 2);
        assert_eq!(parsed.tags[0].emotion, "happy");
        assert!((parsed.tags[0].intensity - 0.8).abs() < 1e-6);
        assert_eq!(parsed.tags[1].emotion, "neutral");
        assert!(!parsed.clean_text.contains('['));
        assert!(parsed.clean_text.starts_with("Welcome"));
        assert_eq!(parsed.primary.emotion, "happy");
    }

    #[test]
    fn no_tags_yields_fallback_primary() {
        let parsed = parse_emotion_markup("The exhibition opens at ten.", Language::English);
        assert!(parsed.tags.is_empty());
        assert_eq!(parsed.primary.emotion, "neutral");
        let parsed = parse_emotion_markup("申し訳ありませんが、本日は休業です。", Language::Japanese);
        assert_eq!(parsed.primary.emotion, "apologetic");
    }

    #[test]
    fn unknown_brackets_are_preserved() {
        let parsed = parse_emotion_markup("See the map [1] near the entrance.", Language::English);
        assert!(parsed.tags.is_empty());
        assert!(parsed.clean_text.contains("[1]"));
    }

    #[test]
    fn markup_round_trip_is_lossless() {
        let source = "[happy:0.80] Hello there. [thinking:0.40] Let me check that for you.";
        let parsed = parse_emotion_markup(source, Language::English);
        let rebuilt = parse_emotion_markup(&parsed.to_markup(), Language::English);
        assert_eq!(rebuilt.clean_text, parsed.clean_text);
        assert_eq!(rebuilt.tags, parsed.tags);
    }

    #[test]
    fn intensity_defaults_when_omitted() {
        let parsed = parse_emotion_markup("[sad] I'm afraid that's closed.", Language::English);
        assert!((parsed.tags[0].intensity - DEFAULT_INTENSITY).abs() < 1e-6);
    }
}
