//! Session language handling.
//!
//! The kiosk ships with Japanese and English. A session's language is sticky:
//! automatic switching happens only when detection confidence clears the
//! configured threshold (default 0.98), so recognition noise never flips the
//! language mid-conversation.

use serde::{Deserialize, Serialize};

/// Supported kiosk languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Japanese,
    English,
}

impl Language {
    /// BCP-47-ish code used by the speech collaborators.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Japanese => "ja",
            Language::English => "en",
        }
    }

    /// Parse a language code; unknown codes fall back to English.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "ja" | "ja-jp" | "jpn" => Language::Japanese,
            _ => Language::English,
        }
    }

    /// Sentence delimiters used by the speech chunker for this language.
    pub fn sentence_delimiters(&self) -> &'static [char] {
        match self {
            Language::Japanese => &['。', '！', '？', '!', '?', '.'],
            Language::English => &['.', '!', '?'],
        }
    }
}

/// Heuristic language detection over a transcript. Returns the detected
/// language and a confidence in [0, 1]. Short or mixed inputs score low so
/// the sticky-language rule keeps the session where it is.
pub fn detect_language(text: &str) -> (Language, f32) {
    let mut ja = 0usize;
    let mut en = 0usize;
    for c in text.chars() {
        if matches!(c,
            '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}' | '\u{4E00}'..='\u{9FFF}')
        {
            ja += 1;
        } else if c.is_ascii_alphabetic() {
            en += 1;
        }
    }
    let total = ja + en;
    if total == 0 {
        return (Language::English, 0.0);
    }
    let (lang, hits) = if ja >= en {
        (Language::Japanese, ja)
    } else {
        (Language::English, en)
    };
    let ratio = hits as f32 / total as f32;
    // Confidence grows with both purity and length; five characters of a
    // single script is still ambiguous, thirty is not.
    let length_factor = (total as f32 / 30.0).min(1.0);
    (lang, ratio * (0.7 + 0.3 * length_factor))
}

/// Sticky-language rule: switch to `detected` only when detection confidence
/// clears `threshold`, otherwise keep `current`.
pub fn effective_language(
    current: Language,
    detected: Language,
    confidence: f32,
    threshold: f32,
) -> Language {
    if detected != current && confidence >= threshold {
        detected
    } else {
        current
    }
}
