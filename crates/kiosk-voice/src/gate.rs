//! Speech quality gate: validates a raw recognition result before anything
//! downstream trusts it.
//!
//! The policy is ordered, first match wins:
//! 1. failed recognition or blank transcript → `no_transcript`
//! 2. confidence below the configured floor → `low_confidence`
//! 3. trimmed length < 2 characters → `too_short`
//! 4. gibberish pattern (filler-only, symbols-only, 5+ repeated chars) → `gibberish`
//! 5. "user signaled confusion" pattern → `user_unclear`
//! 6. otherwise valid
//!
//! On invalid input the gate hands back a canned clarification sentence in the
//! session's language instead of invoking any responder: the character stays
//! visibly responsive without fabricating an answer to noise.
//!
//! The gibberish and unclear pattern lists are a seed policy table, partial by
//! design; extend the tables, not the match logic.

use kiosk_core::{Language, RecognitionResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Why a recognition result was rejected (or `None` when valid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityReason {
    None,
    NoTranscript,
    TooShort,
    Gibberish,
    LowConfidence,
    UserUnclear,
}

impl QualityReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityReason::None => "none",
            QualityReason::NoTranscript => "no_transcript",
            QualityReason::TooShort => "too_short",
            QualityReason::Gibberish => "gibberish",
            QualityReason::LowConfidence => "low_confidence",
            QualityReason::UserUnclear => "user_unclear",
        }
    }
}

/// Ephemeral verdict, created and consumed within one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityVerdict {
    pub is_valid: bool,
    pub reason: QualityReason,
    pub confidence: f32,
}

static UNCLEAR_EN: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^(what|huh|eh)\??$",
        r"(?i)^(pardon( me)?|sorry|excuse me)\??$",
        r"(?i)^(come|say) (that )?again\??$",
        r"(?i)^i (didn'?t|don'?t) (hear|understand|get)( (you|that|it))?\.?$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static UNCLEAR_JA: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^え{1,3}[?？]?$",
        r"^はい[?？]$",
        r"^(なに|何)[?？]?$",
        r"^もう(一度|いちど)(お願いします)?[?？]?$",
        r"^聞こえ(ない|ません)(でした)?$",
        r"^わか(らない|りません)$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const FILLERS_EN: &[&str] = &["uh", "um", "umm", "hmm", "hm", "er", "ah", "mm"];
const FILLERS_JA: &[&str] = &["えー", "えーと", "えっと", "あー", "あのー", "うーん", "んー"];

/// True when any character repeats `run` or more times consecutively.
/// (The regex crate has no backreferences, so this is a plain scan.)
fn has_repeated_run(text: &str, run: usize) -> bool {
    let mut prev: Option<char> = None;
    let mut count = 0usize;
    for c in text.chars() {
        if Some(c) == prev {
            count += 1;
            if count >= run {
                return true;
            }
        } else {
            prev = Some(c);
            count = 1;
        }
    }
    count >= run
}

/// Gate configuration plus evaluation. The confidence floor comes from
/// `KioskConfig::stt_min_confidence` (deployment policy value 0.6).
#[derive(Debug, Clone)]
pub struct SpeechQualityGate {
    min_confidence: f32,
}

impl SpeechQualityGate {
    pub fn new(min_confidence: f32) -> Self {
        Self { min_confidence }
    }

    /// Evaluate one recognition result against the ordered policy.
    pub fn evaluate(&self, result: &RecognitionResult, language: Language) -> QualityVerdict {
        let transcript = result.transcript.trim();

        let reason = if !result.success || transcript.is_empty() {
            QualityReason::NoTranscript
        } else if result.confidence < self.min_confidence {
            QualityReason::LowConfidence
        } else if transcript.chars().count() < 2 {
            QualityReason::TooShort
        } else if self.is_gibberish(transcript, language) {
            QualityReason::Gibberish
        } else if Self::is_unclear_signal(transcript, language) {
            QualityReason::UserUnclear
        } else {
            QualityReason::None
        };

        let is_valid = reason == QualityReason::None;
        if !is_valid {
            debug!(
                reason = reason.as_str(),
                confidence = result.confidence,
                "recognition rejected by quality gate"
            );
        }
        QualityVerdict {
            is_valid,
            reason,
            confidence: result.confidence,
        }
    }

    fn is_gibberish(&self, transcript: &str, language: Language) -> bool {
        // A single letter after trimming (too_short already caught len < 2,
        // this catches e.g. "a a a" collapsing to one distinct letter).
        let distinct: Vec<char> = {
            let mut cs: Vec<char> =
                transcript.chars().filter(|c| !c.is_whitespace()).collect();
            cs.dedup();
            cs
        };
        if distinct.len() == 1 {
            return true;
        }

        // Filler-word-only utterance.
        let fillers = match language {
            Language::English => FILLERS_EN,
            Language::Japanese => FILLERS_JA,
        };
        let lowered = transcript.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| c.is_whitespace() || c == ',' || c == '、')
            .filter(|w| !w.is_empty())
            .collect();
        if !words.is_empty() && words.iter().all(|w| fillers.contains(w)) {
            return true;
        }

        // Only punctuation/symbols: not a single letter or digit in any
        // script. Text in the other deployment language must survive this
        // rule, or the router never sees it and the automatic language
        // switch can't happen.
        if !transcript.chars().any(char::is_alphanumeric) {
            return true;
        }

        // Any character repeated 5+ times consecutively.
        has_repeated_run(transcript, 5)
    }

    fn is_unclear_signal(transcript: &str, language: Language) -> bool {
        let patterns = match language {
            Language::English => &*UNCLEAR_EN,
            Language::Japanese => &*UNCLEAR_JA,
        };
        patterns.iter().any(|re| re.is_match(transcript))
    }

    /// Canned clarification sentence for an invalid verdict, in the session's
    /// language. Four templates: unclear-repeat, low-confidence-repeat,
    /// no-problem-take-your-time, generic-repeat.
    pub fn clarification_text(reason: QualityReason, language: Language) -> &'static str {
        match (language, reason) {
            (Language::Japanese, QualityReason::UserUnclear) => {
                "わかりにくくてすみません。もう一度言いますね。ご質問をどうぞ。"
            }
            (Language::Japanese, QualityReason::LowConfidence) => {
                "すみません、うまく聞き取れませんでした。もう一度ゆっくりお話しいただけますか？"
            }
            (Language::Japanese, QualityReason::NoTranscript) => {
                "大丈夫ですよ。ごゆっくりどうぞ。ご用があったらお声がけください。"
            }
            (Language::Japanese, _) => {
                "すみません、もう一度お願いできますか？"
            }
            (Language::English, QualityReason::UserUnclear) => {
                "Sorry if that was unclear. Let me know what you'd like to ask."
            }
            (Language::English, QualityReason::LowConfidence) => {
                "Sorry, I didn't quite catch that. Could you say it again a little more slowly?"
            }
            (Language::English, QualityReason::NoTranscript) => {
                "No problem, take your time. I'm here when you're ready."
            }
            (Language::English, _) => "Sorry, could you say that again?",
        }
    }

    /// All four templates for a language (used by tests and the UI preview).
    pub fn all_templates(language: Language) -> [&'static str; 4] {
        [
            Self::clarification_text(QualityReason::UserUnclear, language),
            Self::clarification_text(QualityReason::LowConfidence, language),
            Self::clarification_text(QualityReason::NoTranscript, language),
            Self::clarification_text(QualityReason::Gibberish, language),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> SpeechQualityGate {
        SpeechQualityGate::new(0.6)
    }

    fn rec(text: &str, confidence: f32) -> RecognitionResult {
        RecognitionResult::new(text, confidence, true)
    }

    #[test]
    fn failed_recognition_is_no_transcript() {
        let v = gate().evaluate(
            &RecognitionResult::new("anything", 0.9, false),
            Language::English,
        );
        assert!(!v.is_valid);
        assert_eq!(v.reason, QualityReason::NoTranscript);
    }

    #[test]
    fn blank_transcript_is_no_transcript() {
        let v = gate().evaluate(&rec("   ", 0.9), Language::English);
        assert_eq!(v.reason, QualityReason::NoTranscript);
    }

    #[test]
    fn low_confidence_always_rejected() {
        for conf in [0.0, 0.3, 0.59] {
            let v = gate().evaluate(&rec("what time do you open", conf), Language::English);
            assert!(!v.is_valid);
            assert_eq!(v.reason, QualityReason::LowConfidence);
        }
    }

    #[test]
    fn low_confidence_wins_over_later_rules() {
        // Policy is ordered: a short transcript below the floor reports
        // low_confidence, not too_short.
        let v = gate().evaluate(&rec("a", 0.2), Language::English);
        assert_eq!(v.reason, QualityReason::LowConfidence);
    }

    #[test]
    fn single_char_is_too_short() {
        let v = gate().evaluate(&rec("a", 0.9), Language::English);
        assert_eq!(v.reason, QualityReason::TooShort);
        let text = SpeechQualityGate::clarification_text(v.reason, Language::English);
        assert!(SpeechQualityGate::all_templates(Language::English).contains(&text));
    }

    #[test]
    fn repeated_chars_are_gibberish() {
        for t in ["aaaaa", "ふふふふふ", "heyyyyy there"] {
            let v = gate().evaluate(&rec(t, 0.9), Language::English);
            assert_eq!(v.reason, QualityReason::Gibberish, "case: {}", t);
        }
        // Four repeats is still fine.
        let v = gate().evaluate(&rec("heyyyy", 0.9), Language::English);
        assert_ne!(v.reason, QualityReason::Gibberish);
    }

    #[test]
    fn filler_only_is_gibberish() {
        let v = gate().evaluate(&rec("uh um hmm", 0.9), Language::English);
        assert_eq!(v.reason, QualityReason::Gibberish);
        let v = gate().evaluate(&rec("えーと あのー", 0.9), Language::Japanese);
        assert_eq!(v.reason, QualityReason::Gibberish);
    }

    #[test]
    fn symbols_only_is_gibberish() {
        let v = gate().evaluate(&rec("?!—…。", 0.9), Language::Japanese);
        assert_eq!(v.reason, QualityReason::Gibberish);
    }

    #[test]
    fn confusion_signals_are_user_unclear() {
        let v = gate().evaluate(&rec("pardon?", 0.9), Language::English);
        assert_eq!(v.reason, QualityReason::UserUnclear);
        let v = gate().evaluate(&rec("もう一度お願いします", 0.9), Language::Japanese);
        assert_eq!(v.reason, QualityReason::UserUnclear);
    }

    #[test]
    fn other_language_text_passes_the_gate() {
        // A Japanese speaker at an English-set kiosk must get through so the
        // router can detect the language and switch the session.
        let v = gate().evaluate(&rec("営業時間を教えてください", 0.9), Language::English);
        assert!(v.is_valid, "rejected as {:?}", v.reason);
        let v = gate().evaluate(&rec("what time do you open", 0.9), Language::Japanese);
        assert!(v.is_valid, "rejected as {:?}", v.reason);
    }

    #[test]
    fn normal_queries_pass() {
        let v = gate().evaluate(&rec("what are your opening hours", 0.82), Language::English);
        assert!(v.is_valid);
        assert_eq!(v.reason, QualityReason::None);
        let v = gate().evaluate(&rec("営業時間を教えてください", 0.75), Language::Japanese);
        assert!(v.is_valid);
    }
}
