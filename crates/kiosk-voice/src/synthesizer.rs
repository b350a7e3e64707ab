//! Response synthesizer: emotion parse → speech sanitize → sentence chunking.
//!
//! Raw generation output is not speech-safe: it may carry emotion markers,
//! markdown, and arbitrary length. This module turns it into an ordered list
//! of [`SpeechChunk`]s, each under the hard byte budget of one synthesis
//! call, with chunk ordering significant end-to-end.

use crate::emotion::{parse_emotion_markup, EmotionTag, ParsedEmotion};
use kiosk_core::Language;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A bounded slice of answer text sized to fit one speech-synthesis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechChunk {
    pub index: usize,
    pub text: String,
    pub is_last: bool,
    pub emotion: Option<String>,
}

/// Fully prepared answer: clean text, emotion annotations, ordered chunks.
#[derive(Debug, Clone)]
pub struct SynthesizedResponse {
    /// Sanitized, marker-free text (the concatenation of all chunk texts).
    pub clean_text: String,
    pub tags: Vec<EmotionTag>,
    pub primary: EmotionTag,
    pub chunks: Vec<SpeechChunk>,
    /// True when the answer exceeded the total cap and was cut with a
    /// "details omitted" suffix.
    pub truncated: bool,
}

static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{1,6}\s*").unwrap());
static LIST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*(?:[-*+]|\d+[.)])\s+").unwrap());
static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").unwrap());
static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^```[^\n]*$").unwrap());
static BLANK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strip markdown emphasis/list/heading/link syntax and collapse blank lines.
pub fn sanitize_for_speech(text: &str) -> String {
    let s = FENCE_RE.replace_all(text, "");
    let s = LINK_RE.replace_all(&s, "$1");
    let s = HEADING_RE.replace_all(&s, "");
    let s = LIST_RE.replace_all(&s, "");
    let s = s.replace("**", "").replace("__", "").replace(['*', '`'], "");
    let s = BLANK_RE.replace_all(&s, "\n\n");
    s.trim().to_string()
}

fn omitted_suffix(language: Language) -> &'static str {
    match language {
        Language::Japanese => "（以下、詳細は省略します）",
        Language::English => " (further details omitted)",
    }
}

/// Split clean text into sentences, delimiters kept attached, concatenation
/// lossless.
fn split_sentences(text: &str, language: Language) -> Vec<String> {
    let delimiters = language.sentence_delimiters();
    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        current.push(c);
        if delimiters.contains(&c) {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }
    sentences
}

/// Split an oversized sentence at char boundaries under `budget` bytes.
fn split_oversized(sentence: &str, budget: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    for c in sentence.chars() {
        if current.len() + c.len_utf8() > budget {
            parts.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Emotion parse + sanitize + chunk, in that order.
#[derive(Debug, Clone)]
pub struct ResponseSynthesizer {
    language: Language,
    /// Hard byte budget for one synthesis call.
    chunk_byte_budget: usize,
    /// Total answer cap before truncation with the omitted suffix.
    answer_byte_cap: usize,
}

impl ResponseSynthesizer {
    pub fn new(language: Language, chunk_byte_budget: usize, answer_byte_cap: usize) -> Self {
        Self {
            language,
            chunk_byte_budget,
            answer_byte_cap,
        }
    }

    /// Prepare raw generated text for the streaming pipeline.
    pub fn synthesize(&self, raw: &str) -> SynthesizedResponse {
        let parsed: ParsedEmotion = parse_emotion_markup(raw, self.language);
        let mut clean = sanitize_for_speech(&parsed.clean_text);

        let mut truncated = false;
        if clean.len() > self.answer_byte_cap {
            clean = self.truncate_at_sentence(&clean);
            clean.push_str(omitted_suffix(self.language));
            truncated = true;
        }

        let chunks = self.chunk(&clean, &parsed);
        SynthesizedResponse {
            clean_text: clean,
            tags: parsed.tags,
            primary: parsed.primary,
            chunks,
            truncated,
        }
    }

    fn truncate_at_sentence(&self, clean: &str) -> String {
        let budget = self
            .answer_byte_cap
            .saturating_sub(omitted_suffix(self.language).len());
        let mut kept = String::new();
        for sentence in split_sentences(clean, self.language) {
            if kept.len() + sentence.len() > budget {
                break;
            }
            kept.push_str(&sentence);
        }
        if kept.is_empty() {
            // Single giant sentence: keep as many chars as fit.
            kept = split_oversized(clean, budget)
                .into_iter()
                .next()
                .unwrap_or_default();
        }
        kept
    }

    fn chunk(&self, clean: &str, parsed: &ParsedEmotion) -> Vec<SpeechChunk> {
        if clean.is_empty() {
            return Vec::new();
        }
        let mut pieces: Vec<String> = Vec::new();
        let mut current = String::new();
        for sentence in split_sentences(clean, self.language) {
            if sentence.len() > self.chunk_byte_budget {
                if !current.is_empty() {
                    pieces.push(std::mem::take(&mut current));
                }
                pieces.extend(split_oversized(&sentence, self.chunk_byte_budget));
                continue;
            }
            if current.len() + sentence.len() > self.chunk_byte_budget && !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            current.push_str(&sentence);
        }
        if !current.is_empty() {
            pieces.push(current);
        }

        let total: usize = pieces.iter().map(|p| p.len()).sum();
        let count = pieces.len();
        let mut offset = 0usize;
        pieces
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let emotion = Some(self.emotion_at(parsed, offset, total).emotion.clone());
                offset += text.len();
                SpeechChunk {
                    index,
                    text,
                    is_last: index + 1 == count,
                    emotion,
                }
            })
            .collect()
    }

    /// Emotion tag covering a byte offset, mapped proportionally from the
    /// sanitized text back onto the tag spans (sanitizing shifts offsets, so
    /// exact positions are not preserved; proportional mapping is close
    /// enough for expression coloring).
    fn emotion_at<'a>(
        &self,
        parsed: &'a ParsedEmotion,
        offset: usize,
        total: usize,
    ) -> &'a EmotionTag {
        if parsed.tags.is_empty() || total == 0 {
            return &parsed.primary;
        }
        let clean_len = parsed.clean_text.len().max(1);
        let mapped = offset * clean_len / total;
        parsed
            .tags
            .iter()
            .rev()
            .find(|t| t.span_start <= mapped)
            .unwrap_or(&parsed.primary)
    }
}
