//! Collaborator ports: typed interfaces for the external services the kiosk
//! consumes, injected explicitly at construction (no ad-hoc registries).
//!
//! All outbound calls to best-effort feeds go through [`retry_with_backoff`]:
//! bounded attempts, exponential delay, and the caller fails soft (empty or
//! cached data) rather than aborting the turn.

use crate::error::{KioskError, KioskResult};
use crate::language::Language;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Raw output of the speech-recognition collaborator for one utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub transcript: String,
    /// Recognition confidence in [0, 1].
    pub confidence: f32,
    pub success: bool,
}

impl RecognitionResult {
    pub fn new(transcript: impl Into<String>, confidence: f32, success: bool) -> Self {
        Self {
            transcript: transcript.into(),
            confidence: confidence.clamp(0.0, 1.0),
            success,
        }
    }
}

/// Voice parameters passed to the TTS collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceParams {
    /// Voice id understood by the backend (e.g. "shimmer").
    pub voice: String,
    /// Playback speed multiplier.
    pub speed: f32,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            voice: "shimmer".to_string(),
            speed: 1.0,
        }
    }
}

/// Synthesized audio for one speech chunk.
#[derive(Debug, Clone, Default)]
pub struct TtsAudio {
    pub success: bool,
    pub audio: Vec<u8>,
}

/// Speech-to-text collaborator: `(audioBytes, languageHint) -> RecognitionResult`.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn recognize(&self, audio: &[u8], language_hint: Language)
        -> KioskResult<RecognitionResult>;
}

/// Text-to-speech collaborator: `(text, voiceParams, emotionHint) -> audio`.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceParams,
        emotion_hint: Option<&str>,
        language: Language,
    ) -> KioskResult<TtsAudio>;
}

/// Speech-to-text decorator enforcing the listening-phase ceiling
/// (`KioskConfig::listen_ceiling`, deployment policy 10 s). A recognition
/// call that outlives the ceiling resolves to a failed result, which the
/// quality gate turns into a "take your time" clarification.
pub struct BoundedListener {
    stt: Arc<dyn SpeechToText>,
    ceiling: Duration,
}

impl BoundedListener {
    pub fn new(stt: Arc<dyn SpeechToText>, ceiling: Duration) -> Self {
        Self { stt, ceiling }
    }
}

#[async_trait]
impl SpeechToText for BoundedListener {
    async fn recognize(
        &self,
        audio: &[u8],
        language_hint: Language,
    ) -> KioskResult<RecognitionResult> {
        match tokio::time::timeout(self.ceiling, self.stt.recognize(audio, language_hint)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(ceiling_secs = self.ceiling.as_secs(), "listening ceiling reached");
                Ok(RecognitionResult::new("", 0.0, false))
            }
        }
    }
}

/// One hit from the web-search collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Live web-search collaborator. Best-effort: responders must degrade
/// silently when this is unavailable.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, language: Language) -> KioskResult<Vec<SearchHit>>;
}

/// Live-status feed (facility occupancy, event calendar). Best-effort.
#[async_trait]
pub trait StatusFeed: Send + Sync {
    /// Current status line for a topic, if the feed knows it.
    async fn current_status(&self, topic: &str, language: Language)
        -> KioskResult<Option<String>>;
}

/// Retry policy for best-effort outbound calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
        }
    }
}

/// Run `op` with bounded exponential backoff. Returns the last error after
/// `max_attempts`; callers on the answer path convert that into empty/cached
/// data rather than propagating upward.
pub async fn retry_with_backoff<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> KioskResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = KioskResult<T>>,
{
    let mut delay = policy.initial_delay;
    let attempts = policy.max_attempts.max(1);
    let mut last_err = None;
    for attempt in 1..=attempts {
        match op().await {
            Ok(v) => {
                if attempt > 1 {
                    debug!(label, attempt, "retry succeeded");
                }
                return Ok(v);
            }
            Err(e) => {
                warn!(label, attempt, "attempt failed: {}", e);
                last_err = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
            }
        }
    }
    Err(last_err.unwrap_or_else(|| KioskError::SourceUnavailable(label.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct SlowStt {
        delay: Duration,
    }

    #[async_trait]
    impl SpeechToText for SlowStt {
        async fn recognize(
            &self,
            _audio: &[u8],
            _language_hint: Language,
        ) -> KioskResult<RecognitionResult> {
            tokio::time::sleep(self.delay).await;
            Ok(RecognitionResult::new("hello there", 0.9, true))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn listener_cuts_off_at_the_ceiling() {
        let listener = BoundedListener::new(
            Arc::new(SlowStt {
                delay: Duration::from_secs(30),
            }),
            Duration::from_secs(10),
        );
        let result = listener.recognize(&[], Language::English).await.unwrap();
        assert!(!result.success);
        assert!(result.transcript.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn listener_passes_fast_recognitions_through() {
        let listener = BoundedListener::new(
            Arc::new(SlowStt {
                delay: Duration::from_secs(1),
            }),
            Duration::from_secs(10),
        );
        let result = listener.recognize(&[], Language::English).await.unwrap();
        assert!(result.success);
        assert_eq!(result.transcript, "hello there");
    }

    #[tokio::test]
    async fn retry_stops_at_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
        };
        let res: KioskResult<()> = retry_with_backoff(policy, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(KioskError::SourceUnavailable("down".to_string())) }
        })
        .await;
        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_returns_first_success() {
        let calls = AtomicU32::new(0);
        let res = retry_with_backoff(RetryPolicy::default(), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(KioskError::SourceUnavailable("flaky".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(res, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
