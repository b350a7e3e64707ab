//! Speech service backends.
//!
//! `HttpSpeechService` talks to an OpenAI-compatible speech API (Whisper-style
//! `/audio/transcriptions`, `/audio/speech`). The placeholder backends keep
//! the whole stack runnable offline and deterministic under test.

use crate::error::{VoiceError, VoiceResult};
use async_trait::async_trait;
use kiosk_core::{
    KioskError, KioskResult, Language, RecognitionResult, SpeechToText, TextToSpeech, TtsAudio,
    VoiceParams,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_STT_MODEL: &str = "whisper-1";
const DEFAULT_TTS_MODEL: &str = "gpt-4o-mini-tts";

/// Transcription endpoints report no per-utterance confidence; a successful
/// transcription is treated as high-confidence and the quality gate judges
/// the transcript on its own merits.
const HTTP_STT_CONFIDENCE: f32 = 0.9;

/// Connection settings for the speech API, read from the environment.
#[derive(Debug, Clone)]
pub struct SpeechServiceConfig {
    pub base_url: String,
    pub api_key: String,
    pub stt_model: String,
    pub tts_model: String,
}

impl SpeechServiceConfig {
    /// Read `KIOSK_SPEECH_*` variables. A missing API key is a fatal
    /// configuration error; everything else has a default.
    pub fn from_env() -> VoiceResult<Self> {
        let api_key = std::env::var("KIOSK_SPEECH_API_KEY").map_err(|_| {
            VoiceError::Config("KIOSK_SPEECH_API_KEY is not set".to_string())
        })?;
        Ok(Self {
            base_url: std::env::var("KIOSK_SPEECH_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_key,
            stt_model: std::env::var("KIOSK_SPEECH_STT_MODEL")
                .unwrap_or_else(|_| DEFAULT_STT_MODEL.to_string()),
            tts_model: std::env::var("KIOSK_SPEECH_TTS_MODEL")
                .unwrap_or_else(|_| DEFAULT_TTS_MODEL.to_string()),
        })
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// STT + TTS over one OpenAI-compatible HTTP endpoint.
pub struct HttpSpeechService {
    client: reqwest::Client,
    config: SpeechServiceConfig,
}

impl HttpSpeechService {
    pub fn new(config: SpeechServiceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SpeechToText for HttpSpeechService {
    async fn recognize(
        &self,
        audio: &[u8],
        language_hint: Language,
    ) -> KioskResult<RecognitionResult> {
        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| KioskError::RecognitionInvalid(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.config.stt_model.clone())
            .text("language", language_hint.code());

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "transcription request rejected");
            return Ok(RecognitionResult::new("", 0.0, false));
        }
        let body: TranscriptionResponse = response.json().await?;
        debug!(chars = body.text.len(), "transcription received");
        Ok(RecognitionResult::new(body.text, HTTP_STT_CONFIDENCE, true))
    }
}

#[async_trait]
impl TextToSpeech for HttpSpeechService {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceParams,
        emotion_hint: Option<&str>,
        _language: Language,
    ) -> KioskResult<TtsAudio> {
        let mut body = json!({
            "model": self.config.tts_model,
            "input": text,
            "voice": voice.voice,
            "speed": voice.speed,
            "response_format": "pcm",
        });
        if let Some(emotion) = emotion_hint {
            body["instructions"] = json!(format!("Speak in a {} tone.", emotion));
        }

        let response = self
            .client
            .post(format!("{}/audio/speech", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "speech request rejected");
            return Ok(TtsAudio::default());
        }
        let audio = response.bytes().await?.to_vec();
        Ok(TtsAudio {
            success: true,
            audio,
        })
    }
}

/// STT stand-in returning a fixed transcript.
pub struct PlaceholderSpeechToText {
    pub transcript: String,
    pub confidence: f32,
}

impl PlaceholderSpeechToText {
    pub fn new(transcript: impl Into<String>, confidence: f32) -> Self {
        Self {
            transcript: transcript.into(),
            confidence,
        }
    }
}

#[async_trait]
impl SpeechToText for PlaceholderSpeechToText {
    async fn recognize(
        &self,
        _audio: &[u8],
        _language_hint: Language,
    ) -> KioskResult<RecognitionResult> {
        Ok(RecognitionResult::new(
            self.transcript.clone(),
            self.confidence,
            true,
        ))
    }
}

/// TTS stand-in emitting silent PCM sized to the text length, so the timed
/// playback sink produces realistic durations.
pub struct PlaceholderTextToSpeech {
    bytes_per_char: usize,
}

impl Default for PlaceholderTextToSpeech {
    fn default() -> Self {
        // ~25ms of 16kHz 16-bit mono per character.
        Self { bytes_per_char: 800 }
    }
}

#[async_trait]
impl TextToSpeech for PlaceholderTextToSpeech {
    async fn synthesize(
        &self,
        text: &str,
        _voice: &VoiceParams,
        _emotion_hint: Option<&str>,
        _language: Language,
    ) -> KioskResult<TtsAudio> {
        let chars = text.chars().count().max(1);
        Ok(TtsAudio {
            success: true,
            audio: vec![0u8; chars * self.bytes_per_char],
        })
    }
}
