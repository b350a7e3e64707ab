//! # Kiosk Voice — from raw recognition result to ordered, interruptible speech
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  RecognitionResult → Quality Gate → (clarification | router) │
//! │                                                              │
//! │  answer text → Synthesizer (emotion parse / sanitize /       │
//! │                chunk under byte budget)                      │
//! │            → Streaming Pipeline (batched TTS, index order)   │
//! │            → Playback Queue (priority FIFO, skip, visemes)   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ordering guarantee: audio units reach the playback queue in ascending
//! chunk-index order for any permutation of TTS completion order.

pub mod backends;
pub mod emotion;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod playback;
pub mod synthesizer;
pub mod viseme;

pub use backends::{HttpSpeechService, PlaceholderSpeechToText, PlaceholderTextToSpeech, SpeechServiceConfig};
pub use emotion::{EmotionTag, ParsedEmotion, EMOTION_VOCABULARY};
pub use error::{VoiceError, VoiceResult};
pub use gate::{QualityReason, QualityVerdict, SpeechQualityGate};
pub use pipeline::{AudioUnit, StreamingAudioPipeline};
pub use playback::{AvatarSink, NullAvatar, PlaybackQueue, PlaybackSink, TimedSink};
pub use synthesizer::{ResponseSynthesizer, SpeechChunk, SynthesizedResponse};
pub use viseme::{VisemeFrame, VisemeTimeline, VISEME_CLOSED};
