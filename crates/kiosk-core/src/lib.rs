//! # Kiosk Core — sessions, memory, configuration, and collaborator ports
//!
//! Shared foundation for the voice kiosk assistant. The voice pipeline
//! (`kiosk-voice`) and the responder layer (`kiosk-agents`) both build on the
//! types here; nothing in this crate touches audio devices or the network
//! directly except through the port traits in [`ports`].
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                     kiosk-gateway                      │
//! │   gate → router → responder → synthesizer → playback   │
//! └───────┬──────────────┬──────────────┬──────────────────┘
//!         │              │              │
//!   kiosk-voice    kiosk-agents    kiosk-core
//!                                  (sessions, memory, ports)
//! ```

pub mod config;
pub mod error;
pub mod knowledge;
pub mod language;
pub mod memory;
pub mod ports;
pub mod session;

pub use config::KioskConfig;
pub use error::{KioskError, KioskResult};
pub use knowledge::{KnowledgeStore, ScoredPassage, StaticKnowledgeStore};
pub use language::{detect_language, effective_language, Language};
pub use memory::{
    ContextOptions, ConversationTurn, MemoryStore, PromotionSink, Role, TurnMetadata,
};
pub use ports::{
    retry_with_backoff, BoundedListener, RecognitionResult, RetryPolicy, SearchHit, SpeechToText,
    StatusFeed, TtsAudio, TextToSpeech, VoiceParams, WebSearch,
};
pub use session::{Session, SessionManager};
