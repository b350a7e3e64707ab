//! Error types for the kiosk assistant core.
//!
//! The taxonomy follows the degradation contract of the pipeline: only
//! `Config` is fatal (a misconfigured speech backend at startup); everything
//! else is recovered locally by the caller — clarification turns, silent
//! fallback to general knowledge, answers without audio, logged-only memory
//! writes.

use thiserror::Error;

/// Result type alias for core operations.
pub type KioskResult<T> = Result<T, KioskError>;

/// Errors that can occur across the kiosk core.
#[derive(Error, Debug)]
pub enum KioskError {
    /// Startup configuration failure. The only fatal class: a malfunctioning
    /// speech backend is worse than no voice service.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Speech recognition output failed the quality gate. Recovered by
    /// emitting a clarification turn; never surfaced as a failure.
    #[error("Recognition invalid: {0}")]
    RecognitionInvalid(String),

    /// No responder could be confidently selected. Callers fall back to
    /// general knowledge.
    #[error("Routing failure: {0}")]
    RoutingFailure(String),

    /// A responder's secondary tool (web search, status feed) failed to
    /// initialize or call. The responder continues with remaining sources.
    #[error("Responder source unavailable: {0}")]
    SourceUnavailable(String),

    /// External TTS call failed. The text answer is still returned; audio is
    /// empty.
    #[error("Synthesis failure: {0}")]
    SynthesisFailure(String),

    /// Memory append failed. Fire-and-forget: logged only, never blocks
    /// answer delivery.
    #[error("Memory write failure: {0}")]
    MemoryWrite(String),

    /// Knowledge store lookup failure.
    #[error("Knowledge store error: {0}")]
    Knowledge(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for KioskError {
    fn from(err: config::ConfigError) -> Self {
        KioskError::Config(err.to_string())
    }
}
