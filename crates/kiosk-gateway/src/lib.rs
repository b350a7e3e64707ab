//! # Kiosk Gateway — the turn workflow and process entry point
//!
//! Wires the pieces from `kiosk-core`, `kiosk-agents`, and `kiosk-voice`
//! into one pipeline:
//!
//! ```text
//! RecognitionResult → gate → router → responder → synthesizer
//!                       │                             │
//!                       └── clarification ────────────┤
//!                                                     ▼
//!                                      pipeline → playback queue → avatar
//! ```

pub mod workflow;

pub use workflow::{TurnOutcome, VoiceTurnWorkflow};
