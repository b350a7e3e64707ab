//! # Kiosk Agents — intent routing and specialist responders
//!
//! ```text
//! validated query ──► IntentRouter ──► RoutingDecision
//!                                        │
//!                       ┌────────────────┴───────────────┐
//!                       ▼                                ▼
//!                ResponderRegistry              ClarificationResponder
//!         (business / facility / event /        (options recorded in
//!          memory / general knowledge)           memory for follow-up)
//! ```
//!
//! Responders merge the curated knowledge store with a live source (web
//! search, status feed, calendar) and raise confidence only when both agree.
//! A missing or failing live source degrades silently to knowledge-only;
//! no content at all yields a low-confidence apology, never an invented
//! answer.

pub mod filter;
pub mod registry;
pub mod responder;
pub mod responders;
pub mod router;
pub mod search;

pub use filter::ContentFilter;
pub use registry::ResponderRegistry;
pub use responder::{AnswerRequest, Responder, ResponderAnswer, ResponderKind};
pub use responders::{
    BusinessInfoResponder, ClarificationResponder, EventResponder, FacilityResponder,
    GeneralKnowledgeResponder, MemoryRecallResponder,
};
pub use router::{AmbiguousReferent, IntentRouter, RoutingDecision};
pub use search::{HttpWebSearch, StaticStatusFeed};
