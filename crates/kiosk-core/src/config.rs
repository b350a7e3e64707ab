//! Kiosk configuration. Load from TOML or env (`KIOSK__` prefix).
//!
//! Every policy threshold the pipeline depends on lives here so the hardcoded
//! values of the original deployment (0.6 STT accept, 0.98 language switch)
//! stay visible and tunable instead of being re-derived.

use crate::error::KioskResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Global kiosk configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KioskConfig {
    /// Display identity of the kiosk character (used in logs only).
    pub app_name: String,
    /// Default session language code ("ja" or "en").
    pub default_language: String,

    /// Minimum STT confidence below which the quality gate rejects a
    /// recognition result (`low_confidence`).
    pub stt_min_confidence: f32,
    /// Minimum detection confidence required before the router may switch a
    /// session's language automatically. Below this, language is sticky.
    pub language_switch_min_confidence: f32,
    /// Router confidence below which the clarification responder is entered.
    pub clarification_threshold: f32,

    /// Inactivity TTL for short-term memory, in seconds.
    pub memory_ttl_secs: u64,
    /// Cap on recent turns included in assembled context (~10 exchanges).
    pub context_max_turns: usize,
    /// Byte cap on the assembled context string.
    pub context_byte_cap: usize,

    /// Hard byte budget per speech-synthesis call.
    pub chunk_byte_budget: usize,
    /// Cap on total answer bytes before truncation with a "details omitted"
    /// suffix.
    pub answer_byte_cap: usize,
    /// Number of concurrent outstanding TTS requests per batch.
    pub synthesis_batch_size: usize,

    /// Viseme update cadence in milliseconds (~20 updates/sec).
    pub viseme_interval_ms: u64,
    /// Ceiling on a recording/listening phase, in seconds.
    pub listen_ceiling_secs: u64,
    /// Maximum attempts for best-effort outbound calls (exponential backoff).
    pub retry_max_attempts: u32,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            app_name: "Kiosk Guide".to_string(),
            default_language: "ja".to_string(),
            stt_min_confidence: 0.6,
            language_switch_min_confidence: 0.98,
            clarification_threshold: 0.45,
            memory_ttl_secs: 180,
            context_max_turns: 20,
            context_byte_cap: 6000,
            chunk_byte_budget: 4000,
            answer_byte_cap: 24_000,
            synthesis_batch_size: 2,
            viseme_interval_ms: 50,
            listen_ceiling_secs: 10,
            retry_max_attempts: 3,
        }
    }
}

impl KioskConfig {
    /// Load config from file and environment.
    /// Precedence: env `KIOSK_CONFIG` path > `config/kiosk.toml` > defaults,
    /// with `KIOSK__`-prefixed env vars overriding file values.
    pub fn load() -> KioskResult<Self> {
        let config_path =
            std::env::var("KIOSK_CONFIG").unwrap_or_else(|_| "config/kiosk".to_string());
        let defaults = Self::default();
        let builder = config::Config::builder()
            .set_default("app_name", defaults.app_name.clone())?
            .set_default("default_language", defaults.default_language.clone())?
            .set_default("stt_min_confidence", defaults.stt_min_confidence as f64)?
            .set_default(
                "language_switch_min_confidence",
                defaults.language_switch_min_confidence as f64,
            )?
            .set_default("clarification_threshold", defaults.clarification_threshold as f64)?
            .set_default("memory_ttl_secs", defaults.memory_ttl_secs as i64)?
            .set_default("context_max_turns", defaults.context_max_turns as i64)?
            .set_default("context_byte_cap", defaults.context_byte_cap as i64)?
            .set_default("chunk_byte_budget", defaults.chunk_byte_budget as i64)?
            .set_default("answer_byte_cap", defaults.answer_byte_cap as i64)?
            .set_default("synthesis_batch_size", defaults.synthesis_batch_size as i64)?
            .set_default("viseme_interval_ms", defaults.viseme_interval_ms as i64)?
            .set_default("listen_ceiling_secs", defaults.listen_ceiling_secs as i64)?
            .set_default("retry_max_attempts", defaults.retry_max_attempts as i64)?;

        let path = Path::new(&config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("KIOSK").separator("__"))
            .build()?;

        Ok(built.try_deserialize()?)
    }

    /// Memory TTL as a `Duration`.
    pub fn memory_ttl(&self) -> Duration {
        Duration::from_secs(self.memory_ttl_secs)
    }

    /// Viseme cadence as a `Duration`.
    pub fn viseme_interval(&self) -> Duration {
        Duration::from_millis(self.viseme_interval_ms)
    }

    /// Listening-phase ceiling as a `Duration`.
    pub fn listen_ceiling(&self) -> Duration {
        Duration::from_secs(self.listen_ceiling_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_policy() {
        let cfg = KioskConfig::default();
        assert!((cfg.stt_min_confidence - 0.6).abs() < f32::EPSILON);
        assert!((cfg.language_switch_min_confidence - 0.98).abs() < f32::EPSILON);
        assert_eq!(cfg.memory_ttl_secs, 180);
        assert_eq!(cfg.synthesis_batch_size, 2);
    }
}
