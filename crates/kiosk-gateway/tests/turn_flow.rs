//! End-to-end turn tests over the full gate → router → responder →
//! synthesizer → pipeline → playback path, with counting fakes in place of
//! the external collaborators.

use async_trait::async_trait;
use kiosk_agents::{
    AnswerRequest, ClarificationResponder, GeneralKnowledgeResponder, IntentRouter, Responder,
    ResponderAnswer, ResponderKind, ResponderRegistry,
};
use kiosk_core::{
    KioskConfig, KioskResult, Language, MemoryStore, RecognitionResult, SessionManager,
    SpeechToText,
};
use kiosk_gateway::VoiceTurnWorkflow;
use kiosk_voice::{
    NullAvatar, PlaceholderTextToSpeech, PlaybackQueue, SpeechQualityGate, TimedSink,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct CountingResponder {
    kind: ResponderKind,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Responder for CountingResponder {
    fn kind(&self) -> ResponderKind {
        self.kind
    }
    async fn answer(&self, _req: &AnswerRequest) -> KioskResult<ResponderAnswer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ResponderAnswer {
            text: "We open at nine in the morning.".to_string(),
            emotion: "happy".to_string(),
            confidence: 0.8,
            sources: vec!["guide".to_string()],
        })
    }
}

struct Fixture {
    workflow: VoiceTurnWorkflow,
    playback: Arc<PlaybackQueue>,
    memory: Arc<MemoryStore>,
    business_calls: Arc<AtomicUsize>,
    general_calls: Arc<AtomicUsize>,
}

fn fixture() -> Fixture {
    let config = KioskConfig {
        default_language: "en".to_string(),
        ..KioskConfig::default()
    };
    let memory = Arc::new(MemoryStore::new(
        config.memory_ttl(),
        config.context_max_turns,
        config.context_byte_cap,
    ));
    let sessions = Arc::new(SessionManager::new(config.memory_ttl()));
    let business_calls = Arc::new(AtomicUsize::new(0));
    let general_calls = Arc::new(AtomicUsize::new(0));

    let mut registry = ResponderRegistry::new();
    registry.register(Arc::new(CountingResponder {
        kind: ResponderKind::BusinessInfo,
        calls: Arc::clone(&business_calls),
    }));
    registry.register(Arc::new(CountingResponder {
        kind: ResponderKind::GeneralKnowledge,
        calls: Arc::clone(&general_calls),
    }));
    registry.register(Arc::new(ClarificationResponder::new(Arc::clone(&memory))));

    let router = IntentRouter::new(
        Arc::clone(&memory),
        config.clarification_threshold,
        config.language_switch_min_confidence,
    );
    let playback = Arc::new(PlaybackQueue::new(
        Arc::new(NullAvatar),
        Arc::new(TimedSink::new(32_000)),
        config.viseme_interval(),
        32_000,
    ));
    let workflow = VoiceTurnWorkflow::new(
        config,
        Arc::clone(&memory),
        sessions,
        router,
        registry,
        Arc::new(PlaceholderTextToSpeech::default()),
        Arc::clone(&playback),
    );
    Fixture {
        workflow,
        playback,
        memory,
        business_calls,
        general_calls,
    }
}

#[tokio::test]
async fn low_confidence_input_never_reaches_a_responder() {
    let f = fixture();
    let session = f.workflow.begin_session(Language::English);
    let outcome = f
        .workflow
        .handle_turn(
            &session.session_id,
            RecognitionResult::new("what are your opening hours", 0.3, true),
        )
        .await
        .unwrap();

    assert!(!outcome.verdict.is_valid);
    assert!(outcome.decision.is_none());
    assert_eq!(f.business_calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.general_calls.load(Ordering::SeqCst), 0);
    // The spoken clarification is one of the canned templates.
    assert!(SpeechQualityGate::all_templates(Language::English)
        .contains(&outcome.spoken_text.as_str()));
    // The clarification was synthesized and queued.
    assert!(outcome.chunks >= 1);
    assert!(!f.playback.is_empty().await);
}

#[tokio::test]
async fn valid_business_query_flows_to_playback() {
    let f = fixture();
    let session = f.workflow.begin_session(Language::English);
    let outcome = f
        .workflow
        .handle_turn(
            &session.session_id,
            RecognitionResult::new("what time do you open", 0.9, true),
        )
        .await
        .unwrap();

    assert!(outcome.verdict.is_valid);
    let decision = outcome.decision.unwrap();
    assert_eq!(decision.target, ResponderKind::BusinessInfo);
    assert_eq!(f.business_calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.emotion, "happy");
    assert!(outcome.chunks >= 1);
    assert_eq!(f.playback.len().await, outcome.chunks);

    // Both sides of the exchange landed in memory.
    let turns = f.memory.recent_turns(&session.session_id);
    assert!(turns.iter().any(|t| t.content.contains("what time do you open")));
    assert!(turns.iter().any(|t| t.content.contains("nine in the morning")));
}

#[tokio::test(start_paused = true)]
async fn slow_recognition_hits_the_listening_ceiling() {
    struct StalledStt;

    #[async_trait]
    impl SpeechToText for StalledStt {
        async fn recognize(
            &self,
            _audio: &[u8],
            _language_hint: Language,
        ) -> KioskResult<RecognitionResult> {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok(RecognitionResult::new("far too late", 0.9, true))
        }
    }

    let f = fixture();
    let session = f.workflow.begin_session(Language::English);
    let outcome = f
        .workflow
        .handle_audio_turn(&session.session_id, Arc::new(StalledStt), &[])
        .await
        .unwrap();

    // The ceiling (10s policy default) converts the stalled recognition into
    // a failed one; the gate answers with the take-your-time template.
    assert!(!outcome.verdict.is_valid);
    assert!(outcome.spoken_text.contains("take your time"));
    assert_eq!(f.business_calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.general_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_session_uses_default_language_framing() {
    let f = fixture();
    // No begin_session: the workflow falls back to the configured default.
    let outcome = f
        .workflow
        .handle_turn(
            "ghost-session",
            RecognitionResult::new("tell me something fun", 0.9, true),
        )
        .await
        .unwrap();
    let decision = outcome.decision.unwrap();
    assert_eq!(decision.target, ResponderKind::GeneralKnowledge);
    assert!(!decision.continuing);
    assert_eq!(f.general_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn responder_failure_degrades_to_spoken_apology() {
    struct FailingResponder;

    #[async_trait]
    impl Responder for FailingResponder {
        fn kind(&self) -> ResponderKind {
            ResponderKind::GeneralKnowledge
        }
        async fn answer(&self, _req: &AnswerRequest) -> KioskResult<ResponderAnswer> {
            Err(kiosk_core::KioskError::SourceUnavailable(
                "backend offline".to_string(),
            ))
        }
    }

    let config = KioskConfig {
        default_language: "en".to_string(),
        ..KioskConfig::default()
    };
    let memory = Arc::new(MemoryStore::new(
        config.memory_ttl(),
        config.context_max_turns,
        config.context_byte_cap,
    ));
    let sessions = Arc::new(SessionManager::new(config.memory_ttl()));
    let mut registry = ResponderRegistry::new();
    registry.register(Arc::new(FailingResponder));
    let router = IntentRouter::new(
        Arc::clone(&memory),
        config.clarification_threshold,
        config.language_switch_min_confidence,
    );
    let playback = Arc::new(PlaybackQueue::new(
        Arc::new(NullAvatar),
        Arc::new(TimedSink::new(32_000)),
        config.viseme_interval(),
        32_000,
    ));
    let workflow = VoiceTurnWorkflow::new(
        config,
        memory,
        sessions,
        router,
        registry,
        Arc::new(PlaceholderTextToSpeech::default()),
        playback,
    );

    let session = workflow.begin_session(Language::English);
    let outcome = workflow
        .handle_turn(
            &session.session_id,
            RecognitionResult::new("tell me something fun", 0.9, true),
        )
        .await
        .unwrap();
    assert_eq!(outcome.emotion, "apologetic");
    assert!(outcome.spoken_text.contains("sorry") || outcome.spoken_text.contains("Sorry"));
}

#[tokio::test]
async fn clarification_options_survive_to_the_next_turn() {
    let config = KioskConfig {
        default_language: "en".to_string(),
        ..KioskConfig::default()
    };
    let memory = Arc::new(MemoryStore::new(
        config.memory_ttl(),
        config.context_max_turns,
        config.context_byte_cap,
    ));
    let sessions = Arc::new(SessionManager::new(config.memory_ttl()));
    let facility_calls = Arc::new(AtomicUsize::new(0));

    let mut registry = ResponderRegistry::new();
    registry.register(Arc::new(ClarificationResponder::new(Arc::clone(&memory))));
    registry.register(Arc::new(CountingResponder {
        kind: ResponderKind::Facility,
        calls: Arc::clone(&facility_calls),
    }));
    registry.register(Arc::new(GeneralKnowledgeResponder::new(
        Arc::new(kiosk_core::StaticKnowledgeStore::new()),
        Arc::clone(&memory),
    )));

    let router = IntentRouter::new(
        Arc::clone(&memory),
        config.clarification_threshold,
        config.language_switch_min_confidence,
    )
    .with_ambiguous_referent(kiosk_agents::AmbiguousReferent {
        triggers: vec!["hall".to_string()],
        options: vec!["Main Hall (2F)".to_string(), "Event Hall (B1)".to_string()],
        kind: ResponderKind::Facility,
    });
    let playback = Arc::new(PlaybackQueue::new(
        Arc::new(NullAvatar),
        Arc::new(TimedSink::new(32_000)),
        config.viseme_interval(),
        32_000,
    ));
    let workflow = VoiceTurnWorkflow::new(
        config,
        Arc::clone(&memory),
        sessions,
        router,
        registry,
        Arc::new(PlaceholderTextToSpeech::default()),
        playback,
    );

    let session = workflow.begin_session(Language::English);
    let first = workflow
        .handle_turn(
            &session.session_id,
            RecognitionResult::new("where is the hall", 0.9, true),
        )
        .await
        .unwrap();
    assert_eq!(
        first.decision.as_ref().unwrap().target,
        ResponderKind::Clarification
    );
    assert!(first.spoken_text.contains("Main Hall"));
    assert_eq!(facility_calls.load(Ordering::SeqCst), 0);

    let second = workflow
        .handle_turn(
            &session.session_id,
            RecognitionResult::new("the second please", 0.9, true),
        )
        .await
        .unwrap();
    let decision = second.decision.unwrap();
    assert_eq!(decision.target, ResponderKind::Facility);
    assert_eq!(decision.resolved_referent.as_deref(), Some("Event Hall (B1)"));
    assert_eq!(facility_calls.load(Ordering::SeqCst), 1);
}
