//! Kiosk gateway binary: a console-driven demo loop over the full turn
//! pipeline. Typed lines stand in for recognition results; the playback
//! queue runs against the timed sink so speech takes realistic wall time.
//!
//! A misconfigured speech backend aborts startup. A malfunctioning voice
//! service is worse than no voice service; everything else degrades.

use kiosk_agents::{
    AmbiguousReferent, BusinessInfoResponder, ClarificationResponder, ContentFilter,
    EventResponder, FacilityResponder, GeneralKnowledgeResponder, HttpWebSearch, IntentRouter,
    MemoryRecallResponder, ResponderKind, ResponderRegistry, StaticStatusFeed,
};
use kiosk_core::{
    KioskConfig, KnowledgeStore, Language, MemoryStore, RecognitionResult, RetryPolicy,
    SessionManager, StaticKnowledgeStore, StatusFeed, TextToSpeech, WebSearch,
};
use kiosk_gateway::VoiceTurnWorkflow;
use kiosk_voice::{
    HttpSpeechService, NullAvatar, PlaceholderTextToSpeech, PlaybackQueue, SpeechServiceConfig,
    TimedSink,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

const PLAYBACK_BYTES_PER_SECOND: usize = 32_000;

fn demo_knowledge() -> StaticKnowledgeStore {
    let mut store = StaticKnowledgeStore::new();
    store.add(
        Language::Japanese,
        "guide-hours",
        "営業時間は9時から18時までです。最終入場は17時30分です。",
    );
    store.add(
        Language::Japanese,
        "guide-cafe",
        "カフェは2階、ギフトショップの隣にあります。",
    );
    store.add(
        Language::English,
        "guide-hours",
        "Opening hours are 9:00 to 18:00, with last entry at 17:30.",
    );
    store.add(
        Language::English,
        "guide-cafe",
        "The cafe is on the second floor, next to the gift shop.",
    );
    store.add(
        Language::English,
        "guide-events",
        "The light festival runs every evening this month from 19:00.",
    );
    store
}

fn demo_status_feed() -> StaticStatusFeed {
    let mut feed = StaticStatusFeed::new();
    feed.set(
        Language::English,
        "cafe",
        "the cafe currently has open tables.",
    );
    feed.set(Language::Japanese, "カフェ", "カフェは現在空席があります。");
    feed
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = KioskConfig::load()?;
    info!(app = %config.app_name, "kiosk starting");

    // Speech backend selection. Placeholder mode is an explicit opt-in;
    // otherwise a missing API key is fatal at startup.
    let tts: Arc<dyn TextToSpeech> =
        if std::env::var("KIOSK_SPEECH_MODE").as_deref() == Ok("placeholder") {
            info!("placeholder speech backend selected");
            Arc::new(PlaceholderTextToSpeech::default())
        } else {
            Arc::new(HttpSpeechService::new(SpeechServiceConfig::from_env()?))
        };

    let retry = RetryPolicy {
        max_attempts: config.retry_max_attempts,
        ..RetryPolicy::default()
    };
    let memory = Arc::new(
        MemoryStore::new(
            config.memory_ttl(),
            config.context_max_turns,
            config.context_byte_cap,
        ),
    );
    let sessions = Arc::new(SessionManager::new(config.memory_ttl()));
    let knowledge: Arc<dyn KnowledgeStore> = Arc::new(demo_knowledge());
    let status: Option<Arc<dyn StatusFeed>> = Some(Arc::new(demo_status_feed()));
    let search: Option<Arc<dyn WebSearch>> =
        HttpWebSearch::from_env().map(|s| Arc::new(s) as Arc<dyn WebSearch>);
    let filter = Arc::new(ContentFilter::new());

    let mut registry = ResponderRegistry::new();
    registry.register(Arc::new(BusinessInfoResponder::new(
        Arc::clone(&knowledge),
        search.clone(),
        Arc::clone(&filter),
        retry,
    )));
    registry.register(Arc::new(FacilityResponder::new(
        Arc::clone(&knowledge),
        status.clone(),
        Arc::clone(&filter),
        retry,
    )));
    registry.register(Arc::new(EventResponder::new(
        Arc::clone(&knowledge),
        status.clone(),
        retry,
    )));
    registry.register(Arc::new(GeneralKnowledgeResponder::new(
        Arc::clone(&knowledge),
        Arc::clone(&memory),
    )));
    registry.register(Arc::new(MemoryRecallResponder::new(Arc::clone(&memory))));
    registry.register(Arc::new(ClarificationResponder::new(Arc::clone(&memory))));

    let router = IntentRouter::new(
        Arc::clone(&memory),
        config.clarification_threshold,
        config.language_switch_min_confidence,
    )
    .with_ambiguous_referent(AmbiguousReferent {
        triggers: vec!["hall".to_string(), "ホール".to_string()],
        options: vec!["Main Hall (2F)".to_string(), "Event Hall (B1)".to_string()],
        kind: ResponderKind::Facility,
    });

    let playback = Arc::new(PlaybackQueue::new(
        Arc::new(NullAvatar),
        Arc::new(TimedSink::new(PLAYBACK_BYTES_PER_SECOND)),
        config.viseme_interval(),
        PLAYBACK_BYTES_PER_SECOND,
    ));
    let drain = playback.start_auto_play();

    let workflow = VoiceTurnWorkflow::new(
        config.clone(),
        memory,
        Arc::clone(&sessions),
        router,
        registry,
        tts,
        Arc::clone(&playback),
    );
    let session = workflow.begin_session(Language::from_code(&config.default_language));
    info!(session_id = %session.session_id, "demo session ready; type a query, or \"quit\"");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            break;
        }
        // Typed input stands in for a confident recognition result.
        let outcome = workflow
            .handle_turn(&session.session_id, RecognitionResult::new(&line, 0.9, true))
            .await?;
        println!("[{}] {}", outcome.emotion, outcome.spoken_text);
    }

    workflow.end_session(&session.session_id);
    playback.stop_auto_play();
    if let Some(handle) = drain {
        let _ = handle.await;
    }
    Ok(())
}
