//! The voice turn workflow: gate → router → responder → synthesizer →
//! pipeline → playback.
//!
//! One call to [`VoiceTurnWorkflow::handle_turn`] takes a raw recognition
//! result through the whole pipeline. Invalid recognitions never reach a
//! responder; they get a canned clarification sentence instead. Memory writes
//! along the answer path are best-effort and never block delivery.

use kiosk_agents::{
    AnswerRequest, IntentRouter, ResponderAnswer, ResponderKind, ResponderRegistry,
    RoutingDecision,
};
use kiosk_core::{
    BoundedListener, KioskConfig, KioskError, KioskResult, Language, MemoryStore,
    RecognitionResult, Role, Session, SessionManager, SpeechToText, TextToSpeech, TurnMetadata,
    VoiceParams,
};
use kiosk_voice::{
    PlaybackQueue, QualityVerdict, ResponseSynthesizer, SpeechQualityGate, StreamingAudioPipeline,
};
use std::sync::Arc;
use tracing::{info, warn};

/// What one turn produced, for logging and the UI layer.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub spoken_text: String,
    pub emotion: String,
    pub verdict: QualityVerdict,
    /// `None` when the gate rejected the input and no routing happened.
    pub decision: Option<RoutingDecision>,
    pub chunks: usize,
    pub truncated: bool,
}

pub struct VoiceTurnWorkflow {
    config: KioskConfig,
    gate: SpeechQualityGate,
    router: IntentRouter,
    registry: ResponderRegistry,
    memory: Arc<MemoryStore>,
    sessions: Arc<SessionManager>,
    pipeline: StreamingAudioPipeline,
    playback: Arc<PlaybackQueue>,
}

impl VoiceTurnWorkflow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: KioskConfig,
        memory: Arc<MemoryStore>,
        sessions: Arc<SessionManager>,
        router: IntentRouter,
        registry: ResponderRegistry,
        tts: Arc<dyn TextToSpeech>,
        playback: Arc<PlaybackQueue>,
    ) -> Self {
        let gate = SpeechQualityGate::new(config.stt_min_confidence);
        let pipeline =
            StreamingAudioPipeline::new(tts, VoiceParams::default(), config.synthesis_batch_size);
        Self {
            config,
            gate,
            router,
            registry,
            memory,
            sessions,
            pipeline,
            playback,
        }
    }

    pub fn begin_session(&self, language: Language) -> Session {
        self.sessions.create(language)
    }

    pub fn end_session(&self, session_id: &str) {
        self.sessions.end(session_id);
        self.memory.cleanup(session_id);
    }

    fn session_language(&self, session_id: &str) -> Language {
        self.sessions
            .get(session_id)
            .map(|s| s.language)
            .unwrap_or_else(|| Language::from_code(&self.config.default_language))
    }

    /// Recognize captured audio under the listening ceiling, then run the
    /// turn. A recognition that outlives the ceiling (or errors) becomes a
    /// failed result, which the gate answers with the take-your-time
    /// clarification instead of leaving the visitor hanging.
    pub async fn handle_audio_turn(
        &self,
        session_id: &str,
        stt: Arc<dyn SpeechToText>,
        audio: &[u8],
    ) -> KioskResult<TurnOutcome> {
        let language = self.session_language(session_id);
        let listener = BoundedListener::new(stt, self.config.listen_ceiling());
        let recognition = match listener.recognize(audio, language).await {
            Ok(r) => r,
            Err(e) => {
                warn!("recognition failed: {}", e);
                RecognitionResult::new("", 0.0, false)
            }
        };
        self.handle_turn(session_id, recognition).await
    }

    /// Run one full turn. An unknown or expired session id falls back to the
    /// configured default language with "new conversation" framing.
    pub async fn handle_turn(
        &self,
        session_id: &str,
        recognition: RecognitionResult,
    ) -> KioskResult<TurnOutcome> {
        let language = self.session_language(session_id);

        let verdict = self.gate.evaluate(&recognition, language);
        if !verdict.is_valid {
            let text = SpeechQualityGate::clarification_text(verdict.reason, language);
            self.memory.note(
                session_id,
                Role::Assistant,
                text,
                TurnMetadata {
                    emotion: Some("apologetic".to_string()),
                    confidence: Some(verdict.confidence),
                    ..Default::default()
                },
            );
            let (chunks, _) = self.speak(text, language, Some("apologetic")).await;
            self.sessions.touch(session_id);
            return Ok(TurnOutcome {
                spoken_text: text.to_string(),
                emotion: "apologetic".to_string(),
                verdict,
                decision: None,
                chunks,
                truncated: false,
            });
        }

        let transcript = recognition.transcript.trim().to_string();
        let decision = self.router.route(session_id, &transcript, language);
        if decision.language != language {
            self.sessions.set_language(session_id, decision.language);
        }
        self.memory.note(
            session_id,
            Role::User,
            &transcript,
            TurnMetadata {
                confidence: Some(recognition.confidence),
                request_type: decision.request_type.clone(),
                ..Default::default()
            },
        );

        // A resolved referent from an earlier clarification is folded into
        // the query so the responder sees the disambiguated subject.
        let query = match &decision.resolved_referent {
            Some(referent) => format!("{} {}", referent, transcript),
            None => transcript.clone(),
        };
        let request = AnswerRequest {
            session_id: session_id.to_string(),
            query,
            request_type: decision.request_type.clone(),
            language: decision.language,
            continuing: decision.continuing,
            options: decision.clarification_options.clone(),
        };

        let responder = self
            .registry
            .resolve(decision.target)
            .ok_or_else(|| KioskError::RoutingFailure("no responder installed".to_string()))?;
        let answer = match responder.answer(&request).await {
            Ok(a) => a,
            Err(e) => {
                warn!(target = decision.target.as_str(), "responder failed: {}", e);
                ResponderAnswer::apology(decision.language)
            }
        };

        // The clarification responder records its own turn together with the
        // offered options; everything else is noted here.
        if decision.target != ResponderKind::Clarification {
            self.memory.note(
                session_id,
                Role::Assistant,
                &answer.text,
                TurnMetadata {
                    emotion: Some(answer.emotion.clone()),
                    confidence: Some(answer.confidence),
                    request_type: decision.request_type.clone(),
                    ..Default::default()
                },
            );
        }

        let (chunks, truncated) = self
            .speak(&answer.text, decision.language, Some(&answer.emotion))
            .await;
        self.sessions.touch(session_id);
        info!(
            session_id,
            target = decision.target.as_str(),
            confidence = answer.confidence,
            chunks,
            "turn answered"
        );
        Ok(TurnOutcome {
            spoken_text: answer.text,
            emotion: answer.emotion,
            verdict,
            decision: Some(decision),
            chunks,
            truncated,
        })
    }

    /// Synthesize text and feed the resulting units into the playback queue
    /// in chunk-index order. Returns (chunk count, truncated).
    async fn speak(
        &self,
        text: &str,
        language: Language,
        emotion_hint: Option<&str>,
    ) -> (usize, bool) {
        let synthesizer = ResponseSynthesizer::new(
            language,
            self.config.chunk_byte_budget,
            self.config.answer_byte_cap,
        );
        let mut response = synthesizer.synthesize(text);
        // Untagged text falls back to lexical sentiment; the responder's own
        // emotion is the stronger signal when it has one.
        if response.tags.is_empty() {
            if let Some(emotion) = emotion_hint {
                for chunk in &mut response.chunks {
                    chunk.emotion = Some(emotion.to_string());
                }
            }
        }
        let count = response.chunks.len();
        let mut units = self.pipeline.stream(response.chunks, language);
        while let Some(unit) = units.recv().await {
            self.playback.add(unit, 0).await;
        }
        (count, response.truncated)
    }
}
