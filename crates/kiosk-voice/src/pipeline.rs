//! Streaming audio pipeline: chunk → audio unit, ordered end-to-end.
//!
//! Chunks are synthesized in small parallel batches (concurrent outstanding
//! TTS requests, default 2) to bound load on the speech backend while still
//! pipelining latency. Batches are awaited and flushed in submission order,
//! not completion order — that is the core ordering guarantee: units arrive
//! on the channel in ascending chunk index for any permutation of completion
//! order. Cancellation is dropping the receiver; the producer stops at the
//! next send.

use crate::synthesizer::SpeechChunk;
use futures::future::join_all;
use kiosk_core::{Language, TextToSpeech, TtsAudio, VoiceParams};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Synthesized audio for one chunk. Produced 1:1 from a [`SpeechChunk`];
/// played strictly in `chunk_index` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioUnit {
    pub id: Uuid,
    pub chunk_index: usize,
    /// Encoded audio. Empty when synthesis failed; the answer text still
    /// stands and the caller tolerates answer-without-audio.
    pub audio: Vec<u8>,
    pub emotion: Option<String>,
    pub is_last: bool,
}

/// Converts speech chunks to audio units in ordered parallel batches.
pub struct StreamingAudioPipeline {
    tts: Arc<dyn TextToSpeech>,
    voice: VoiceParams,
    batch_size: usize,
    channel_capacity: usize,
}

impl StreamingAudioPipeline {
    pub fn new(tts: Arc<dyn TextToSpeech>, voice: VoiceParams, batch_size: usize) -> Self {
        Self {
            tts,
            voice,
            batch_size: batch_size.max(1),
            channel_capacity: 8,
        }
    }

    /// Start synthesizing `chunks`; returns the ordered unit stream. The
    /// producer task ends when all chunks are flushed or the receiver is
    /// dropped.
    pub fn stream(&self, chunks: Vec<SpeechChunk>, language: Language) -> mpsc::Receiver<AudioUnit> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let tts = Arc::clone(&self.tts);
        let voice = self.voice.clone();
        let batch_size = self.batch_size;

        tokio::spawn(async move {
            for batch in chunks.chunks(batch_size) {
                // Submission order within the batch is preserved by join_all,
                // regardless of which future finishes first.
                let futures = batch.iter().map(|chunk| {
                    let tts = Arc::clone(&tts);
                    let voice = voice.clone();
                    async move {
                        let audio = match tts
                            .synthesize(&chunk.text, &voice, chunk.emotion.as_deref(), language)
                            .await
                        {
                            Ok(TtsAudio { success: true, audio }) => audio,
                            Ok(TtsAudio { success: false, .. }) => {
                                warn!(chunk = chunk.index, "TTS reported failure; unit has no audio");
                                Vec::new()
                            }
                            Err(e) => {
                                warn!(chunk = chunk.index, "TTS call failed: {}; unit has no audio", e);
                                Vec::new()
                            }
                        };
                        AudioUnit {
                            id: Uuid::new_v4(),
                            chunk_index: chunk.index,
                            audio,
                            emotion: chunk.emotion.clone(),
                            is_last: chunk.is_last,
                        }
                    }
                });

                for unit in join_all(futures).await {
                    if tx.send(unit).await.is_err() {
                        debug!("unit stream cancelled; stopping synthesis");
                        return;
                    }
                }
            }
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kiosk_core::{KioskError, KioskResult};
    use std::time::Duration;

    /// Finishes later chunks first so completion order is the reverse of
    /// submission order within each batch.
    struct ReversedLatencyTts;

    #[async_trait]
    impl TextToSpeech for ReversedLatencyTts {
        async fn synthesize(
            &self,
            text: &str,
            _voice: &VoiceParams,
            _emotion_hint: Option<&str>,
            _language: Language,
        ) -> KioskResult<TtsAudio> {
            let index: u64 = text.trim().parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(40u64.saturating_sub(index * 7))).await;
            Ok(TtsAudio {
                success: true,
                audio: vec![index as u8; 4],
            })
        }
    }

    struct FailingTts;

    #[async_trait]
    impl TextToSpeech for FailingTts {
        async fn synthesize(
            &self,
            _text: &str,
            _voice: &VoiceParams,
            _emotion_hint: Option<&str>,
            _language: Language,
        ) -> KioskResult<TtsAudio> {
            Err(KioskError::SynthesisFailure("backend down".to_string()))
        }
    }

    fn chunks(n: usize) -> Vec<SpeechChunk> {
        (0..n)
            .map(|i| SpeechChunk {
                index: i,
                text: format!("{}", i),
                is_last: i + 1 == n,
                emotion: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn units_arrive_in_ascending_index_order() {
        let pipeline = StreamingAudioPipeline::new(
            Arc::new(ReversedLatencyTts),
            VoiceParams::default(),
            2,
        );
        let mut rx = pipeline.stream(chunks(5), Language::English);
        let mut seen = Vec::new();
        while let Some(unit) = rx.recv().await {
            seen.push(unit.chunk_index);
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn last_flag_survives_the_pipeline() {
        let pipeline =
            StreamingAudioPipeline::new(Arc::new(ReversedLatencyTts), VoiceParams::default(), 2);
        let mut rx = pipeline.stream(chunks(3), Language::English);
        let mut units = Vec::new();
        while let Some(u) = rx.recv().await {
            units.push(u);
        }
        assert!(units.last().unwrap().is_last);
        assert!(units.iter().take(2).all(|u| !u.is_last));
    }

    #[tokio::test]
    async fn tts_failure_yields_empty_audio_not_abort() {
        let pipeline =
            StreamingAudioPipeline::new(Arc::new(FailingTts), VoiceParams::default(), 2);
        let mut rx = pipeline.stream(chunks(2), Language::English);
        let mut units = Vec::new();
        while let Some(u) = rx.recv().await {
            units.push(u);
        }
        assert_eq!(units.len(), 2);
        assert!(units.iter().all(|u| u.audio.is_empty()));
    }
}
