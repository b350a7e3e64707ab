//! Playback queue: ordered audio output with skip, clear, and avatar events.
//!
//! Units play strictly one at a time. While a unit plays, viseme frames are
//! emitted to the avatar collaborator on a fixed cadence; when the unit ends
//! for any reason (completed, skipped, cleared) the avatar receives exactly
//! one mouth-closed reset followed by one unit-ended event. Skip affects only
//! the unit currently playing; clear drops everything pending as well.

use crate::error::{VoiceError, VoiceResult};
use crate::pipeline::AudioUnit;
use crate::viseme::{VisemeTimeline, VISEME_CLOSED};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// Receives mouth shapes and expression changes while audio plays. The kiosk
/// avatar front end implements this; [`NullAvatar`] is the headless stand-in.
#[async_trait]
pub trait AvatarSink: Send + Sync {
    async fn on_viseme(&self, shape: &str, intensity: f32);
    async fn on_expression(&self, emotion: &str, weight: f32);
    async fn on_unit_started(&self, unit_id: Uuid);
    async fn on_unit_ended(&self, unit_id: Uuid);
}

/// Avatar sink that discards everything.
pub struct NullAvatar;

#[async_trait]
impl AvatarSink for NullAvatar {
    async fn on_viseme(&self, _shape: &str, _intensity: f32) {}
    async fn on_expression(&self, _emotion: &str, _weight: f32) {}
    async fn on_unit_started(&self, _unit_id: Uuid) {}
    async fn on_unit_ended(&self, _unit_id: Uuid) {}
}

/// Plays one unit's audio to the output device. `play` resolves when the
/// audio has finished; `stop` aborts an in-flight `play` early.
#[async_trait]
pub trait PlaybackSink: Send + Sync {
    async fn play(&self, audio: &[u8]) -> VoiceResult<()>;
    async fn stop(&self);
}

/// Sink that simulates playback by sleeping for the audio's wall-clock
/// duration, derived from the byte length and the PCM rate. Lets the queue
/// run headless and keeps its timing behavior testable.
pub struct TimedSink {
    bytes_per_second: usize,
    stop: Notify,
}

impl TimedSink {
    pub fn new(bytes_per_second: usize) -> Self {
        Self {
            bytes_per_second: bytes_per_second.max(1),
            stop: Notify::new(),
        }
    }
}

#[async_trait]
impl PlaybackSink for TimedSink {
    async fn play(&self, audio: &[u8]) -> VoiceResult<()> {
        let duration = Duration::from_secs_f64(audio.len() as f64 / self.bytes_per_second as f64);
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.stop.notified() => Ok(()),
        }
    }

    async fn stop(&self) {
        self.stop.notify_waiters();
    }
}

struct QueueItem {
    unit: AudioUnit,
    priority: u8,
    seq: u64,
}

/// Single-consumer playback queue. Ordering is priority descending, then
/// insertion order; one drain loop at a time (a second `start_auto_play` is
/// a no-op while the first is running).
pub struct PlaybackQueue {
    items: Mutex<Vec<QueueItem>>,
    notify_new: Notify,
    skip: Notify,
    /// Latched alongside the notification: `Notify::notify_waiters` stores no
    /// permit, so a skip landing while the drain loop is inside an avatar
    /// callback would otherwise be lost. Cleared when a unit starts.
    skip_requested: AtomicBool,
    draining: AtomicBool,
    playing: AtomicBool,
    stopped: AtomicBool,
    seq: AtomicU64,
    avatar: Arc<dyn AvatarSink>,
    sink: Arc<dyn PlaybackSink>,
    viseme_interval: Duration,
    bytes_per_second: usize,
}

impl PlaybackQueue {
    pub fn new(
        avatar: Arc<dyn AvatarSink>,
        sink: Arc<dyn PlaybackSink>,
        viseme_interval: Duration,
        bytes_per_second: usize,
    ) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            notify_new: Notify::new(),
            skip: Notify::new(),
            skip_requested: AtomicBool::new(false),
            draining: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            seq: AtomicU64::new(0),
            avatar,
            sink,
            viseme_interval,
            bytes_per_second: bytes_per_second.max(1),
        }
    }

    /// Enqueue a unit. Higher priority plays first; equal priority keeps
    /// insertion order.
    pub async fn add(&self, unit: AudioUnit, priority: u8) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        self.items.lock().await.push(QueueItem {
            unit,
            priority,
            seq,
        });
        self.notify_new.notify_one();
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Skip the unit currently playing. Pending units are untouched; if
    /// nothing is playing this is a no-op.
    pub fn skip(&self) {
        if self.playing.load(Ordering::SeqCst) {
            debug!("skip requested for current unit");
            self.skip_requested.store(true, Ordering::SeqCst);
            self.skip.notify_waiters();
        }
    }

    /// Drop all pending units and cut off the current one. The avatar ends
    /// up mouth-closed either way.
    pub async fn clear(&self) {
        self.items.lock().await.clear();
        if self.playing.load(Ordering::SeqCst) {
            self.skip_requested.store(true, Ordering::SeqCst);
            self.skip.notify_waiters();
        } else {
            self.avatar.on_viseme(VISEME_CLOSED, 0.0).await;
        }
    }

    /// Stop the drain loop after the current unit. Idempotent.
    pub fn stop_auto_play(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify_new.notify_waiters();
    }

    /// Start the background drain loop. Returns `None` when a loop is
    /// already running.
    pub fn start_auto_play(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        self.stopped.store(false, Ordering::SeqCst);
        let queue = Arc::clone(self);
        Some(tokio::spawn(async move {
            loop {
                if queue.stopped.load(Ordering::SeqCst) {
                    break;
                }
                let next = queue.pop_next().await;
                match next {
                    Some(item) => queue.play_unit(item.unit).await,
                    None => queue.notify_new.notified().await,
                }
            }
            queue.draining.store(false, Ordering::SeqCst);
            debug!("playback drain loop stopped");
        }))
    }

    async fn pop_next(&self) -> Option<QueueItem> {
        let mut items = self.items.lock().await;
        let best = items
            .iter()
            .enumerate()
            .max_by_key(|(_, i)| (i.priority, std::cmp::Reverse(i.seq)))
            .map(|(idx, _)| idx)?;
        Some(items.remove(best))
    }

    async fn play_unit(&self, unit: AudioUnit) {
        self.skip_requested.store(false, Ordering::SeqCst);
        self.playing.store(true, Ordering::SeqCst);
        self.avatar.on_unit_started(unit.id).await;
        if let Some(emotion) = &unit.emotion {
            self.avatar.on_expression(emotion, 1.0).await;
        }

        if unit.audio.is_empty() {
            // Synthesis failed upstream; nothing to play, events still fire.
            self.finish_unit(unit.id).await;
            return;
        }

        let timeline =
            VisemeTimeline::from_pcm(&unit.audio, self.viseme_interval, self.bytes_per_second);
        let play = self.sink.play(&unit.audio);
        tokio::pin!(play);
        let mut ticker = tokio::time::interval(self.viseme_interval);
        let mut frame = 0usize;

        loop {
            // Re-checked every iteration: a skip that fires while a select
            // branch handler is awaiting (no waiter registered on the
            // notification) is still caught here on the next pass.
            if self.skip_requested.swap(false, Ordering::SeqCst) {
                self.sink.stop().await;
                let _ = (&mut play).await;
                break;
            }
            tokio::select! {
                result = &mut play => {
                    if let Err(e) = result {
                        warn!(unit = %unit.id, "playback failed: {}", e);
                    }
                    break;
                }
                _ = self.skip.notified() => {
                    self.sink.stop().await;
                    let _ = (&mut play).await;
                    break;
                }
                _ = ticker.tick() => {
                    if let Some(f) = timeline.frame(frame) {
                        self.avatar.on_viseme(f.shape, f.intensity).await;
                        frame += 1;
                    }
                }
            }
        }

        self.finish_unit(unit.id).await;
    }

    /// One mouth-closed reset, then unit-ended. Runs exactly once per unit
    /// regardless of how playback ended.
    async fn finish_unit(&self, unit_id: Uuid) {
        self.avatar.on_viseme(VISEME_CLOSED, 0.0).await;
        self.avatar.on_unit_ended(unit_id).await;
        self.playing.store(false, Ordering::SeqCst);
    }
}

/// A sink whose `play` always fails; useful to verify the queue keeps going.
pub struct FailingSink;

#[async_trait]
impl PlaybackSink for FailingSink {
    async fn play(&self, _audio: &[u8]) -> VoiceResult<()> {
        Err(VoiceError::Playback("output device unavailable".to_string()))
    }

    async fn stop(&self) {}
}
