//! Viseme timeline: mouth-shape frames derived from audio amplitude.
//!
//! The avatar collaborator receives one frame per cadence tick (~20/sec)
//! while a unit plays, and a single mouth-closed reset when playback ends,
//! is skipped, or the queue is cleared. Amplitude buckets, not
//! phoneme-accurate alignment: the kiosk character only needs plausible
//! articulation.

use std::time::Duration;

/// Mouth-closed shape sent on every reset.
pub const VISEME_CLOSED: &str = "sil";

/// Open-mouth shapes cycled while the amplitude is above the floor.
const OPEN_SHAPES: [&str; 3] = ["aa", "E", "O"];

/// One mouth-shape sample.
#[derive(Debug, Clone, PartialEq)]
pub struct VisemeFrame {
    pub shape: &'static str,
    /// Openness in [0, 1].
    pub intensity: f32,
}

/// Precomputed frame sequence for one audio unit.
#[derive(Debug, Clone)]
pub struct VisemeTimeline {
    frames: Vec<VisemeFrame>,
    interval: Duration,
}

impl VisemeTimeline {
    /// Build a timeline from 16-bit little-endian PCM, one frame per
    /// `interval` at `bytes_per_second` playback rate.
    pub fn from_pcm(audio: &[u8], interval: Duration, bytes_per_second: usize) -> Self {
        let window = ((bytes_per_second as f64 * interval.as_secs_f64()) as usize).max(2) & !1;
        let frames = audio
            .chunks(window)
            .enumerate()
            .map(|(i, chunk)| {
                let rms = rms_of_window(chunk);
                if rms < 0.05 {
                    VisemeFrame {
                        shape: VISEME_CLOSED,
                        intensity: 0.0,
                    }
                } else {
                    VisemeFrame {
                        shape: OPEN_SHAPES[i % OPEN_SHAPES.len()],
                        intensity: rms.min(1.0),
                    }
                }
            })
            .collect();
        Self { frames, interval }
    }

    pub fn frame(&self, index: usize) -> Option<&VisemeFrame> {
        self.frames.get(index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Expected playback duration covered by this timeline.
    pub fn duration(&self) -> Duration {
        self.interval * self.frames.len() as u32
    }
}

fn rms_of_window(chunk: &[u8]) -> f32 {
    if chunk.len() < 2 {
        return 0.0;
    }
    let mut acc = 0.0f64;
    let mut n = 0usize;
    for pair in chunk.chunks_exact(2) {
        let sample = i16::from_le_bytes([pair[0], pair[1]]) as f64 / i16::MAX as f64;
        acc += sample * sample;
        n += 1;
    }
    if n == 0 {
        0.0
    } else {
        ((acc / n as f64).sqrt() as f32) * 4.0 // scale speech RMS toward [0,1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm_of(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn silence_maps_to_closed_mouth() {
        let audio = pcm_of(&[0; 3200]);
        let tl = VisemeTimeline::from_pcm(&audio, Duration::from_millis(50), 32_000);
        assert!(tl.len() >= 1);
        assert!(tl.frame(0).unwrap().shape == VISEME_CLOSED);
        assert_eq!(tl.frame(0).unwrap().intensity, 0.0);
    }

    #[test]
    fn loud_audio_opens_mouth() {
        let audio = pcm_of(&[12_000; 3200]);
        let tl = VisemeTimeline::from_pcm(&audio, Duration::from_millis(50), 32_000);
        let frame = tl.frame(0).unwrap();
        assert_ne!(frame.shape, VISEME_CLOSED);
        assert!(frame.intensity > 0.1);
    }

    #[test]
    fn frame_count_tracks_duration() {
        // One second of audio at 50ms cadence = 20 frames.
        let audio = pcm_of(&[5000; 16_000]);
        let tl = VisemeTimeline::from_pcm(&audio, Duration::from_millis(50), 32_000);
        assert_eq!(tl.len(), 20);
        assert_eq!(tl.duration(), Duration::from_secs(1));
    }
}
