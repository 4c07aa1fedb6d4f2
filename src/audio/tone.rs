//! Binaural beat synthesis
//!
//! The left ear hears the carrier, the right ear hears carrier + beat. The
//! perceived beat is the difference between the two.

use std::f64::consts::TAU;

use crate::audio::AudioClip;
use crate::error::PlaybackError;

/// Stereo sine pair producing a binaural beat at `beat_hz`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinauralTone {
    pub carrier_hz: f64,
    pub beat_hz: f64,
    pub amplitude: f32,
}

impl BinauralTone {
    pub fn new(carrier_hz: f64, beat_hz: f64, amplitude: f32) -> Self {
        Self {
            carrier_hz,
            beat_hz,
            amplitude: amplitude.clamp(0.0, 1.0),
        }
    }

    pub fn left_hz(&self) -> f64 {
        self.carrier_hz
    }

    pub fn right_hz(&self) -> f64 {
        self.carrier_hz + self.beat_hz
    }

    /// Sample for absolute `frame` on output `channel`.
    ///
    /// Phase is derived from the frame index, so the tone never drifts or
    /// clicks regardless of callback sizes. Channels past the first two
    /// alternate left/right.
    #[inline]
    pub fn sample(&self, frame: u64, channel: usize, sample_rate: u32) -> f32 {
        let hz = if channel % 2 == 0 {
            self.left_hz()
        } else {
            self.right_hz()
        };
        let t = frame as f64 / sample_rate as f64;
        ((TAU * hz * t).sin() as f32) * self.amplitude
    }

    /// Render `seconds` of the tone as an interleaved stereo clip.
    pub fn render(&self, sample_rate: u32, seconds: f64) -> Result<AudioClip, PlaybackError> {
        let frames = (seconds.max(0.0) * sample_rate as f64).round() as u64;
        let mut samples = Vec::with_capacity(frames as usize * 2);
        for frame in 0..frames {
            samples.push(self.sample(frame, 0, sample_rate));
            samples.push(self.sample(frame, 1, sample_rate));
        }
        AudioClip::new(samples, 2, sample_rate)
    }
}
