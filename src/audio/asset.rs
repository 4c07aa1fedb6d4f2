//! Decoded audio assets
//!
//! The placeholder sound is compiled into the library, so it plays no matter
//! what the process working directory is. Clips are decoded once per load
//! into interleaved `f32` samples so the output callback only has to index
//! into memory.

use std::io::{Cursor, Read};
use std::path::Path;

use hound::{SampleFormat, WavReader};

use crate::error::PlaybackError;

/// Bundled placeholder sound played when no asset override is configured.
const PLACEHOLDER_WAV: &[u8] = include_bytes!("../../assets/audio/placeholder-sound.wav");

/// Interleaved PCM clip held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Result<Self, PlaybackError> {
        if channels == 0 || sample_rate == 0 {
            return Err(PlaybackError::ResourceUnavailable {
                reason: format!(
                    "invalid clip layout: {} channels at {} Hz",
                    channels, sample_rate
                ),
            });
        }
        if samples.len() < channels as usize {
            return Err(PlaybackError::ResourceUnavailable {
                reason: "audio clip contains no frames".to_string(),
            });
        }
        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Decode the bundled placeholder sound.
    pub fn placeholder() -> Result<Self, PlaybackError> {
        Self::from_wav_bytes(PLACEHOLDER_WAV)
    }

    /// Decode a WAV file (integer or float PCM) into memory.
    pub fn from_wav<P: AsRef<Path>>(path: P) -> Result<Self, PlaybackError> {
        let path = path.as_ref();
        let reader = WavReader::open(path).map_err(|err| PlaybackError::ResourceUnavailable {
            reason: format!("{}: {}", path.display(), err),
        })?;
        Self::decode(reader)
    }

    /// Decode WAV data already held in memory.
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self, PlaybackError> {
        let reader = WavReader::new(Cursor::new(bytes))?;
        Self::decode(reader)
    }

    fn decode<R: Read>(reader: WavReader<R>) -> Result<Self, PlaybackError> {
        let spec = reader.spec();

        let samples = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 / scale))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        Self::new(samples, spec.channels, spec.sample_rate)
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Sample for `frame` on output channel `channel`.
    ///
    /// Mono clips are duplicated across outputs; extra output channels reuse
    /// the clip's last channel.
    #[inline]
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let source_channel = channel.min(self.channels as usize - 1);
        self.samples
            .get(frame * self.channels as usize + source_channel)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, spec: hound::WavSpec, frames: &[i16]) {
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for sample in frames {
            writer.write_sample(*sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_integer_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        write_wav(&path, spec, &[0, 16384, -16384, 0]);

        let clip = AudioClip::from_wav(&path).unwrap();
        assert_eq!(clip.channels(), 2);
        assert_eq!(clip.frames(), 2);
        assert!((clip.sample(0, 1) - 0.5).abs() < 1e-4);
        assert!((clip.sample(1, 0) + 0.5).abs() < 1e-4);
        assert!((clip.duration_secs() - 2.0 / 8000.0).abs() < 1e-9);
    }

    #[test]
    fn mono_clip_feeds_every_output_channel() {
        let clip = AudioClip::new(vec![0.25, -0.25], 1, 44_100).unwrap();
        assert_eq!(clip.sample(0, 0), 0.25);
        assert_eq!(clip.sample(0, 1), 0.25);
        assert_eq!(clip.sample(1, 3), -0.25);
        assert_eq!(clip.sample(5, 0), 0.0);
    }

    #[test]
    fn missing_or_empty_assets_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = AudioClip::from_wav(dir.path().join("missing.wav")).unwrap_err();
        assert!(matches!(err, PlaybackError::ResourceUnavailable { .. }));

        let err = AudioClip::new(Vec::new(), 2, 48_000).unwrap_err();
        assert!(matches!(err, PlaybackError::ResourceUnavailable { .. }));
    }

    #[test]
    fn bundled_placeholder_is_stereo() {
        let clip = AudioClip::placeholder().unwrap();
        assert_eq!(clip.channels(), 2);
        assert_eq!(clip.sample_rate(), 44_100);
        assert!((clip.duration_secs() - 2.0).abs() < 1e-3);
    }

    #[test]
    fn placeholder_loads_from_any_working_directory() {
        let original = std::env::current_dir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        std::env::set_current_dir(elsewhere.path()).unwrap();

        let result = AudioClip::placeholder();
        std::env::set_current_dir(original).unwrap();

        let clip = result.unwrap();
        assert_eq!(clip.frames(), 88_200);
    }

    #[test]
    fn garbage_bytes_are_unavailable() {
        let err = AudioClip::from_wav_bytes(b"not a wav file").unwrap_err();
        assert!(matches!(err, PlaybackError::ResourceUnavailable { .. }));
    }
}
