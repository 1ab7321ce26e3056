//! Decoded audio

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use super::AssetError;

/// Container formats recognised from magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// WAV uncompressed
    Wav,
    /// OGG Vorbis compressed
    Ogg,
    /// MP3 compressed
    Mp3,
    /// FLAC lossless
    Flac,
    /// Unknown format
    Unknown,
}

impl AudioFormat {
    /// Detect the container from magic bytes
    pub fn detect(bytes: &[u8]) -> Self {
        match bytes {
            [b'R', b'I', b'F', b'F', ..] => Self::Wav,
            [b'O', b'g', b'g', b'S', ..] => Self::Ogg,
            [b'f', b'L', b'a', b'C', ..] => Self::Flac,
            [0xFF, 0xFB | 0xFA | 0xF3 | 0xF2, ..] | [b'I', b'D', b'3', ..] => Self::Mp3,
            _ => Self::Unknown,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Ogg => "ogg",
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
            Self::Unknown => "unknown",
        }
    }
}

/// Decoded PCM audio, normalized to `f32` samples
#[derive(Debug)]
pub struct Sound {
    key: String,
    channels: u16,
    sample_rate: u32,
    samples: Arc<[f32]>,
    voices: usize,
}

impl Sound {
    /// Decode `bytes` read for `key`, allowing `player_count` concurrent voices
    pub fn decode(key: &str, bytes: &[u8], player_count: usize) -> Result<Self, AssetError> {
        match AudioFormat::detect(bytes) {
            AudioFormat::Wav => Self::decode_wav(key, bytes, player_count),
            format => Err(AssetError::UnsupportedFormat {
                key: key.to_string(),
                format: format.name().to_string(),
            }),
        }
    }

    fn decode_wav(key: &str, bytes: &[u8], player_count: usize) -> Result<Self, AssetError> {
        let decode_err = |e: hound::Error| AssetError::Decode {
            key: key.to_string(),
            reason: e.to_string(),
        };

        let mut reader = hound::WavReader::new(Cursor::new(bytes)).map_err(decode_err)?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(decode_err)?,
            hound::SampleFormat::Int => {
                let max_value = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|s| s as f32 / max_value))
                    .collect::<Result<_, _>>()
                    .map_err(decode_err)?
            }
        };

        log::trace!(
            "Decoded sound '{key}' ({} samples, {} ch @ {} Hz)",
            samples.len(),
            spec.channels,
            spec.sample_rate
        );

        Ok(Self {
            key: key.to_string(),
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            samples: samples.into(),
            voices: player_count.max(1),
        })
    }

    /// Key the sound was registered under
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Interleaved samples in `[-1.0, 1.0]`
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Channel count
    pub const fn channels(&self) -> u16 {
        self.channels
    }

    /// Sample rate in Hz
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of voices that may play this sound simultaneously
    pub const fn voices(&self) -> usize {
        self.voices
    }

    /// Playback length
    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() / usize::from(self.channels.max(1));
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate.max(1)))
    }
}
