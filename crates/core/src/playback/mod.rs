#[cfg(feature = "playback-device")]
mod audio;
mod dummy;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

#[cfg(feature = "playback-device")]
pub use audio::AudioPlaybackSink;
pub use dummy::DummyPlaybackSink;

/// A pre-rendered mono/stereo PCM clip ready for the output device.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RenderedSpeech {
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub pcm_i16: Vec<i16>,
}

impl RenderedSpeech {
    /// Samples as f32 in -1.0..=1.0, the working format of the DSP chain.
    pub fn to_f32(&self) -> Vec<f32> {
        self.pcm_i16
            .iter()
            .map(|&s| s as f32 / i16::MAX as f32)
            .collect()
    }

    /// Rebuild a clip from f32 samples, clamping anything the effect
    /// stages pushed outside -1.0..=1.0.
    pub fn from_f32(samples: &[f32], sample_rate_hz: u32, channels: u16) -> Self {
        let pcm_i16 = samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .collect();
        Self {
            sample_rate_hz,
            channels,
            pcm_i16,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PlaybackError {
    #[error("audio output unavailable: {details}")]
    AudioOutputUnavailable { details: String },
}

pub trait PlaybackSink: Send + Sync {
    /// Play the clip to completion. `rate` is a playback-rate multiplier
    /// (1.0 = as rendered); it carries the voice profile's pitch shift,
    /// which is a source-rate concern rather than an effect stage.
    fn play(&self, clip: RenderedSpeech, rate: f32) -> BoxFuture<'_, Result<(), PlaybackError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f32_round_trip_preserves_amplitude() {
        let clip = RenderedSpeech {
            sample_rate_hz: 22_050,
            channels: 1,
            pcm_i16: vec![0, i16::MAX, i16::MIN + 1, 1234, -1234],
        };
        let back = RenderedSpeech::from_f32(&clip.to_f32(), 22_050, 1);
        for (a, b) in clip.pcm_i16.iter().zip(back.pcm_i16.iter()) {
            assert!((a - b).abs() <= 1, "{a} vs {b}");
        }
    }

    #[test]
    fn from_f32_clamps_overdriven_samples() {
        let clip = RenderedSpeech::from_f32(&[2.0, -3.0], 22_050, 1);
        assert_eq!(clip.pcm_i16, vec![i16::MAX, -i16::MAX]);
    }
}
