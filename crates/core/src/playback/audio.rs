use crate::playback::{PlaybackError, PlaybackSink, RenderedSpeech};
use futures::future::BoxFuture;
use futures::FutureExt;
use rodio::source::Source;
use rodio::{OutputStream, OutputStreamBuilder, Sink};
use std::sync::{Arc, Mutex};

/// Plays rendered clips on the default output device.
///
/// The [`rodio::OutputStream`] must outlive playback; opening a fresh
/// stream per clip makes Rodio drop the previous one mid-play and
/// truncates audio. A single stream is opened lazily and shared across
/// clones for the life of the sink.
#[derive(Clone)]
pub struct AudioPlaybackSink {
    output_stream: Arc<Mutex<Option<OutputStream>>>,
}

impl AudioPlaybackSink {
    pub fn new() -> Result<Self, PlaybackError> {
        Ok(Self {
            output_stream: Arc::new(Mutex::new(None)),
        })
    }

    fn connect_sink(&self) -> Result<Sink, PlaybackError> {
        let mut guard = match self.output_stream.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("output stream cache lock poisoned, recovering");
                poisoned.into_inner()
            }
        };

        if guard.is_none() {
            let stream = OutputStreamBuilder::open_default_stream().map_err(|e| {
                PlaybackError::AudioOutputUnavailable {
                    details: format!("open default output stream: {e}"),
                }
            })?;
            *guard = Some(stream);
        }

        let stream = guard
            .as_ref()
            .ok_or_else(|| PlaybackError::AudioOutputUnavailable {
                details: "output stream cache invariant violated".to_owned(),
            })?;
        Ok(Sink::connect_new(&stream.mixer()))
    }
}

impl PlaybackSink for AudioPlaybackSink {
    fn play(&self, clip: RenderedSpeech, rate: f32) -> BoxFuture<'_, Result<(), PlaybackError>> {
        async move {
            if clip.sample_rate_hz == 0
                || clip.channels == 0
                || clip.pcm_i16.is_empty()
                || clip.pcm_i16.len() % usize::from(clip.channels) != 0
            {
                tracing::debug!(
                    sample_rate_hz = clip.sample_rate_hz,
                    channels = clip.channels,
                    samples_i16 = clip.pcm_i16.len(),
                    "skipping playback of empty/invalid PCM"
                );
                return Ok(());
            }

            let sink = self.connect_sink()?;
            let source = PcmSource::new(clip.pcm_i16, clip.sample_rate_hz, clip.channels)
                .speed(rate.clamp(0.25, 4.0));
            sink.append(source);
            sink.sleep_until_end();
            Ok(())
        }
        .boxed()
    }
}

struct PcmSource {
    samples: std::vec::IntoIter<i16>,
    sample_rate: u32,
    channels: u16,
}

impl PcmSource {
    fn new(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: samples.into_iter(),
            sample_rate,
            channels,
        }
    }
}

impl Iterator for PcmSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        self.samples.next().map(|s| s as f32 / i16::MAX as f32)
    }
}

impl Source for PcmSource {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<std::time::Duration> {
        None
    }
}
