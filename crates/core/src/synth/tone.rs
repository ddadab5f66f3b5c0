use crate::dsp::{EffectChain, VoiceEffectSettings};
use crate::playback::{PlaybackSink, RenderedSpeech};
use crate::synth::{words_with_char_offsets, SpeechEngine, SpeechEvent, SynthError, Utterance};
use crate::voice::SynthVoice;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::f32::consts::PI;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::sleep;

const SAMPLE_RATE_HZ: u32 = 22_050;
const INTER_WORD_GAP: Duration = Duration::from_millis(40);

/// Renders each word as a short pitched tone burst and plays it through
/// the playback sink, emitting a word boundary as each burst starts.
///
/// This is the audible stand-in for a platform synthesizer voice: the
/// cadence, pitch and volume follow the utterance parameters, and an
/// optional effect chain colors the rendered buffer the same way a cloud
/// TTS clip would be colored.
pub struct ToneSpeechEngine {
    playback: Arc<dyn PlaybackSink>,
    effect: Option<VoiceEffectSettings>,
    epoch: AtomicU64,
    cancelled: Notify,
}

impl ToneSpeechEngine {
    pub fn new(playback: Arc<dyn PlaybackSink>) -> Self {
        Self {
            playback,
            effect: None,
            epoch: AtomicU64::new(0),
            cancelled: Notify::new(),
        }
    }

    /// Color every rendered buffer through an effect chain built from
    /// `settings`.
    pub fn with_effect(mut self, settings: VoiceEffectSettings) -> Self {
        self.effect = Some(settings);
        self
    }
}

impl SpeechEngine for ToneSpeechEngine {
    fn voices(&self) -> BoxFuture<'_, Result<Vec<SynthVoice>, SynthError>> {
        async move { Ok(super::silent::builtin_voices("Tone")) }.boxed()
    }

    fn speak(
        &self,
        utterance: Utterance,
        events: tokio::sync::mpsc::UnboundedSender<SpeechEvent>,
    ) -> BoxFuture<'_, Result<(), SynthError>> {
        async move {
            let my_epoch = self.epoch.load(Ordering::SeqCst);
            // One chain per utterance; every word's buffer runs through
            // the same stateful stages.
            let mut chain = self
                .effect
                .map(|settings| EffectChain::build(settings, SAMPLE_RATE_HZ));
            let rate = if let Some(c) = &chain {
                c.playback_rate()
            } else {
                1.0
            };

            for (char_index, word) in words_with_char_offsets(&utterance.text) {
                if self.epoch.load(Ordering::SeqCst) != my_epoch {
                    break;
                }
                let _ = events.send(SpeechEvent::WordBoundary {
                    char_index,
                    word: word.to_owned(),
                });

                let mut clip = render_word_tone(word, &utterance);
                if let Some(c) = &mut chain {
                    clip = c.process_clip(&clip);
                }
                self.playback
                    .play(clip, rate)
                    .await
                    .map_err(|e| SynthError::Synthesis(e.to_string()))?;

                tokio::select! {
                    _ = sleep(INTER_WORD_GAP) => {}
                    _ = self.cancelled.notified() => {
                        if self.epoch.load(Ordering::SeqCst) != my_epoch {
                            break;
                        }
                    }
                }
            }

            if let Some(c) = chain {
                c.cleanup();
            }
            Ok(())
        }
        .boxed()
    }

    fn cancel(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.cancelled.notify_waiters();
    }
}

/// One word as a pitched sine burst with a short attack/release ramp so
/// bursts do not click.
fn render_word_tone(word: &str, utterance: &Utterance) -> RenderedSpeech {
    let frequency = 70.0 + utterance.pitch.clamp(0.0, 2.0) * 160.0;
    let rate = utterance.rate.clamp(0.05, 2.0);
    let duration_ms = ((word.chars().count() as f32 * 55.0) / rate).clamp(80.0, 1_200.0);
    let amplitude = 0.8 * utterance.volume.clamp(0.0, 1.0);

    let samples = (duration_ms / 1_000.0 * SAMPLE_RATE_HZ as f32) as usize;
    let ramp = (SAMPLE_RATE_HZ as usize / 200).max(1); // 5 ms
    let pcm: Vec<f32> = (0..samples)
        .map(|n| {
            let t = n as f32 / SAMPLE_RATE_HZ as f32;
            let envelope = (n as f32 / ramp as f32)
                .min((samples.saturating_sub(n)) as f32 / ramp as f32)
                .clamp(0.0, 1.0);
            amplitude * envelope * (2.0 * PI * frequency * t).sin()
        })
        .collect();

    RenderedSpeech::from_f32(&pcm, SAMPLE_RATE_HZ, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::DummyPlaybackSink;
    use tokio::sync::mpsc;

    fn utterance(text: &str) -> Utterance {
        Utterance {
            text: text.to_owned(),
            voice_id: "tone-en-GB".into(),
            pitch: 0.05,
            rate: 0.35,
            volume: 1.0,
        }
    }

    #[test]
    fn word_tone_length_scales_with_word_and_rate() {
        let short = render_word_tone("hi", &utterance("hi"));
        let long = render_word_tone("exterminate", &utterance("exterminate"));
        assert!(long.pcm_i16.len() > short.pcm_i16.len());
        assert_eq!(short.sample_rate_hz, SAMPLE_RATE_HZ);
        assert_eq!(short.channels, 1);
    }

    #[test]
    fn word_tone_is_louder_at_full_volume() {
        let mut quiet = utterance("hm");
        quiet.volume = 0.2;
        let loud = utterance("hm");
        let peak = |clip: &RenderedSpeech| clip.pcm_i16.iter().map(|s| s.abs()).max().unwrap_or(0);
        assert!(peak(&render_word_tone("hm", &loud)) > peak(&render_word_tone("hm", &quiet)));
    }

    #[tokio::test]
    async fn speaks_through_the_sink_and_emits_boundaries() {
        let engine = ToneSpeechEngine::new(Arc::new(DummyPlaybackSink::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        engine.speak(utterance("beep boop"), tx).await.unwrap();

        let mut boundaries = Vec::new();
        while let Ok(SpeechEvent::WordBoundary { char_index, .. }) = rx.try_recv() {
            boundaries.push(char_index);
        }
        assert_eq!(boundaries, vec![0, 5]);
    }

    #[tokio::test]
    async fn effect_chain_is_torn_down_after_each_utterance() {
        let _guard = crate::dsp::oscillator_test_guard();
        let before = crate::dsp::running_oscillators();

        let engine = ToneSpeechEngine::new(Arc::new(DummyPlaybackSink::new()))
            .with_effect(crate::dsp::VoicePresetProfile::Zyber.settings());
        let (tx, _rx) = mpsc::unbounded_channel();
        engine.speak(utterance("ok"), tx).await.unwrap();

        assert_eq!(crate::dsp::running_oscillators(), before);
    }
}
