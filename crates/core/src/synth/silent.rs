use crate::synth::{words_with_char_offsets, SpeechEngine, SpeechEvent, SynthError, Utterance};
use crate::voice::SynthVoice;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::sleep;

/// A voiceless engine that paces word boundaries by the utterance rate
/// without touching any audio device.
///
/// This is the degraded path when the host has no usable audio output,
/// and doubles as a deterministic engine for tests: the text reveal works
/// exactly as with a real voice, just silently.
pub struct SilentSpeechEngine {
    epoch: AtomicU64,
    cancelled: Notify,
    word_delay: Option<Duration>,
}

impl SilentSpeechEngine {
    pub fn new() -> Self {
        Self {
            epoch: AtomicU64::new(0),
            cancelled: Notify::new(),
            word_delay: None,
        }
    }

    /// Fix the per-word delay instead of deriving it from the rate.
    pub fn with_word_delay(mut self, delay: Duration) -> Self {
        self.word_delay = Some(delay);
        self
    }

    fn delay_for(&self, rate: f32) -> Duration {
        self.word_delay.unwrap_or_else(|| {
            // Roughly what a synthesizer takes per word at the given rate.
            Duration::from_millis((280.0 / f64::from(rate.clamp(0.05, 2.0))) as u64)
        })
    }
}

impl Default for SilentSpeechEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechEngine for SilentSpeechEngine {
    fn voices(&self) -> BoxFuture<'_, Result<Vec<SynthVoice>, SynthError>> {
        async move { Ok(builtin_voices("Silent")) }.boxed()
    }

    fn speak(
        &self,
        utterance: Utterance,
        events: tokio::sync::mpsc::UnboundedSender<SpeechEvent>,
    ) -> BoxFuture<'_, Result<(), SynthError>> {
        async move {
            let my_epoch = self.epoch.load(Ordering::SeqCst);
            let delay = self.delay_for(utterance.rate);

            for (char_index, word) in words_with_char_offsets(&utterance.text) {
                if self.epoch.load(Ordering::SeqCst) != my_epoch {
                    return Ok(());
                }
                let _ = events.send(SpeechEvent::WordBoundary {
                    char_index,
                    word: word.to_owned(),
                });
                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = self.cancelled.notified() => {
                        if self.epoch.load(Ordering::SeqCst) != my_epoch {
                            return Ok(());
                        }
                    }
                }
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

/// The fixed inventory built-in engines expose, one mechanical voice per
/// supported language.
pub(crate) fn builtin_voices(kind: &str) -> Vec<SynthVoice> {
    [
        ("en-GB", "English"),
        ("nb-NO", "Norwegian"),
        ("pl-PL", "Polish"),
        ("uk-UA", "Ukrainian"),
    ]
    .into_iter()
    .map(|(lang, label)| SynthVoice {
        id: format!("{}-{lang}", kind.to_ascii_lowercase()),
        name: format!("{kind} Compact {label}"),
        lang: lang.to_owned(),
        local_service: true,
        default_voice: lang == "en-GB",
    })
    .collect()
}
