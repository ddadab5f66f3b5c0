mod driver;
mod orchestrator;
mod service;
mod silent;
#[cfg(feature = "playback-device")]
mod tone;

use crate::voice::{SynthVoice, VoiceError};
use futures::future::BoxFuture;
use tokio::sync::mpsc;

pub use driver::SegmentSpeechDriver;
pub use orchestrator::{SpeechOrchestrator, INTER_SEGMENT_PAUSE};
pub use service::SynthService;
pub use silent::SilentSpeechEngine;
#[cfg(feature = "playback-device")]
pub use tone::ToneSpeechEngine;

/// One utterance handed to the platform synthesizer: the (already
/// transformed) text plus per-segment voice parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice_id: String,
    pub pitch: f32,
    pub rate: f32,
    pub volume: f32,
}

/// Events streamed by an engine while an utterance plays.
#[derive(Clone, Debug, PartialEq)]
pub enum SpeechEvent {
    /// The synthesizer reached the word starting at `char_index` (a char
    /// offset into the utterance text as given, i.e. transformed text).
    WordBoundary { char_index: usize, word: String },
}

#[derive(thiserror::Error, Debug)]
pub enum SynthError {
    /// Speech synthesis is not available on this host at all.
    #[error("speech synthesis unsupported on this host")]
    Unsupported,

    #[error(transparent)]
    Voice(#[from] VoiceError),

    /// The synthesizer failed mid-utterance.
    #[error("synthesis failed: {0}")]
    Synthesis(String),
}

/// The platform speech synthesizer seam.
///
/// `speak` resolves when the utterance finishes playing; an utterance
/// interrupted by [`SpeechEngine::cancel`] settles with `Ok` — being cut
/// off is normal operation, not an error. Word-boundary events are pushed
/// on `events` as the audio progresses; the channel is dropped when the
/// utterance ends.
pub trait SpeechEngine: Send + Sync {
    fn voices(&self) -> BoxFuture<'_, Result<Vec<SynthVoice>, SynthError>>;

    fn speak(
        &self,
        utterance: Utterance,
        events: mpsc::UnboundedSender<SpeechEvent>,
    ) -> BoxFuture<'_, Result<(), SynthError>>;

    /// Stop the current utterance, if any. Idempotent; a no-op when idle.
    fn cancel(&self);
}

/// Words of `text` with the char offset each one starts at, the shape the
/// platform reports word boundaries in.
pub(crate) fn words_with_char_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut char_index = 0usize;
    let mut start: Option<(usize, usize)> = None;
    for (byte_index, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some((start_char, start_byte)) = start.take() {
                out.push((start_char, &text[start_byte..byte_index]));
            }
        } else if start.is_none() {
            start = Some((char_index, byte_index));
        }
        char_index += 1;
    }
    if let Some((start_char, start_byte)) = start {
        out.push((start_char, &text[start_byte..]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_offsets_are_char_based() {
        assert_eq!(
            words_with_char_offsets("ÅJ. ta  to"),
            vec![(0, "ÅJ."), (4, "ta"), (8, "to")]
        );
        assert!(words_with_char_offsets("   ").is_empty());
        assert!(words_with_char_offsets("").is_empty());
    }
}
