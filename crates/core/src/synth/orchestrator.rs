use crate::emotion::{parse, strip_tags};
use crate::synth::{SegmentSpeechDriver, SynthError, SynthService};
use crate::voice::Language;
use std::sync::Arc;
use std::time::Duration;

/// Dramatic beat between emotional segments. A pacing choice, not an
/// implementation delay.
pub const INTER_SEGMENT_PAUSE: Duration = Duration::from_millis(600);

/// Top-level entry point for speaking one AI response.
///
/// Segments are spoken strictly one after another; the shared synthesizer
/// only ever carries one utterance. The caller's progress sink receives
/// offsets into the clean (tag-stripped) text and is guaranteed a final
/// call equal to the clean text's length, whatever happens to the audio.
pub struct SpeechOrchestrator {
    service: Arc<SynthService>,
    language: Language,
    pause: Duration,
}

impl SpeechOrchestrator {
    pub fn new(service: Arc<SynthService>, language: Language) -> Self {
        Self {
            service,
            language,
            pause: INTER_SEGMENT_PAUSE,
        }
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Speak `raw_text`, an annotated response with zero or more emotion
    /// markers.
    ///
    /// A failing segment is logged and skipped, never fatal: losing the
    /// voice for one phrase must not silence the rest of the reply, and
    /// the text reveal must finish even if the persona ends up mute.
    /// There is no internal timeout; callers who need a ceiling race this
    /// future against a timer and fire
    /// [`SynthService::cancel_current`], which makes the in-flight
    /// segment settle normally.
    pub async fn speak_ai_response(
        &self,
        raw_text: &str,
        on_progress: Option<&mut (dyn FnMut(usize) + Send)>,
    ) -> Result<(), SynthError> {
        let segments = parse(raw_text);
        let clean = strip_tags(raw_text);
        let clean_len = clean.chars().count();

        let mut sink = ProgressSink {
            callback: on_progress,
            high_water: 0,
            clean_len,
            full_emitted: false,
        };

        let driver = SegmentSpeechDriver::new(&self.service, self.language);
        let mut search_from = 0usize;
        for (index, segment) in segments.iter().enumerate() {
            // Locate this segment in the clean text, resuming the search
            // after the previous segment so duplicate phrases cannot
            // collide.
            let start = find_from(&clean, &segment.text, search_from).unwrap_or(search_from);
            search_from = start + segment.text.chars().count();

            let mut forward = |offset: usize| sink.emit(offset);
            if let Err(error) = driver
                .speak_segment(&segment.text, segment.emotion, start, &mut forward)
                .await
            {
                tracing::warn!(segment = index, %error, "segment speech failed, continuing");
            }

            if index + 1 < segments.len() {
                tokio::time::sleep(self.pause).await;
            }
        }

        sink.finish();
        Ok(())
    }

    pub fn service(&self) -> &Arc<SynthService> {
        &self.service
    }
}

struct ProgressSink<'a> {
    callback: Option<&'a mut (dyn FnMut(usize) + Send)>,
    high_water: usize,
    clean_len: usize,
    full_emitted: bool,
}

impl ProgressSink<'_> {
    fn emit(&mut self, offset: usize) {
        let clamped = offset.min(self.clean_len).max(self.high_water);
        if clamped == self.clean_len {
            // The full-length value is delivered exactly once, whichever
            // of the segment flush or the final finish() reaches it first.
            if self.full_emitted {
                return;
            }
            self.full_emitted = true;
        }
        self.high_water = clamped;
        if let Some(cb) = self.callback.as_deref_mut() {
            cb(clamped);
        }
    }

    fn finish(&mut self) {
        if !self.full_emitted {
            self.emit(self.clean_len);
        }
    }
}

/// `str::find` in char coordinates, starting at `from` chars.
fn find_from(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let from_byte = byte_index_at_char(haystack, from)?;
    haystack[from_byte..].find(needle).map(|rel| {
        let abs = from_byte + rel;
        haystack[..abs].chars().count()
    })
}

fn byte_index_at_char(s: &str, char_index: usize) -> Option<usize> {
    s.char_indices()
        .map(|(b, _)| b)
        .chain(std::iter::once(s.len()))
        .nth(char_index)
}
