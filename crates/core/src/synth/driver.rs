use crate::emotion::EmotionTag;
use crate::synth::{SynthError, SynthService, Utterance};
use crate::transform::transform;
use crate::voice::{resolve_voice, Language};

/// Speaks one emotional segment and translates the synthesizer's
/// word-boundary events into progress offsets in the original,
/// untransformed text.
///
/// The transformer changes text length, so boundary indices (which are in
/// transformed-text coordinates) are mapped back with the length ratio
/// `original_len / transformed_len` and clamped. The mapping is a knowing
/// approximation: progress is monotonic and converges to the exact
/// segment length at the end, but individual words may lead or trail the
/// audio slightly.
pub struct SegmentSpeechDriver<'a> {
    service: &'a SynthService,
    language: Language,
}

impl<'a> SegmentSpeechDriver<'a> {
    pub fn new(service: &'a SynthService, language: Language) -> Self {
        Self { service, language }
    }

    /// Speak `text` with the emotion's delivery. Progress offsets are
    /// `start_offset + position_within_segment`, non-decreasing, and the
    /// final `start_offset + len` update is always delivered, also on
    /// synthesis failure, so the display can never stall mid-segment.
    pub async fn speak_segment(
        &self,
        text: &str,
        emotion: EmotionTag,
        start_offset: usize,
        on_progress: &mut (dyn FnMut(usize) + Send),
    ) -> Result<(), SynthError> {
        let original_len = text.chars().count();
        let final_offset = start_offset + original_len;

        let transformed = transform(text, emotion);
        let transformed_len = transformed.chars().count();

        let voices = self.service.voices().await;
        let resolved = match resolve_voice(&voices, self.language, emotion) {
            Ok(r) => r,
            Err(error) => {
                tracing::warn!(%error, "skipping audio for segment, text continues");
                on_progress(final_offset);
                return Ok(());
            }
        };

        let utterance = Utterance {
            text: transformed,
            voice_id: resolved.voice.id.clone(),
            pitch: resolved.preset.pitch,
            rate: resolved.preset.rate,
            volume: resolved.preset.volume,
        };

        let ratio = if transformed_len == 0 {
            0.0
        } else {
            original_len as f64 / transformed_len as f64
        };
        let mut high_water = 0usize;
        let result = self
            .service
            .speak(utterance, |char_index, _word| {
                let approx = (char_index as f64 * ratio).round() as usize;
                let clamped = approx.min(original_len).max(high_water);
                high_water = clamped;
                on_progress(start_offset + clamped);
            })
            .await;

        on_progress(final_offset);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{SpeechEngine, SpeechEvent};
    use crate::voice::SynthVoice;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// Emits a fixed boundary script, regardless of the utterance.
    struct BoundaryScriptEngine {
        script: Vec<usize>,
        voices: Vec<SynthVoice>,
        fail: bool,
    }

    impl BoundaryScriptEngine {
        fn new(script: Vec<usize>) -> Self {
            Self {
                script,
                voices: vec![SynthVoice {
                    id: "v1".into(),
                    name: "Test Compact".into(),
                    lang: "en-GB".into(),
                    local_service: true,
                    default_voice: true,
                }],
                fail: false,
            }
        }

        fn failing() -> Self {
            let mut e = Self::new(vec![]);
            e.fail = true;
            e
        }

        fn no_voices() -> Self {
            let mut e = Self::new(vec![]);
            e.voices.clear();
            e
        }
    }

    impl SpeechEngine for BoundaryScriptEngine {
        fn voices(&self) -> BoxFuture<'_, Result<Vec<SynthVoice>, SynthError>> {
            let voices = self.voices.clone();
            async move { Ok(voices) }.boxed()
        }

        fn speak(
            &self,
            _utterance: Utterance,
            events: mpsc::UnboundedSender<SpeechEvent>,
        ) -> BoxFuture<'_, Result<(), SynthError>> {
            let script = self.script.clone();
            let fail = self.fail;
            async move {
                for char_index in script {
                    let _ = events.send(SpeechEvent::WordBoundary {
                        char_index,
                        word: String::new(),
                    });
                    tokio::task::yield_now().await;
                }
                if fail {
                    Err(SynthError::Synthesis("engine exploded".into()))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn cancel(&self) {}
    }

    fn service_with(engine: BoundaryScriptEngine) -> SynthService {
        SynthService::new(Arc::new(engine))
            .with_retry(crate::util::RetryConfig::new(1, std::time::Duration::ZERO))
    }

    #[tokio::test]
    async fn progress_is_monotonic_even_for_disordered_boundaries() {
        // Out-of-order and duplicate indices from the platform must never
        // make the display run backwards.
        let service = service_with(BoundaryScriptEngine::new(vec![5, 2, 9, 9, 3, 40]));
        let driver = SegmentSpeechDriver::new(&service, Language::En);

        let mut seen = Vec::new();
        driver
            .speak_segment("Answer me.", EmotionTag::Neutral, 10, &mut |o| seen.push(o))
            .await
            .unwrap();

        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "regressed: {seen:?}");
        assert_eq!(*seen.last().unwrap(), 10 + "Answer me.".chars().count());
        // Indices past the transformed length clamp to the segment end.
        assert!(seen.iter().all(|&o| o <= 20));
    }

    #[tokio::test]
    async fn final_offset_is_emitted_when_no_boundaries_fire() {
        let service = service_with(BoundaryScriptEngine::new(vec![]));
        let driver = SegmentSpeechDriver::new(&service, Language::En);

        let mut seen = Vec::new();
        driver
            .speak_segment("hello", EmotionTag::Neutral, 0, &mut |o| seen.push(o))
            .await
            .unwrap();
        assert_eq!(seen, vec![5]);
    }

    #[tokio::test]
    async fn synthesis_failure_still_flushes_final_offset() {
        let service = service_with(BoundaryScriptEngine::failing());
        let driver = SegmentSpeechDriver::new(&service, Language::En);

        let mut seen = Vec::new();
        let result = driver
            .speak_segment("hello", EmotionTag::Angry, 3, &mut |o| seen.push(o))
            .await;
        assert!(result.is_err());
        assert_eq!(*seen.last().unwrap(), 8);
    }

    #[tokio::test]
    async fn missing_voices_degrade_to_text_only() {
        let service = service_with(BoundaryScriptEngine::no_voices());
        let driver = SegmentSpeechDriver::new(&service, Language::En);

        let mut seen = Vec::new();
        driver
            .speak_segment("mute", EmotionTag::Neutral, 0, &mut |o| seen.push(o))
            .await
            .unwrap();
        assert_eq!(seen, vec![4]);
    }

    #[tokio::test]
    async fn empty_segment_text_flushes_immediately() {
        let service = service_with(BoundaryScriptEngine::new(vec![0]));
        let driver = SegmentSpeechDriver::new(&service, Language::En);

        let mut seen = Vec::new();
        driver
            .speak_segment("", EmotionTag::Neutral, 7, &mut |o| seen.push(o))
            .await
            .unwrap();
        assert_eq!(*seen.last().unwrap(), 7);
    }
}
