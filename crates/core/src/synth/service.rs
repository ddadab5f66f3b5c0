use crate::synth::{SpeechEngine, SpeechEvent, SynthError, Utterance};
use crate::util::{retry_with_backoff, RetryConfig};
use crate::voice::SynthVoice;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Process-wide façade over the shared platform synthesizer.
///
/// Only one utterance is audible system-wide at any time; starting a new
/// one implicitly cancels whatever is playing (last writer wins, so a new
/// chat message silences the persona instantly). The generation counter
/// makes that safe: every speak bumps it, every cancel bumps it, and
/// word-boundary events that belong to a stale generation are dropped
/// instead of reaching the caller.
pub struct SynthService {
    engine: Arc<dyn SpeechEngine>,
    generation: AtomicU64,
    voice_cache: Mutex<Option<Vec<SynthVoice>>>,
    retry: RetryConfig,
}

impl SynthService {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            engine,
            generation: AtomicU64::new(0),
            voice_cache: Mutex::new(None),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Populate the voice cache. Idempotent. Platforms fill the inventory
    /// asynchronously and report it empty when queried too early, so an
    /// empty result is retried; if it stays empty the cache is populated
    /// empty anyway and speech degrades to text-only downstream.
    pub async fn initialize(&self) {
        if self.cached_voices().is_some() {
            return;
        }

        let fetched = retry_with_backoff(
            &self.retry,
            || async {
                let voices = self.engine.voices().await?;
                if voices.is_empty() {
                    return Err(SynthError::Voice(
                        crate::voice::VoiceError::NoVoicesAvailable,
                    ));
                }
                Ok(voices)
            },
            |e| matches!(e, SynthError::Voice(_)),
        )
        .await;

        let voices = match fetched {
            Ok(v) => v,
            Err(error) => {
                tracing::warn!(%error, "voice inventory unavailable, audio will be skipped");
                Vec::new()
            }
        };
        let mut guard = self.lock_cache();
        if guard.is_none() {
            *guard = Some(voices);
        }
    }

    /// The cached voice inventory, populating it on first use.
    pub async fn voices(&self) -> Vec<SynthVoice> {
        if let Some(v) = self.cached_voices() {
            return v;
        }
        self.initialize().await;
        self.cached_voices().unwrap_or_default()
    }

    /// Stop whatever is currently playing. Safe to call repeatedly and
    /// when nothing is in flight.
    pub fn cancel_current(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.engine.cancel();
    }

    /// Speak one utterance, forwarding live word boundaries to `on_word`
    /// as `(char_index_in_utterance_text, word)`. Resolves when the
    /// utterance finishes or is cancelled; boundaries arriving after a
    /// cancel are suppressed.
    pub async fn speak<F>(&self, utterance: Utterance, mut on_word: F) -> Result<(), SynthError>
    where
        F: FnMut(usize, &str),
    {
        self.engine.cancel();
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let mut speaking = std::pin::pin!(self.engine.speak(utterance, events_tx));

        let result = loop {
            tokio::select! {
                res = &mut speaking => break res,
                event = events_rx.recv() => match event {
                    Some(SpeechEvent::WordBoundary { char_index, word }) => {
                        if self.generation.load(Ordering::SeqCst) == my_generation {
                            on_word(char_index, &word);
                        }
                    }
                    None => break speaking.await,
                },
            }
        };

        // Boundaries that raced utterance completion.
        while let Ok(SpeechEvent::WordBoundary { char_index, word }) = events_rx.try_recv() {
            if self.generation.load(Ordering::SeqCst) == my_generation {
                on_word(char_index, &word);
            }
        }

        result
    }

    fn cached_voices(&self) -> Option<Vec<SynthVoice>> {
        self.lock_cache().clone()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, Option<Vec<SynthVoice>>> {
        match self.voice_cache.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("voice cache lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    struct FlakyVoicesEngine {
        calls: AtomicU32,
        empty_first: u32,
    }

    impl SpeechEngine for FlakyVoicesEngine {
        fn voices(&self) -> BoxFuture<'_, Result<Vec<SynthVoice>, SynthError>> {
            async move {
                let call = self.calls.fetch_add(1, Ordering::Relaxed);
                if call < self.empty_first {
                    Ok(Vec::new())
                } else {
                    Ok(vec![SynthVoice {
                        id: "v1".into(),
                        name: "Test Voice".into(),
                        lang: "en-GB".into(),
                        local_service: true,
                        default_voice: true,
                    }])
                }
            }
            .boxed()
        }

        fn speak(
            &self,
            _utterance: Utterance,
            _events: mpsc::UnboundedSender<SpeechEvent>,
        ) -> BoxFuture<'_, Result<(), SynthError>> {
            async move { Ok(()) }.boxed()
        }

        fn cancel(&self) {}
    }

    struct ScriptedEngine {
        boundaries: Vec<(usize, &'static str)>,
    }

    impl SpeechEngine for ScriptedEngine {
        fn voices(&self) -> BoxFuture<'_, Result<Vec<SynthVoice>, SynthError>> {
            async move { Ok(Vec::new()) }.boxed()
        }

        fn speak(
            &self,
            _utterance: Utterance,
            events: mpsc::UnboundedSender<SpeechEvent>,
        ) -> BoxFuture<'_, Result<(), SynthError>> {
            let boundaries = self.boundaries.clone();
            async move {
                for (char_index, word) in boundaries {
                    let _ = events.send(SpeechEvent::WordBoundary {
                        char_index,
                        word: word.to_owned(),
                    });
                    tokio::task::yield_now().await;
                }
                Ok(())
            }
            .boxed()
        }

        fn cancel(&self) {}
    }

    fn utterance() -> Utterance {
        Utterance {
            text: "one two".into(),
            voice_id: "v1".into(),
            pitch: 0.15,
            rate: 0.4,
            volume: 0.9,
        }
    }

    #[tokio::test]
    async fn initialize_retries_until_inventory_appears() {
        let service = SynthService::new(Arc::new(FlakyVoicesEngine {
            calls: AtomicU32::new(0),
            empty_first: 2,
        }))
        .with_retry(RetryConfig::new(5, Duration::from_millis(1)));

        service.initialize().await;
        assert_eq!(service.voices().await.len(), 1);
    }

    #[tokio::test]
    async fn initialize_soft_fails_to_empty_inventory() {
        let service = SynthService::new(Arc::new(FlakyVoicesEngine {
            calls: AtomicU32::new(0),
            empty_first: u32::MAX,
        }))
        .with_retry(RetryConfig::new(2, Duration::from_millis(1)));

        service.initialize().await;
        assert!(service.voices().await.is_empty());
        // A second initialize is a no-op, not another retry storm.
        service.initialize().await;
    }

    #[tokio::test]
    async fn boundaries_are_forwarded_in_order() {
        let service = SynthService::new(Arc::new(ScriptedEngine {
            boundaries: vec![(0, "one"), (4, "two")],
        }));
        let mut seen = Vec::new();
        service
            .speak(utterance(), |i, w| seen.push((i, w.to_owned())))
            .await
            .unwrap();
        assert_eq!(seen, vec![(0, "one".to_owned()), (4, "two".to_owned())]);
    }

    #[tokio::test]
    async fn cancel_suppresses_stale_boundaries() {
        let service = Arc::new(SynthService::new(Arc::new(ScriptedEngine {
            boundaries: vec![(0, "one"), (4, "two")],
        })));
        let mut seen = Vec::new();
        service
            .speak(utterance(), |i, _| {
                // Simulate a global stop fired while the utterance is in
                // flight: everything after this point is stale.
                service.cancel_current();
                seen.push(i);
            })
            .await
            .unwrap();
        assert_eq!(seen, vec![0]);
    }

    #[tokio::test]
    async fn cancel_current_is_idempotent() {
        let service = SynthService::new(Arc::new(ScriptedEngine { boundaries: vec![] }));
        service.cancel_current();
        service.cancel_current();
    }
}
