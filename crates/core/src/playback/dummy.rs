use crate::playback::{PlaybackError, PlaybackSink, RenderedSpeech};
use futures::future::BoxFuture;
use futures::FutureExt;

/// Discards audio. Used headless and as the silent-mode sink.
#[derive(Clone, Default)]
pub struct DummyPlaybackSink;

impl DummyPlaybackSink {
    pub fn new() -> Self {
        Self
    }
}

impl PlaybackSink for DummyPlaybackSink {
    fn play(&self, _clip: RenderedSpeech, _rate: f32) -> BoxFuture<'_, Result<(), PlaybackError>> {
        async move { Ok(()) }.boxed()
    }
}
