#![deny(warnings)]

use anyhow::Context;
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use zyber_voice_core::config::{
    resolve_effect_profile, resolve_engine, resolve_language, EngineKind, SpeechConfig, StdEnv,
    DEFAULT_INTER_SEGMENT_PAUSE_MS,
};
use zyber_voice_core::display::revealed_prefix;
use zyber_voice_core::emotion::strip_tags;
use zyber_voice_core::synth::{SilentSpeechEngine, SpeechEngine, SpeechOrchestrator, SynthService};

#[derive(Parser, Debug)]
#[command(name = "zyber-voice")]
#[command(about = "Speak an emotion-annotated AI response with synchronized text reveal")]
struct Args {
    /// Annotated text, e.g. "[MOCKING] Still here? [THREATENING] Answer me."
    text: String,

    /// Spoken language: en, no, pl, uk
    #[arg(long)]
    language: Option<String>,

    /// Speech engine: tone (audible) or silent
    #[arg(long)]
    engine: Option<String>,

    /// Voice coloring profile: zyber, hal, glados, menacing, glitchy,
    /// hawking, minimal
    #[arg(long)]
    effect_profile: Option<String>,

    #[arg(long, default_value_t = DEFAULT_INTER_SEGMENT_PAUSE_MS)]
    pause_ms: u64,

    /// Cap total speaking time; on expiry speech is cancelled and the
    /// text finishes revealing on its own.
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let env = StdEnv;
    let config = SpeechConfig {
        language: resolve_language(args.language.clone(), &env)?,
        engine: resolve_engine(args.engine.clone(), &env)?,
        effect_profile: resolve_effect_profile(args.effect_profile.clone(), &env)?,
        inter_segment_pause: Duration::from_millis(args.pause_ms),
    };

    tracing::info!(
        language = config.language.code(),
        engine = ?config.engine,
        effect_profile = config
            .effect_profile
            .map(|p| p.name())
            .unwrap_or("none"),
        "config loaded"
    );

    let engine = build_engine(&config)?;
    let service = Arc::new(SynthService::new(engine));
    service.initialize().await;

    let orchestrator = SpeechOrchestrator::new(Arc::clone(&service), config.language)
        .with_pause(config.inter_segment_pause);

    let clean = strip_tags(&args.text);
    let mut stdout = std::io::stdout();
    let mut on_progress = |offset: usize| {
        let prefix = revealed_prefix(&clean, offset);
        let _ = write!(stdout, "\r{prefix}");
        let _ = stdout.flush();
    };

    let speaking = orchestrator.speak_ai_response(&args.text, Some(&mut on_progress));
    match args.timeout_secs {
        Some(secs) => {
            tokio::select! {
                result = speaking => result?,
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    tracing::warn!(timeout_secs = secs, "speech timed out, cancelling");
                    service.cancel_current();
                }
            }
        }
        None => speaking.await?,
    }

    println!("\r{clean}");
    Ok(())
}

fn build_engine(config: &SpeechConfig) -> anyhow::Result<Arc<dyn SpeechEngine>> {
    match config.engine {
        EngineKind::Silent => Ok(Arc::new(SilentSpeechEngine::new())),
        EngineKind::Tone => build_tone_engine(config),
    }
}

#[cfg(feature = "playback-device")]
fn build_tone_engine(config: &SpeechConfig) -> anyhow::Result<Arc<dyn SpeechEngine>> {
    use zyber_voice_core::playback::AudioPlaybackSink;
    use zyber_voice_core::synth::ToneSpeechEngine;

    let sink = Arc::new(AudioPlaybackSink::new()?);
    let mut engine = ToneSpeechEngine::new(sink);
    if let Some(profile) = config.effect_profile {
        engine = engine.with_effect(profile.settings());
    }
    Ok(Arc::new(engine))
}

#[cfg(not(feature = "playback-device"))]
fn build_tone_engine(_config: &SpeechConfig) -> anyhow::Result<Arc<dyn SpeechEngine>> {
    anyhow::bail!("built without the playback-device feature; use --engine silent")
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}
