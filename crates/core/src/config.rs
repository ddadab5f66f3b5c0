use crate::dsp::VoicePresetProfile;
use crate::voice::Language;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_ENGINE: &str = "tone";
pub const DEFAULT_INTER_SEGMENT_PAUSE_MS: u64 = 600;
pub const ENV_LANGUAGE: &str = "ZYBER_LANGUAGE";
pub const ENV_ENGINE: &str = "ZYBER_ENGINE";
pub const ENV_EFFECT_PROFILE: &str = "ZYBER_EFFECT_PROFILE";

/// Which speech engine implementation to run.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Audible tone bursts through the audio device.
    Tone,
    /// Paced word boundaries, no audio device needed.
    Silent,
}

impl EngineKind {
    pub fn from_name(name: &str) -> Option<EngineKind> {
        match name.to_ascii_lowercase().as_str() {
            "tone" => Some(EngineKind::Tone),
            "silent" => Some(EngineKind::Silent),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SpeechConfig {
    pub language: Language,
    pub engine: EngineKind,
    /// Effect coloring for the rendered voice, if any.
    pub effect_profile: Option<VoicePresetProfile>,
    pub inter_segment_pause: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: Language::En,
            engine: EngineKind::Tone,
            effect_profile: None,
            inter_segment_pause: Duration::from_millis(DEFAULT_INTER_SEGMENT_PAUSE_MS),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown language: {0}")]
    UnknownLanguage(String),
    #[error("unknown engine: {0}")]
    UnknownEngine(String),
    #[error("unknown effect profile: {0}")]
    UnknownEffectProfile(String),
}

/// Environment access behind a seam so config resolution is testable.
pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// CLI value wins, then the environment, then the default.
pub fn resolve_language(cli_value: Option<String>, env: &impl Env) -> Result<Language, ConfigError> {
    let code = cli_value
        .or_else(|| env.var(ENV_LANGUAGE))
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_owned());
    Language::from_code(&code).ok_or(ConfigError::UnknownLanguage(code))
}

pub fn resolve_engine(cli_value: Option<String>, env: &impl Env) -> Result<EngineKind, ConfigError> {
    let name = cli_value
        .or_else(|| env.var(ENV_ENGINE))
        .unwrap_or_else(|| DEFAULT_ENGINE.to_owned());
    EngineKind::from_name(&name).ok_or(ConfigError::UnknownEngine(name))
}

pub fn resolve_effect_profile(
    cli_value: Option<String>,
    env: &impl Env,
) -> Result<Option<VoicePresetProfile>, ConfigError> {
    match cli_value.or_else(|| env.var(ENV_EFFECT_PROFILE)) {
        Some(name) => VoicePresetProfile::from_name(&name)
            .map(Some)
            .ok_or(ConfigError::UnknownEffectProfile(name)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_language_takes_precedence_over_env() {
        let env = MapEnv::default().with_var(ENV_LANGUAGE, "pl");
        let lang = resolve_language(Some("uk".to_owned()), &env).expect("valid");
        assert_eq!(lang, Language::Uk);
    }

    #[test]
    fn env_language_used_when_cli_missing() {
        let env = MapEnv::default().with_var(ENV_LANGUAGE, "pl");
        assert_eq!(resolve_language(None, &env), Ok(Language::Pl));
    }

    #[test]
    fn language_defaults_to_english() {
        assert_eq!(resolve_language(None, &MapEnv::default()), Ok(Language::En));
    }

    #[test]
    fn unknown_language_is_an_error() {
        let err = resolve_language(Some("tlh".to_owned()), &MapEnv::default());
        assert_eq!(err, Err(ConfigError::UnknownLanguage("tlh".to_owned())));
    }

    #[test]
    fn effect_profile_resolves_case_insensitively() {
        let env = MapEnv::default().with_var(ENV_EFFECT_PROFILE, "GLaDOS");
        assert_eq!(
            resolve_effect_profile(None, &env),
            Ok(Some(VoicePresetProfile::Glados))
        );
    }

    #[test]
    fn missing_effect_profile_is_none() {
        assert_eq!(resolve_effect_profile(None, &MapEnv::default()), Ok(None));
    }

    #[test]
    fn engine_defaults_to_tone() {
        assert_eq!(resolve_engine(None, &MapEnv::default()), Ok(EngineKind::Tone));
    }
}
