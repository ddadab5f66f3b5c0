use crate::emotion::{EmotionTag, VoicePreset};
use serde::{Deserialize, Serialize};

/// Languages the app can speak.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    No,
    Pl,
    Uk,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::En, Language::No, Language::Pl, Language::Uk];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::No => "no",
            Language::Pl => "pl",
            Language::Uk => "uk",
        }
    }

    pub fn from_code(code: &str) -> Option<Language> {
        match code.to_ascii_lowercase().as_str() {
            "en" => Some(Language::En),
            "no" | "nb" | "nn" => Some(Language::No),
            "pl" => Some(Language::Pl),
            "uk" => Some(Language::Uk),
            _ => None,
        }
    }

    /// Acceptable synthesizer locales, most neutral variant first. For
    /// English the non-US variants lead; US voices carry too much color
    /// for the persona.
    fn locale_preferences(self) -> &'static [&'static str] {
        match self {
            Language::En => &["en-GB", "en-AU", "en-IE", "en-ZA", "en-IN", "en-US", "en"],
            Language::No => &["nb-NO", "nn-NO", "no-NO", "nb", "no"],
            Language::Pl => &["pl-PL", "pl"],
            Language::Uk => &["uk-UA", "uk"],
        }
    }
}

/// One entry of the platform synthesizer's voice inventory.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SynthVoice {
    pub id: String,
    pub name: String,
    /// BCP-47 style locale, e.g. "en-GB". Underscore separators are
    /// tolerated.
    pub lang: String,
    /// True for voices rendered on-device rather than streamed.
    pub local_service: bool,
    /// True for the platform's marked default voice.
    pub default_voice: bool,
}

/// A concrete voice plus the emotion's synthesizer parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedVoice {
    pub voice: SynthVoice,
    pub preset: VoicePreset,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VoiceError {
    /// The platform reported an empty voice inventory. Not fatal: callers
    /// skip audio and keep the text path alive.
    #[error("no synthesizer voices available")]
    NoVoicesAvailable,
}

/// Named voices known to render clearly and neutrally, tried before any
/// generic local/default fallback.
const PREFERRED_VOICES: &[&str] = &[
    "Daniel",
    "Serena",
    "Karen",
    "Google UK English Male",
    "Google UK English Female",
    "Microsoft George",
    "Microsoft Hazel",
];

/// Voices with strong regional or novelty identity, excluded when picking
/// an English voice unless that would leave nothing to pick.
const DENYLISTED_EN_VOICES: &[&str] = &[
    "Fred", "Rishi", "Fiona", "Veena", "Moira", "Tessa", "Grandma", "Grandpa", "Rocko", "Sandy",
    "Shelley", "Eddy", "Flo", "Reed",
];

/// Pick a synthesizer voice for `language` and pair it with the emotion's
/// static preset. The preset never depends on which voice was chosen.
///
/// Selection order, first match wins: compact voices, the preferred-name
/// list, local-service voices, the platform default, the first voice for
/// the preferred locales, and finally the first voice at all.
pub fn resolve_voice(
    voices: &[SynthVoice],
    language: Language,
    emotion: EmotionTag,
) -> Result<ResolvedVoice, VoiceError> {
    let voice = select_voice(voices, language).ok_or(VoiceError::NoVoicesAvailable)?;
    Ok(ResolvedVoice {
        voice: voice.clone(),
        preset: emotion.voice_preset(),
    })
}

fn select_voice(voices: &[SynthVoice], language: Language) -> Option<&SynthVoice> {
    if voices.is_empty() {
        return None;
    }

    let locales = language.locale_preferences();
    let mut candidates: Vec<&SynthVoice> = voices
        .iter()
        .filter(|v| locales.iter().any(|l| locale_matches(&v.lang, l)))
        .collect();

    if language == Language::En {
        let kept: Vec<&SynthVoice> = candidates
            .iter()
            .copied()
            .filter(|v| !DENYLISTED_EN_VOICES.iter().any(|d| v.name.contains(d)))
            .collect();
        if !kept.is_empty() {
            candidates = kept;
        } else if !candidates.is_empty() {
            tracing::debug!("only denylisted English voices available, keeping them");
        }
    }

    // Compact variants render the most mechanically, which suits the
    // persona better than the high-quality natural voices.
    if let Some(v) = candidates
        .iter()
        .find(|v| v.name.to_ascii_lowercase().contains("compact"))
    {
        return Some(v);
    }
    if let Some(v) = candidates
        .iter()
        .find(|v| PREFERRED_VOICES.iter().any(|p| v.name.contains(p)))
    {
        return Some(v);
    }
    if let Some(v) = candidates.iter().find(|v| v.local_service) {
        return Some(v);
    }
    if let Some(v) = candidates.iter().find(|v| v.default_voice) {
        return Some(v);
    }
    for locale in locales {
        if let Some(v) = candidates.iter().find(|v| locale_matches(&v.lang, locale)) {
            return Some(v);
        }
    }
    voices.first()
}

fn locale_matches(voice_lang: &str, wanted: &str) -> bool {
    let normalized = voice_lang.replace('_', "-");
    normalized.eq_ignore_ascii_case(wanted)
        || normalized
            .to_ascii_lowercase()
            .starts_with(&format!("{}-", wanted.to_ascii_lowercase()))
}
