mod parser;

use serde::{Deserialize, Serialize};

pub use parser::{parse, strip_tags, EmotionalSegment};

/// Closed vocabulary of emotion markers the AI persona may emit.
///
/// Tag names arrive in arbitrary case (`[MOCKING]`, `[mocking]`); anything
/// outside this set is coerced to [`EmotionTag::Neutral`] by the parser.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EmotionTag {
    Angry,
    Threatening,
    Excited,
    Sinister,
    Disappointed,
    Triumphant,
    Impatient,
    Mocking,
    Calculating,
    Urgent,
    Whisper,
    Neutral,
}

impl EmotionTag {
    pub const ALL: [EmotionTag; 12] = [
        EmotionTag::Angry,
        EmotionTag::Threatening,
        EmotionTag::Excited,
        EmotionTag::Sinister,
        EmotionTag::Disappointed,
        EmotionTag::Triumphant,
        EmotionTag::Impatient,
        EmotionTag::Mocking,
        EmotionTag::Calculating,
        EmotionTag::Urgent,
        EmotionTag::Whisper,
        EmotionTag::Neutral,
    ];

    /// Case-insensitive lookup of a bracketed tag name.
    pub fn from_tag_name(name: &str) -> Option<EmotionTag> {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "angry" => Some(EmotionTag::Angry),
            "threatening" => Some(EmotionTag::Threatening),
            "excited" => Some(EmotionTag::Excited),
            "sinister" => Some(EmotionTag::Sinister),
            "disappointed" => Some(EmotionTag::Disappointed),
            "triumphant" => Some(EmotionTag::Triumphant),
            "impatient" => Some(EmotionTag::Impatient),
            "mocking" => Some(EmotionTag::Mocking),
            "calculating" => Some(EmotionTag::Calculating),
            "urgent" => Some(EmotionTag::Urgent),
            "whisper" => Some(EmotionTag::Whisper),
            "neutral" => Some(EmotionTag::Neutral),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EmotionTag::Angry => "angry",
            EmotionTag::Threatening => "threatening",
            EmotionTag::Excited => "excited",
            EmotionTag::Sinister => "sinister",
            EmotionTag::Disappointed => "disappointed",
            EmotionTag::Triumphant => "triumphant",
            EmotionTag::Impatient => "impatient",
            EmotionTag::Mocking => "mocking",
            EmotionTag::Calculating => "calculating",
            EmotionTag::Urgent => "urgent",
            EmotionTag::Whisper => "whisper",
            EmotionTag::Neutral => "neutral",
        }
    }

    /// Synthesizer parameters for this emotion.
    ///
    /// Pitch stays low across the board; the persona is a menacing machine
    /// and higher pitches undermine that register.
    pub fn voice_preset(self) -> VoicePreset {
        match self {
            EmotionTag::Angry => VoicePreset::new(0.10, 0.45, 1.0),
            EmotionTag::Threatening => VoicePreset::new(0.05, 0.35, 1.0),
            EmotionTag::Excited => VoicePreset::new(0.25, 0.60, 1.0),
            EmotionTag::Sinister => VoicePreset::new(0.05, 0.30, 0.9),
            EmotionTag::Disappointed => VoicePreset::new(0.15, 0.35, 0.85),
            EmotionTag::Triumphant => VoicePreset::new(0.20, 0.45, 1.0),
            EmotionTag::Impatient => VoicePreset::new(0.20, 0.55, 0.95),
            EmotionTag::Mocking => VoicePreset::new(0.30, 0.40, 0.9),
            EmotionTag::Calculating => VoicePreset::new(0.10, 0.35, 0.9),
            EmotionTag::Urgent => VoicePreset::new(0.20, 0.60, 1.0),
            EmotionTag::Whisper => VoicePreset::new(0.10, 0.30, 0.4),
            EmotionTag::Neutral => VoicePreset::new(0.15, 0.40, 0.9),
        }
    }
}

/// Static per-emotion synthesizer parameters.
///
/// `pitch` and `rate` are in the synthesizer's 0.0..=2.0 range, `volume`
/// in 0.0..=1.0. Configuration data, never mutated at runtime.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct VoicePreset {
    pub pitch: f32,
    pub rate: f32,
    pub volume: f32,
}

impl VoicePreset {
    const fn new(pitch: f32, rate: f32, volume: f32) -> Self {
        Self {
            pitch,
            rate,
            volume,
        }
    }
}
