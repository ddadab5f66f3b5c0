mod chain;
mod nodes;

use serde::{Deserialize, Serialize};

pub use chain::EffectChain;
pub use nodes::running_oscillators;

#[cfg(all(test, feature = "playback-device"))]
pub(crate) use nodes::oscillator_test_guard;

/// The knobs of the synthetic-voice effect chain.
///
/// A value at a stage's skip condition removes that stage from the chain
/// entirely. `sample_rate_reduction` is carried for interface
/// compatibility but is not wired to any stage; see the crate's design
/// notes before giving it behavior.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceEffectSettings {
    /// Playback-rate multiplier applied at the source, not a chain stage.
    pub pitch_shift: f32,
    /// Bits of amplitude resolution; 16 and above skips the bitcrusher.
    pub bit_depth: f32,
    /// Present but intentionally unused by any stage.
    pub sample_rate_reduction: f32,
    /// Scales the formant-bank center frequencies; 1.0 skips the bank.
    pub formant_shift: f32,
    /// Waveshaper drive, 0..=100; 0 skips distortion.
    pub distortion: f32,
    pub ring_mod_frequency: f32,
    /// 0 skips the ring modulator.
    pub ring_mod_mix: f32,
    pub comb_delay_ms: f32,
    /// Clamped to 0.0..=0.9; 0 skips the comb filter.
    pub comb_feedback: f32,
    /// Lowpass cutoff; the lowpass is always present.
    pub filter_frequency: f32,
    pub filter_resonance: f32,
    /// 0 skips the reverb.
    pub reverb_amount: f32,
    /// Impulse length in seconds.
    pub reverb_decay: f32,
    /// Chain-level wet/dry balance; 0 is a bitwise passthrough.
    pub wet_dry_mix: f32,
    pub output_gain: f32,
}

impl Default for VoiceEffectSettings {
    fn default() -> Self {
        // Every stage at its skip condition: a pure passthrough.
        Self {
            pitch_shift: 1.0,
            bit_depth: 16.0,
            sample_rate_reduction: 1.0,
            formant_shift: 1.0,
            distortion: 0.0,
            ring_mod_frequency: 30.0,
            ring_mod_mix: 0.0,
            comb_delay_ms: 8.0,
            comb_feedback: 0.0,
            filter_frequency: 18_000.0,
            filter_resonance: 0.707,
            reverb_amount: 0.0,
            reverb_decay: 1.5,
            wet_dry_mix: 0.0,
            output_gain: 1.0,
        }
    }
}

/// Named parameter sets over the same chain.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VoicePresetProfile {
    Zyber,
    Hal,
    Glados,
    Menacing,
    Glitchy,
    Hawking,
    /// Everything at its skip condition; the debug/comparison baseline.
    Minimal,
}

impl VoicePresetProfile {
    pub const ALL: [VoicePresetProfile; 7] = [
        VoicePresetProfile::Zyber,
        VoicePresetProfile::Hal,
        VoicePresetProfile::Glados,
        VoicePresetProfile::Menacing,
        VoicePresetProfile::Glitchy,
        VoicePresetProfile::Hawking,
        VoicePresetProfile::Minimal,
    ];

    pub fn from_name(name: &str) -> Option<VoicePresetProfile> {
        match name.to_ascii_lowercase().as_str() {
            "zyber" => Some(VoicePresetProfile::Zyber),
            "hal" => Some(VoicePresetProfile::Hal),
            "glados" => Some(VoicePresetProfile::Glados),
            "menacing" => Some(VoicePresetProfile::Menacing),
            "glitchy" => Some(VoicePresetProfile::Glitchy),
            "hawking" => Some(VoicePresetProfile::Hawking),
            "minimal" => Some(VoicePresetProfile::Minimal),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VoicePresetProfile::Zyber => "zyber",
            VoicePresetProfile::Hal => "hal",
            VoicePresetProfile::Glados => "glados",
            VoicePresetProfile::Menacing => "menacing",
            VoicePresetProfile::Glitchy => "glitchy",
            VoicePresetProfile::Hawking => "hawking",
            VoicePresetProfile::Minimal => "minimal",
        }
    }

    pub fn settings(self) -> VoiceEffectSettings {
        let base = VoiceEffectSettings::default();
        match self {
            VoicePresetProfile::Zyber => VoiceEffectSettings {
                pitch_shift: 0.85,
                bit_depth: 8.0,
                formant_shift: 0.9,
                distortion: 25.0,
                ring_mod_frequency: 28.0,
                ring_mod_mix: 0.35,
                comb_delay_ms: 11.0,
                comb_feedback: 0.45,
                filter_frequency: 2_800.0,
                filter_resonance: 2.5,
                reverb_amount: 0.25,
                reverb_decay: 1.6,
                wet_dry_mix: 0.85,
                ..base
            },
            VoicePresetProfile::Hal => VoiceEffectSettings {
                pitch_shift: 0.92,
                formant_shift: 0.95,
                filter_frequency: 2_200.0,
                filter_resonance: 0.9,
                reverb_amount: 0.45,
                reverb_decay: 2.4,
                wet_dry_mix: 0.7,
                ..base
            },
            VoicePresetProfile::Glados => VoiceEffectSettings {
                pitch_shift: 1.12,
                bit_depth: 12.0,
                formant_shift: 1.18,
                distortion: 8.0,
                ring_mod_frequency: 85.0,
                ring_mod_mix: 0.25,
                comb_delay_ms: 6.0,
                comb_feedback: 0.3,
                filter_frequency: 3_600.0,
                filter_resonance: 1.8,
                reverb_amount: 0.2,
                reverb_decay: 1.2,
                wet_dry_mix: 0.9,
                ..base
            },
            VoicePresetProfile::Menacing => VoiceEffectSettings {
                pitch_shift: 0.7,
                bit_depth: 10.0,
                formant_shift: 0.8,
                distortion: 35.0,
                ring_mod_frequency: 22.0,
                ring_mod_mix: 0.45,
                comb_delay_ms: 14.0,
                comb_feedback: 0.6,
                filter_frequency: 1_800.0,
                filter_resonance: 3.0,
                reverb_amount: 0.35,
                reverb_decay: 2.8,
                wet_dry_mix: 0.95,
                ..base
            },
            VoicePresetProfile::Glitchy => VoiceEffectSettings {
                bit_depth: 5.0,
                sample_rate_reduction: 6.0,
                formant_shift: 1.05,
                distortion: 55.0,
                ring_mod_frequency: 140.0,
                ring_mod_mix: 0.6,
                comb_delay_ms: 3.0,
                comb_feedback: 0.75,
                filter_frequency: 4_200.0,
                filter_resonance: 4.0,
                reverb_amount: 0.1,
                reverb_decay: 0.8,
                wet_dry_mix: 1.0,
                ..base
            },
            VoicePresetProfile::Hawking => VoiceEffectSettings {
                pitch_shift: 0.95,
                bit_depth: 7.0,
                distortion: 12.0,
                ring_mod_frequency: 45.0,
                ring_mod_mix: 0.5,
                comb_delay_ms: 9.0,
                comb_feedback: 0.4,
                filter_frequency: 3_000.0,
                filter_resonance: 1.2,
                wet_dry_mix: 1.0,
                ..base
            },
            VoicePresetProfile::Minimal => base,
        }
    }
}
