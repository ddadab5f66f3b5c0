//! The synthetic-voice effect chain.
//!
//! A fixed stage order over f32 PCM: bitcrusher, ring modulator, comb
//! filter, parallel formant bank, distortion, lowpass, convolution
//! reverb, then a chain-level wet/dry mix against the untouched input.
//! Stages whose settings sit at the skip condition are not built at all.

use crate::dsp::nodes::{Biquad, DelayLine, SineOscillator};
use crate::dsp::VoiceEffectSettings;
use crate::playback::RenderedSpeech;
use rand::Rng;
use std::f32::consts::PI;

/// Center frequencies of the vocal-tract resonances the formant bank
/// imitates, before the profile's formant shift.
const FORMANT_BASE_HZ: [f32; 5] = [400.0, 1_000.0, 2_200.0, 3_200.0, 4_500.0];

/// Wet attenuation applied to the reverb so long decays do not wash out
/// intelligibility.
const REVERB_WET_SCALE: f32 = 0.7;

/// A live, stateful instance of the chain, bound to one playback.
///
/// Chains are per-playback and never shared; tear one down with
/// [`EffectChain::cleanup`] (or by dropping it) when its buffer stops,
/// otherwise the ring modulator's oscillator keeps running.
pub struct EffectChain {
    settings: VoiceEffectSettings,
    sample_rate_hz: u32,
    bitcrusher: Option<Bitcrusher>,
    ring_mod: Option<RingModulator>,
    comb: Option<CombFilter>,
    formants: Option<FormantBank>,
    distortion: Option<Waveshaper>,
    lowpass: Biquad,
    reverb: Option<Reverb>,
}

impl EffectChain {
    pub fn build(settings: VoiceEffectSettings, sample_rate_hz: u32) -> Self {
        let bitcrusher = (settings.bit_depth < 16.0).then(|| Bitcrusher::new(settings.bit_depth));
        let ring_mod = (settings.ring_mod_mix != 0.0).then(|| {
            RingModulator::new(settings.ring_mod_frequency, settings.ring_mod_mix, sample_rate_hz)
        });
        let comb = (settings.comb_feedback != 0.0).then(|| {
            CombFilter::new(settings.comb_delay_ms, settings.comb_feedback, sample_rate_hz)
        });
        let formants = (settings.formant_shift != 1.0)
            .then(|| FormantBank::new(settings.formant_shift, sample_rate_hz));
        let distortion = (settings.distortion != 0.0).then(|| Waveshaper::new(settings.distortion));
        let lowpass = Biquad::lowpass(
            sample_rate_hz,
            settings.filter_frequency,
            settings.filter_resonance,
        );
        let reverb = (settings.reverb_amount != 0.0).then(|| {
            Reverb::new(settings.reverb_amount, settings.reverb_decay, sample_rate_hz)
        });

        Self {
            settings,
            sample_rate_hz,
            bitcrusher,
            ring_mod,
            comb,
            formants,
            distortion,
            lowpass,
            reverb,
        }
    }

    pub fn from_profile(profile: crate::dsp::VoicePresetProfile, sample_rate_hz: u32) -> Self {
        Self::build(profile.settings(), sample_rate_hz)
    }

    /// Run the chain over a buffer. The output can be longer than the
    /// input when the reverb adds a tail; the dry path is zero-padded for
    /// the final mix.
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        let mut wet: Vec<f32> = input.to_vec();

        if let Some(stage) = &mut self.bitcrusher {
            for s in &mut wet {
                *s = stage.process(*s);
            }
        }
        if let Some(stage) = &mut self.ring_mod {
            for s in &mut wet {
                *s = stage.process(*s);
            }
        }
        if let Some(stage) = &mut self.comb {
            for s in &mut wet {
                *s = stage.process(*s);
            }
        }
        if let Some(stage) = &mut self.formants {
            for s in &mut wet {
                *s = stage.process(*s);
            }
        }
        if let Some(stage) = &mut self.distortion {
            for s in &mut wet {
                *s = stage.process(*s);
            }
        }
        for s in &mut wet {
            *s = self.lowpass.process(*s);
        }
        if let Some(stage) = &mut self.reverb {
            wet = stage.process(&wet);
        }

        let mix = self.settings.wet_dry_mix.clamp(0.0, 1.0);
        let gain = self.settings.output_gain;
        wet.iter()
            .enumerate()
            .map(|(i, &w)| {
                let dry = input.get(i).copied().unwrap_or(0.0);
                (dry * (1.0 - mix) + w * mix) * gain
            })
            .collect()
    }

    /// Convenience wrapper over [`EffectChain::process`] for rendered
    /// clips. Multi-channel audio is processed as one interleaved stream;
    /// the chain is used on mono speech in practice.
    pub fn process_clip(&mut self, clip: &RenderedSpeech) -> RenderedSpeech {
        let processed = self.process(&clip.to_f32());
        RenderedSpeech::from_f32(&processed, clip.sample_rate_hz, clip.channels)
    }

    /// Playback-rate multiplier the caller applies at the source.
    pub fn playback_rate(&self) -> f32 {
        self.settings.pitch_shift
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Stop the internal oscillator and release the chain. Dropping the
    /// chain has the same effect; this form makes the teardown explicit
    /// at the call site.
    pub fn cleanup(mut self) {
        if let Some(ring) = &mut self.ring_mod {
            ring.stop();
        }
    }
}

/// Quantizes amplitude to `2^-bit_depth` steps.
struct Bitcrusher {
    step: f32,
}

impl Bitcrusher {
    fn new(bit_depth: f32) -> Self {
        Self {
            step: 2.0f32.powf(-bit_depth.clamp(1.0, 16.0)),
        }
    }

    fn process(&mut self, x: f32) -> f32 {
        (x / self.step).round() * self.step
    }
}

/// Multiplies the signal with a sine carrier. A sine, not a sawtooth:
/// harsher carriers modulate dirtier than this voice wants.
struct RingModulator {
    osc: SineOscillator,
    mix: f32,
}

impl RingModulator {
    fn new(frequency_hz: f32, mix: f32, sample_rate_hz: u32) -> Self {
        Self {
            osc: SineOscillator::start(frequency_hz, sample_rate_hz),
            mix: mix.clamp(0.0, 1.0),
        }
    }

    fn process(&mut self, x: f32) -> f32 {
        let modulated = x * self.osc.next_sample();
        x * (1.0 - self.mix) + modulated * self.mix
    }

    fn stop(&mut self) {
        self.osc.stop();
    }
}

/// Single delay line with feedback, summing the direct and delayed paths.
struct CombFilter {
    delay: DelayLine,
    feedback: f32,
}

impl CombFilter {
    fn new(delay_ms: f32, feedback: f32, sample_rate_hz: u32) -> Self {
        let len = (delay_ms / 1_000.0 * sample_rate_hz as f32).round() as usize;
        Self {
            delay: DelayLine::new(len),
            // Hard ceiling; feedback at or above unity self-oscillates.
            feedback: feedback.clamp(0.0, 0.9),
        }
    }

    fn process(&mut self, x: f32) -> f32 {
        let delayed = self.delay.read();
        let out = x + delayed;
        self.delay.write_and_advance(x + delayed * self.feedback);
        out
    }
}

/// Five band-pass filters in parallel, all fed from the stage input and
/// summed. Chaining them serially kills the signal; each band must see
/// the dry input.
struct FormantBank {
    bands: Vec<Biquad>,
    band_gain: f32,
}

impl FormantBank {
    fn new(formant_shift: f32, sample_rate_hz: u32) -> Self {
        let bands = FORMANT_BASE_HZ
            .iter()
            .map(|&f| Biquad::bandpass(sample_rate_hz, f * formant_shift, 6.0))
            .collect::<Vec<_>>();
        Self {
            band_gain: 1.0 / FORMANT_BASE_HZ.len() as f32,
            bands,
        }
    }

    fn process(&mut self, x: f32) -> f32 {
        let summed: f32 = self.bands.iter_mut().map(|b| b.process(x)).sum();
        // Fixed inner 50/50 mix, independent of the chain-level wet/dry.
        0.5 * x + 0.5 * summed * self.band_gain
    }
}

/// Soft-clipping waveshaper, `(π+k)x / (π+k|x|)`.
struct Waveshaper {
    k: f32,
    pre_gain: f32,
    post_gain: f32,
}

impl Waveshaper {
    fn new(distortion: f32) -> Self {
        let k = distortion.clamp(0.0, 100.0);
        let pre_gain = 1.0 + k / 25.0;
        // Normalize so a full-scale input maps back to roughly full scale.
        let driven = Self::curve(k, pre_gain);
        let post_gain = if driven.abs() > f32::EPSILON {
            1.0 / driven
        } else {
            1.0
        };
        Self {
            k,
            pre_gain,
            post_gain,
        }
    }

    fn curve(k: f32, x: f32) -> f32 {
        (PI + k) * x / (PI + k * x.abs())
    }

    fn process(&mut self, x: f32) -> f32 {
        Self::curve(self.k, x * self.pre_gain) * self.post_gain
    }
}

/// Convolution reverb over a generated impulse: exponentially decaying
/// noise rather than a recorded room.
struct Reverb {
    impulse: Vec<f32>,
    amount: f32,
}

impl Reverb {
    fn new(amount: f32, decay_seconds: f32, sample_rate_hz: u32) -> Self {
        let len = ((decay_seconds.max(0.05) * sample_rate_hz as f32) as usize).max(8);
        let mut rng = rand::rng();
        let impulse = (0..len)
            .map(|n| {
                let t = n as f32 / len as f32;
                // -60 dB by the end of the tail.
                let envelope = (-6.9 * t).exp();
                rng.random_range(-1.0f32..1.0) * envelope
            })
            .collect();
        Self {
            impulse,
            amount: amount.clamp(0.0, 1.0),
        }
    }

    /// Direct convolution; output carries the full tail.
    fn process(&mut self, input: &[f32]) -> Vec<f32> {
        if input.is_empty() {
            return Vec::new();
        }
        let mut out = vec![0.0f32; input.len() + self.impulse.len() - 1];
        // Normalize by impulse energy so the tail level tracks `amount`
        // instead of the impulse length.
        let energy: f32 = self.impulse.iter().map(|h| h * h).sum::<f32>().sqrt();
        let norm = if energy > f32::EPSILON {
            1.0 / energy
        } else {
            1.0
        };
        for (i, &x) in input.iter().enumerate() {
            if x == 0.0 {
                continue;
            }
            for (j, &h) in self.impulse.iter().enumerate() {
                out[i + j] += x * h * norm;
            }
        }
        let wet_gain = self.amount * REVERB_WET_SCALE;
        out.iter()
            .enumerate()
            .map(|(i, &wet)| input.get(i).copied().unwrap_or(0.0) + wet * wet_gain)
            .collect()
    }
}
