//! Binaural-beat oscillator.
//!
//! One carrier split into two channels a fixed number of Hz apart:
//!
//! ```text
//! left  = f + beat / 2
//! right = f - beat / 2
//! ```
//!
//! Heard on headphones, the difference is perceived as a slow beat.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::{Phase, Waveform};
use crate::dsp::trigger::EdgeDetector;
use crate::module::{light, Module, ProcessCtx, AUDIO_5V, FREQ_C4};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinauralParams {
    /// Carrier offset from C4 in semitones, -54..54
    pub pitch: f32,
    /// Left/right split in Hz, 0..40
    pub beat: f32,
    pub waveform: Waveform,
    /// Extra harmonics, 0..16 (rounded)
    pub harmonic_count: f32,
    pub harmonic_strength: f32,
}

impl Default for BinauralParams {
    fn default() -> Self {
        Self {
            pitch: 0.0,
            beat: 10.0,
            waveform: Waveform::Sine,
            harmonic_count: 0.0,
            harmonic_strength: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BinauralInputs {
    /// Phase reset on a rising edge
    pub sync: Option<f32>,
    /// 1V/oct pitch modulation
    pub fm: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BinauralOutputs {
    pub left: f32,
    pub right: f32,
    /// One light per shape, in [`Waveform::ALL`] order
    pub waveform_lights: [f32; 4],
}

#[derive(Debug, Clone, Default)]
pub struct BinauralOscillator {
    left: Phase,
    right: Phase,
    sync: EdgeDetector,
}

impl BinauralOscillator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carrier frequency before the beat split.
    pub fn carrier(params: &BinauralParams, inputs: &BinauralInputs) -> f32 {
        let fm = inputs.fm.map(|v| v * 12.0).unwrap_or(0.0);
        let pitch = params.pitch.clamp(-54.0, 54.0) + fm;
        FREQ_C4 * 2.0_f32.powf(pitch / 12.0)
    }
}

impl Module for BinauralOscillator {
    type Params = BinauralParams;
    type Inputs = BinauralInputs;
    type Outputs = BinauralOutputs;

    fn process(
        &mut self,
        ctx: &ProcessCtx,
        params: &BinauralParams,
        inputs: &BinauralInputs,
    ) -> BinauralOutputs {
        let carrier = Self::carrier(params, inputs);
        let half_beat = params.beat.clamp(0.0, 40.0) * 0.5;

        if let Some(sync) = inputs.sync {
            if self.sync.rising(sync) {
                self.left.reset();
                self.right.reset();
            }
        }

        let phase_l = self.left.advance(carrier + half_beat, ctx.sample_time);
        let phase_r = self.right.advance(carrier - half_beat, ctx.sample_time);

        let count = params.harmonic_count.clamp(0.0, 16.0).round() as u32;
        let strength = params.harmonic_strength.clamp(0.0, 1.0);
        let shape = params.waveform;

        let mut waveform_lights = [0.0; 4];
        for (lamp, wf) in waveform_lights.iter_mut().zip(Waveform::ALL) {
            *lamp = light(wf == shape);
        }

        BinauralOutputs {
            left: shape.render_stacked(phase_l, count, strength) * AUDIO_5V,
            right: shape.render_stacked(phase_r, count, strength) * AUDIO_5V,
            waveform_lights,
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_split_by_beat() {
        let sr = 48_000.0;
        let ctx = ProcessCtx::new(sr);
        let mut osc = BinauralOscillator::new();
        let params = BinauralParams {
            beat: 20.0,
            waveform: Waveform::Saw,
            ..Default::default()
        };
        let inputs = BinauralInputs::default();
        osc.process(&ctx, &params, &inputs);

        let expect_l = (FREQ_C4 + 10.0) / sr;
        let expect_r = (FREQ_C4 - 10.0) / sr;
        assert!((osc.left.value() - expect_l).abs() < 1e-6);
        assert!((osc.right.value() - expect_r).abs() < 1e-6);
    }

    #[test]
    fn fm_is_volt_per_octave() {
        let params = BinauralParams::default();
        let up = BinauralInputs {
            fm: Some(1.0),
            ..Default::default()
        };
        let f = BinauralOscillator::carrier(&params, &up);
        assert!((f - 2.0 * FREQ_C4).abs() < 1e-2);
    }

    #[test]
    fn sync_edge_resets_both_phases() {
        let ctx = ProcessCtx::new(48_000.0);
        let mut osc = BinauralOscillator::new();
        let params = BinauralParams::default();
        let low = BinauralInputs {
            sync: Some(0.0),
            ..Default::default()
        };
        for _ in 0..500 {
            osc.process(&ctx, &params, &low);
        }
        let high = BinauralInputs {
            sync: Some(5.0),
            ..Default::default()
        };
        osc.process(&ctx, &params, &high);
        let expect_l = (FREQ_C4 + 5.0) / 48_000.0;
        assert!((osc.left.value() - expect_l).abs() < 1e-6);

        // Held high: no further resets
        osc.process(&ctx, &params, &high);
        assert!(osc.left.value() > expect_l * 1.5);
    }

    #[test]
    fn output_is_five_volt_and_light_follows_shape() {
        let ctx = ProcessCtx::new(48_000.0);
        let mut osc = BinauralOscillator::new();
        let params = BinauralParams {
            waveform: Waveform::Square,
            ..Default::default()
        };
        let out = osc.process(&ctx, &params, &BinauralInputs::default());
        assert_eq!(out.left, 5.0);
        assert_eq!(out.waveform_lights, [0.0, 0.0, 0.0, 1.0]);
    }
}
