use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::loader::{BankLoader, WavetableBanks};
use super::table::{mip_for, Quality};
use crate::dsp::interp::lerp;
use crate::dsp::mix::soft_clip;
use crate::dsp::oscillator::wrap_unit;
use crate::dsp::trigger::SchmittTrigger;
use crate::module::{Module, ProcessCtx, AUDIO_5V, FREQ_C4};

/*
Signal Flow
===========

  pitch ─→ f ─┬─→ voice 0 ─┐
              ├─→ voice 1 ─┤  (unison, detuned in cents, panned)
              └─→ ...      ┘
                   │
     per voice:    phase ─→ bank A @ X ─┐
                          └→ bank B @ Y ─┴─ xfade ─→ warp A ─→ warp B ─→ pan
                   │
              Σ voices / n ─→ soft_clip(Σ · level · 5) ─→ L, R

Both banks are read at the same phase so the crossfade never beats.
*/

pub const MAX_UNISON: usize = 4;

/// Waveshaping applied after the bank crossfade.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarpMode {
    #[default]
    PhaseDistort,
    BendAsym,
    Mirror,
    Fold,
    SyncLike,
}

impl WarpMode {
    pub const ALL: [WarpMode; 5] = [
        WarpMode::PhaseDistort,
        WarpMode::BendAsym,
        WarpMode::Mirror,
        WarpMode::Fold,
        WarpMode::SyncLike,
    ];

    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.clamp(0, 4) as usize]
    }

    /// Warp `sample` (read at `phase`) by `amount` in [0, 1].
    ///
    /// Amounts below 0.0001 return the sample untouched.
    pub fn apply(self, sample: f32, phase: f32, amount: f32) -> f32 {
        if amount < 0.0001 {
            return sample;
        }
        let warped = match self {
            WarpMode::PhaseDistort => {
                let k = 0.5 + amount * 1.5;
                (TAU * phase.powf(k)).sin() * 0.9
            }
            WarpMode::BendAsym => (sample * (1.0 + amount * 3.0)).tanh(),
            WarpMode::Mirror => {
                let mut s = sample.abs();
                if phase > 0.5 {
                    s = -s;
                }
                s * (1.0 - amount) + sample * amount
            }
            WarpMode::Fold => lerp(sample, fold(sample), amount),
            WarpMode::SyncLike => {
                let p = phase * (1.0 + amount * 7.0);
                (TAU * (p - p.floor())).sin() * 0.9
            }
        };
        lerp(sample, warped, amount)
    }
}

/// Reflect into [-1, 1].
fn fold(x: f32) -> f32 {
    if !x.is_finite() {
        return 0.0;
    }
    let mut s = x;
    while s > 1.0 || s < -1.0 {
        if s > 1.0 {
            s = 2.0 - s;
        } else {
            s = -2.0 - s;
        }
    }
    s
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavetableParams {
    /// Semitones, -48..48
    pub coarse: f32,
    /// Cents, -50..50
    pub fine: f32,
    /// -1..1
    pub fm_amount: f32,
    pub x_position: f32,
    pub y_position: f32,
    pub crossfade: f32,
    pub warp_a: WarpMode,
    pub warp_a_amount: f32,
    pub warp_b: WarpMode,
    pub warp_b_amount: f32,
    /// 1..4
    pub unison: u32,
    pub detune: f32,
    pub spread: f32,
    pub quality: Quality,
    pub level: f32,
    /// Phase the sync input resets voices to
    pub phase: f32,
}

impl Default for WavetableParams {
    fn default() -> Self {
        Self {
            coarse: 0.0,
            fine: 0.0,
            fm_amount: 0.0,
            x_position: 0.0,
            y_position: 0.0,
            crossfade: 0.5,
            warp_a: WarpMode::PhaseDistort,
            warp_a_amount: 0.0,
            warp_b: WarpMode::PhaseDistort,
            warp_b_amount: 0.0,
            unison: 1,
            detune: 0.2,
            spread: 0.5,
            quality: Quality::Medium,
            level: 0.8,
            phase: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WavetableInputs {
    /// 1V/oct
    pub pitch: Option<f32>,
    pub fm: Option<f32>,
    pub wt_x: Option<f32>,
    pub wt_y: Option<f32>,
    pub crossfade: Option<f32>,
    pub warp_a: Option<f32>,
    pub warp_b: Option<f32>,
    pub sync: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WavetableOutputs {
    pub left: f32,
    pub right: f32,
}

/// Two-bank morphing wavetable oscillator with unison and warps.
pub struct WavetableOscillator {
    banks: WavetableBanks,
    sync: SchmittTrigger,
    phases: [f32; MAX_UNISON],
}

impl WavetableOscillator {
    /// Oscillator with the default banks, plus the loader that feeds it.
    pub fn new() -> (Self, BankLoader) {
        let (banks, loader) = WavetableBanks::new();
        (
            Self {
                banks,
                sync: SchmittTrigger::new(0.0, 1.0),
                phases: [0.0; MAX_UNISON],
            },
            loader,
        )
    }

    /// Base frequency in Hz before unison detune.
    pub fn frequency(params: &WavetableParams, inputs: &WavetableInputs) -> f32 {
        let pitch_cv = inputs.pitch.unwrap_or(0.0) * 12.0;
        let fm = inputs
            .fm
            .map(|v| v * params.fm_amount.clamp(-1.0, 1.0) * 12.0)
            .unwrap_or(0.0);
        let semitones =
            pitch_cv + params.coarse.clamp(-48.0, 48.0) + params.fine.clamp(-50.0, 50.0) / 100.0 + fm;
        (FREQ_C4 * 2.0_f32.powf(semitones / 12.0)).clamp(1.0, 20_000.0)
    }

    pub fn is_ready(&self) -> bool {
        self.banks.is_ready()
    }
}

/// Knob plus half-scale CV (±10V covers ±0.5), clamped to [0, 1].
#[inline]
fn with_cv(knob: f32, cv: Option<f32>) -> f32 {
    (knob + cv.map(|v| v / 10.0 * 0.5).unwrap_or(0.0)).clamp(0.0, 1.0)
}

impl Module for WavetableOscillator {
    type Params = WavetableParams;
    type Inputs = WavetableInputs;
    type Outputs = WavetableOutputs;

    fn process(
        &mut self,
        ctx: &ProcessCtx,
        params: &WavetableParams,
        inputs: &WavetableInputs,
    ) -> WavetableOutputs {
        self.banks.poll();
        if !self.banks.is_ready() {
            return WavetableOutputs::default();
        }

        let freq = Self::frequency(params, inputs);
        let x = with_cv(params.x_position, inputs.wt_x);
        let y = with_cv(params.y_position, inputs.wt_y);
        let xfade = with_cv(params.crossfade, inputs.crossfade);
        let warp_a_amount = with_cv(params.warp_a_amount, inputs.warp_a);
        let warp_b_amount = with_cv(params.warp_b_amount, inputs.warp_b);

        let voices = params.unison.clamp(1, MAX_UNISON as u32) as usize;
        let detune_cents = params.detune.clamp(0.0, 1.0) * 30.0;
        let spread = params.spread.clamp(0.0, 1.0);
        let level = params.level.clamp(0.0, 1.0);
        let start_phase = wrap_unit(params.phase.clamp(0.0, 1.0));

        let sync_level = (inputs.sync - 0.1) / (2.0 - 0.1);
        let sync = self.sync.process(sync_level);

        let bank_a = self.banks.bank(0);
        let bank_b = self.banks.bank(1);
        let inv_voices = 1.0 / voices as f32;
        let centre = (voices - 1) as f32 * 0.5;

        let mut left = 0.0;
        let mut right = 0.0;
        for (v, phase) in self.phases.iter_mut().take(voices).enumerate() {
            let cents = (v as f32 - centre) * detune_cents;
            let voice_freq = freq * 2.0_f32.powf(cents / 1200.0);

            if sync {
                *phase = start_phase;
            }
            *phase = wrap_unit(*phase + voice_freq * ctx.sample_time);

            let mip = mip_for(voice_freq, ctx.sample_rate, params.quality);
            let a = bank_a.read(x, *phase, mip, params.quality);
            let b = bank_b.read(y, *phase, mip, params.quality);
            let mut sample = lerp(a, b, xfade);
            sample = params.warp_a.apply(sample, *phase, warp_a_amount);
            sample = params.warp_b.apply(sample, *phase, warp_b_amount);

            let pan = if voices > 1 {
                (v as f32 / (voices - 1) as f32 - 0.5) * 2.0 * spread
            } else {
                0.0
            };
            left += sample * (1.0 - pan) * inv_voices;
            right += sample * (1.0 + pan) * inv_voices;
        }

        WavetableOutputs {
            left: soft_clip(left * level * AUDIO_5V),
            right: soft_clip(right * level * AUDIO_5V),
        }
    }

    fn reset(&mut self) {
        self.sync.reset();
        self.phases = [0.0; MAX_UNISON];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::DecodedSample;

    fn render(
        osc: &mut WavetableOscillator,
        params: &WavetableParams,
        inputs: &WavetableInputs,
        n: usize,
    ) -> Vec<WavetableOutputs> {
        let mut ctx = ProcessCtx::new(48_000.0);
        (0..n)
            .map(|_| {
                let out = osc.process(&ctx, params, inputs);
                ctx.advance();
                out
            })
            .collect()
    }

    #[test]
    fn pitch_follows_volt_per_octave() {
        let params = WavetableParams::default();
        let c4 = WavetableOscillator::frequency(&params, &WavetableInputs::default());
        assert!((c4 - FREQ_C4).abs() < 1e-3);

        let up = WavetableInputs {
            pitch: Some(1.0),
            ..Default::default()
        };
        let c5 = WavetableOscillator::frequency(&params, &up);
        assert!((c5 - 2.0 * FREQ_C4).abs() < 1e-2);

        let extreme = WavetableInputs {
            pitch: Some(20.0),
            ..Default::default()
        };
        assert_eq!(WavetableOscillator::frequency(&params, &extreme), 20_000.0);
    }

    #[test]
    fn output_is_bounded_by_soft_clip() {
        let (mut osc, _loader) = WavetableOscillator::new();
        let params = WavetableParams {
            unison: 4,
            level: 1.0,
            warp_a: WarpMode::Fold,
            warp_a_amount: 1.0,
            ..Default::default()
        };
        for out in render(&mut osc, &params, &WavetableInputs::default(), 4_800) {
            assert!(out.left.abs() < 1.0 && out.right.abs() < 1.0);
        }
    }

    #[test]
    fn mono_voice_is_centred() {
        let (mut osc, _loader) = WavetableOscillator::new();
        let params = WavetableParams::default();
        for out in render(&mut osc, &params, &WavetableInputs::default(), 512) {
            assert_eq!(out.left, out.right);
        }
    }

    #[test]
    fn published_bank_is_installed_before_reading() {
        let (mut osc, mut loader) = WavetableOscillator::new();
        let params = WavetableParams::default();
        let inputs = WavetableInputs::default();

        loader
            .load(0, &DecodedSample::new(vec![0.5, -0.5, 0.25], 48_000))
            .unwrap();
        assert!(!osc.is_ready());
        let out = render(&mut osc, &params, &inputs, 64);
        assert!(osc.is_ready());
        assert!(out.iter().any(|o| o.left != 0.0));
        assert_eq!(loader.collect(), 1);
    }

    #[test]
    fn sync_resets_phase() {
        let (mut osc, _loader) = WavetableOscillator::new();
        let params = WavetableParams::default();
        let free = WavetableInputs::default();
        let ctx = ProcessCtx::new(48_000.0);
        for _ in 0..1000 {
            osc.process(&ctx, &params, &free);
        }
        let synced = WavetableInputs {
            sync: 5.0,
            ..Default::default()
        };
        osc.process(&ctx, &params, &synced);
        let expected = FREQ_C4 / 48_000.0;
        assert!((osc.phases[0] - expected).abs() < 1e-5);
    }

    #[test]
    fn warps_bypass_at_zero_amount() {
        for mode in WarpMode::ALL {
            assert_eq!(mode.apply(0.3, 0.7, 0.0), 0.3);
        }
    }

    #[test]
    fn fold_reflects_into_range() {
        assert_eq!(fold(1.5), 0.5);
        assert_eq!(fold(-1.25), -0.75);
        assert_eq!(fold(3.5), -0.5);
        assert_eq!(fold(0.2), 0.2);
    }

    #[test]
    fn warp_outputs_stay_finite() {
        for mode in WarpMode::ALL {
            for i in 0..100 {
                let phase = i as f32 / 100.0;
                let v = mode.apply((TAU * phase).sin(), phase, 1.0);
                assert!(v.is_finite() && v.abs() <= 1.0 + 1e-6, "{mode:?}");
            }
        }
    }
}
