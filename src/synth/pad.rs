//! Clocked four-slot chord pad.
//!
//! Each clock edge plays the current slot's chord and moves to the next
//! slot. Voices glide between chords instead of restarting, and the shared
//! pad envelope only re-attacks from idle or release, so chord changes are
//! click-free.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::envelope::{Adsr, Retrigger};
use crate::dsp::filter::RcFilter;
use crate::dsp::oscillator::Waveform;
use crate::dsp::trigger::EdgeDetector;
use crate::module::{Module, ProcessCtx, AUDIO_5V};
use crate::synth::chord::{slot_lights, ChordSlot, SLOT_COUNT};
use crate::synth::pitch::PitchDetector;
use crate::synth::pool::VoicePool;

pub const PAD_VOICES: usize = 4;

/// Top of the tone filter range; presets scale it down.
const MAX_CUTOFF: f32 = 20_000.0;
/// Tone used when the root comes from the aux input.
const AUX_CUTOFF_RATIO: f32 = 0.8;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PadPreset {
    #[default]
    Universe,
    Ocean,
    Desert,
    Harp,
    Piano,
}

impl PadPreset {
    pub fn from_index(index: i32) -> Self {
        match index.clamp(0, 4) {
            0 => PadPreset::Universe,
            1 => PadPreset::Ocean,
            2 => PadPreset::Desert,
            3 => PadPreset::Harp,
            _ => PadPreset::Piano,
        }
    }

    pub fn waveform(self) -> Waveform {
        match self {
            PadPreset::Universe | PadPreset::Harp => Waveform::Sine,
            PadPreset::Ocean => Waveform::Triangle,
            PadPreset::Desert => Waveform::Saw,
            PadPreset::Piano => Waveform::Square,
        }
    }

    /// Lowpass cutoff as a fraction of 20 kHz.
    pub fn cutoff_ratio(self) -> f32 {
        match self {
            PadPreset::Universe => 0.8,
            PadPreset::Ocean => 0.6,
            PadPreset::Desert => 0.4,
            PadPreset::Harp => 1.0,
            PadPreset::Piano => 0.7,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PadParams {
    pub preset: PadPreset,
    /// -2..2 octaves
    pub octave: f32,
    pub slots: [ChordSlot; SLOT_COUNT],
    pub attack: f32,
    /// Shared decay and release time
    pub decay_release: f32,
    pub sustain: f32,
}

impl Default for PadParams {
    fn default() -> Self {
        Self {
            preset: PadPreset::Universe,
            octave: 0.0,
            slots: [ChordSlot::default(); SLOT_COUNT],
            attack: 0.01,
            decay_release: 0.1,
            sustain: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PadInputs {
    pub clock: Option<f32>,
    pub reset: Option<f32>,
    /// Audio whose pitch replaces the slot root
    pub aux: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PadOutputs {
    pub audio: f32,
    pub slot_lights: [f32; SLOT_COUNT],
}

#[derive(Debug, Clone)]
pub struct ChordPad {
    pool: VoicePool,
    envelope: Adsr,
    filter: RcFilter,
    detector: PitchDetector,
    clock: EdgeDetector,
    reset: EdgeDetector,
    slot: usize,
}

impl Default for ChordPad {
    fn default() -> Self {
        Self::new()
    }
}

impl ChordPad {
    pub fn new() -> Self {
        Self {
            pool: VoicePool::new(PAD_VOICES),
            envelope: Adsr::new(Retrigger::Pad),
            filter: RcFilter::new(),
            detector: PitchDetector::new(),
            clock: EdgeDetector::default(),
            reset: EdgeDetector::default(),
            slot: 0,
        }
    }

    /// Slot the next clock edge will play.
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    /// Root frequency from the aux detector, when it has a usable estimate.
    fn aux_root(&self, inputs: &PadInputs) -> Option<f32> {
        inputs.aux.and(self.detector.frequency())
    }

    fn trigger_slot(&mut self, index: usize, params: &PadParams, inputs: &PadInputs) {
        let slot = params.slots[index];
        let octave = params.octave.clamp(-2.0, 2.0);

        let (root, waveform) = match self.aux_root(inputs) {
            Some(freq) => (freq * 2.0_f32.powf(octave), Waveform::Sine),
            None => (slot.root(octave), params.preset.waveform()),
        };

        let intervals = slot.intervals();
        let notes = intervals.as_slice();
        let count = notes.len().min(PAD_VOICES);
        for (i, semitones) in notes.iter().take(count).enumerate() {
            self.pool.assign(i, root * 2.0_f32.powf(semitones / 12.0), waveform);
        }
        for i in count..PAD_VOICES {
            self.pool.fade_out(i);
        }

        self.envelope.gate_on();
    }
}

impl Module for ChordPad {
    type Params = PadParams;
    type Inputs = PadInputs;
    type Outputs = PadOutputs;

    fn process(&mut self, ctx: &ProcessCtx, params: &PadParams, inputs: &PadInputs) -> PadOutputs {
        let dt = ctx.sample_time;
        let decay_release = params.decay_release.clamp(0.001, 2.0);
        self.envelope.set_times(
            params.attack.clamp(0.001, 2.0),
            decay_release,
            params.sustain,
            decay_release,
        );

        self.detector.process(inputs.aux, dt);

        if let Some(v) = inputs.reset {
            if self.reset.rising(v) {
                self.slot = 0;
            }
        }

        if let Some(v) = inputs.clock {
            if self.clock.rising(v) {
                self.trigger_slot(self.slot, params, inputs);
                self.slot = (self.slot + 1) % SLOT_COUNT;
            }
        }

        let env = self.envelope.process(dt);
        let sum = self.pool.render(dt) * env;

        let ratio = match self.aux_root(inputs) {
            Some(_) => AUX_CUTOFF_RATIO,
            None => params.preset.cutoff_ratio(),
        };
        self.filter.set_cutoff(MAX_CUTOFF * ratio / ctx.sample_rate);
        let out = self.filter.process(sum);

        PadOutputs {
            audio: out * AUDIO_5V,
            slot_lights: slot_lights(self.slot),
        }
    }

    fn reset(&mut self) {
        self.pool.reset();
        self.envelope.reset();
        self.filter.reset();
        self.detector.reset();
        self.clock.reset();
        self.reset.reset();
        self.slot = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::chord::ChordType;
    use crate::synth::voice::VoiceState;

    fn clocked(v: f32) -> PadInputs {
        PadInputs {
            clock: Some(v),
            ..Default::default()
        }
    }

    #[test]
    fn clock_edges_cycle_slots() {
        let ctx = ProcessCtx::new(48_000.0);
        let mut pad = ChordPad::new();
        let params = PadParams::default();
        for expected in [1, 2, 3, 0, 1] {
            pad.process(&ctx, &params, &clocked(10.0));
            pad.process(&ctx, &params, &clocked(0.0));
            assert_eq!(pad.slot(), expected);
        }
        let out = pad.process(&ctx, &params, &clocked(0.0));
        assert_eq!(out.slot_lights, [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn reset_returns_to_first_slot() {
        let ctx = ProcessCtx::new(48_000.0);
        let mut pad = ChordPad::new();
        let params = PadParams::default();
        pad.process(&ctx, &params, &clocked(10.0));
        pad.process(&ctx, &params, &clocked(0.0));
        assert_eq!(pad.slot(), 1);
        let inputs = PadInputs {
            reset: Some(5.0),
            clock: Some(0.0),
            ..Default::default()
        };
        pad.process(&ctx, &params, &inputs);
        assert_eq!(pad.slot(), 0);
    }

    #[test]
    fn triad_after_seventh_fades_the_fourth_voice() {
        let ctx = ProcessCtx::new(48_000.0);
        let mut pad = ChordPad::new();
        let mut params = PadParams::default();
        params.slots[0] = ChordSlot::new(0, ChordType::Seventh);
        params.slots[1] = ChordSlot::new(0, ChordType::Major);

        pad.process(&ctx, &params, &clocked(10.0));
        assert_eq!(pad.pool().active_count(), 4);
        pad.process(&ctx, &params, &clocked(0.0));
        pad.process(&ctx, &params, &clocked(10.0));
        assert_eq!(pad.pool().voices()[3].state(), VoiceState::Fading);

        for _ in 0..48_000 {
            pad.process(&ctx, &params, &clocked(0.0));
        }
        assert!(pad.pool().voices()[3].is_free());
        assert_eq!(pad.pool().active_count(), 3);
    }

    #[test]
    fn sounds_after_first_clock() {
        let ctx = ProcessCtx::new(48_000.0);
        let mut pad = ChordPad::new();
        let params = PadParams::default();
        let silent = pad.process(&ctx, &params, &clocked(0.0));
        assert_eq!(silent.audio, 0.0);

        pad.process(&ctx, &params, &clocked(10.0));
        let mut peak = 0.0_f32;
        for _ in 0..4_800 {
            let out = pad.process(&ctx, &params, &clocked(0.0));
            peak = peak.max(out.audio.abs());
            assert!(out.audio.abs() <= AUDIO_5V);
        }
        assert!(peak > 1.0);
    }

    #[test]
    fn presets() {
        assert_eq!(PadPreset::from_index(2).waveform(), Waveform::Saw);
        assert_eq!(PadPreset::from_index(9), PadPreset::Piano);
        assert_eq!(PadPreset::Harp.cutoff_ratio(), 1.0);
    }
}
