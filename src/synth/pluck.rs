//! Clocked chord arpeggiator with plucked timbres.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::f32::consts::TAU;

use crate::dsp::envelope::{Adsr, Retrigger};
use crate::dsp::filter::RcFilter;
use crate::dsp::oscillator::{Phase, Waveform};
use crate::dsp::trigger::EdgeDetector;
use crate::module::{freq_to_midi, Module, ProcessCtx, AUDIO_5V};
use crate::sequencing::arp::{ArpOrder, Arpeggio, StepSubdivider};
use crate::synth::chord::{slot_lights, ChordSlot, SLOT_COUNT};
use crate::synth::pitch::PitchDetector;

/// Step spacing while no clock is patched, seconds.
pub const FREE_RUN_PERIOD: f32 = 0.1;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PluckTimbre {
    #[default]
    Piano,
    Harp,
    Organ,
    Sine,
    Square,
    Saw,
    Triangle,
}

impl PluckTimbre {
    pub fn from_index(index: i32) -> Self {
        match index.clamp(0, 6) {
            0 => PluckTimbre::Piano,
            1 => PluckTimbre::Harp,
            2 => PluckTimbre::Organ,
            3 => PluckTimbre::Sine,
            4 => PluckTimbre::Square,
            5 => PluckTimbre::Saw,
            _ => PluckTimbre::Triangle,
        }
    }

    /// Normalized cutoff of the rolloff filter for the additive timbres.
    fn rolloff(self) -> Option<f32> {
        match self {
            PluckTimbre::Piano => Some(0.3),
            PluckTimbre::Harp => Some(0.5),
            PluckTimbre::Organ => Some(0.4),
            _ => None,
        }
    }

    #[inline]
    fn render(self, phase: f32) -> f32 {
        let partial = |h: f32| (TAU * phase * h).sin();
        match self {
            PluckTimbre::Piano => {
                let square = Waveform::Square.render(phase);
                (square + 0.5 * partial(2.0) + 0.25 * partial(3.0)) / 1.75
            }
            PluckTimbre::Harp => (partial(1.0) + 0.3 * partial(2.0) + 0.15 * partial(3.0)) / 1.45,
            PluckTimbre::Organ => (partial(1.0) + 0.5 * partial(2.0) + 0.33 * partial(3.0)) / 1.83,
            PluckTimbre::Sine => Waveform::Sine.render(phase),
            PluckTimbre::Square => Waveform::Square.render(phase),
            PluckTimbre::Saw => Waveform::Saw.render(phase),
            PluckTimbre::Triangle => Waveform::Triangle.render(phase),
        }
    }
}

/// The single sounding voice. Steps jump its frequency with no glide.
#[derive(Debug, Clone, Default)]
struct LeadVoice {
    phase: Phase,
    freq: f32,
    timbre: PluckTimbre,
    rolloff: RcFilter,
    active: bool,
}

impl LeadVoice {
    #[inline]
    fn tick(&mut self, dt: f32) -> f32 {
        if !self.active {
            return 0.0;
        }
        let phase = self.phase.advance(self.freq, dt);
        let s = self.timbre.render(phase);
        match self.timbre.rolloff() {
            Some(cutoff) => {
                self.rolloff.set_cutoff(cutoff);
                self.rolloff.process(s)
            }
            None => s,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PluckParams {
    pub timbre: PluckTimbre,
    /// -2..2 octaves
    pub octave: f32,
    /// Steps per clock edge as a power of two, 0..5
    pub step_rate: u32,
    pub slots: [ChordSlot; SLOT_COUNT],
    /// Extra octaves spanned by the arpeggio, 0..2
    pub range: u32,
    pub order: ArpOrder,
    /// Notes kept from the arpeggio, 1..7
    pub voices: u32,
    pub attack: f32,
    pub decay_release: f32,
    pub sustain: f32,
}

impl Default for PluckParams {
    fn default() -> Self {
        Self {
            timbre: PluckTimbre::Piano,
            octave: 0.0,
            step_rate: 0,
            slots: [ChordSlot::default(); SLOT_COUNT],
            range: 0,
            order: ArpOrder::Up,
            voices: 3,
            attack: 0.001,
            decay_release: 0.1,
            sustain: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PluckInputs {
    pub clock: Option<f32>,
    pub reset: Option<f32>,
    pub aux: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PluckOutputs {
    pub audio: f32,
    /// 1V/oct of the last step, 0V = C4
    pub note: f32,
    pub slot_lights: [f32; SLOT_COUNT],
}

#[derive(Debug, Clone)]
pub struct ChordPluck {
    lead: LeadVoice,
    envelope: Adsr,
    detector: PitchDetector,
    arp: Arpeggio,
    subdivider: StepSubdivider,
    clock: EdgeDetector,
    reset: EdgeDetector,
    slot: usize,
    edges: u32,
    note_cv: f32,
    // Free-running state
    last_slot: Option<usize>,
    free_timer: f32,
    rng: SmallRng,
}

impl Default for ChordPluck {
    fn default() -> Self {
        Self::new()
    }
}

impl ChordPluck {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            lead: LeadVoice::default(),
            envelope: Adsr::adsr(0.001, 0.1, 0.0, 0.1, Retrigger::Pluck),
            detector: PitchDetector::new(),
            arp: Arpeggio::default(),
            subdivider: StepSubdivider::new(),
            clock: EdgeDetector::default(),
            reset: EdgeDetector::default(),
            slot: 0,
            edges: 0,
            note_cv: 0.0,
            last_slot: None,
            free_timer: 0.0,
            rng,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn arpeggio(&self) -> &Arpeggio {
        &self.arp
    }

    fn aux_root(&self, inputs: &PluckInputs) -> Option<f32> {
        inputs.aux.and(self.detector.frequency())
    }

    fn rebuild(&mut self, params: &PluckParams, inputs: &PluckInputs) {
        let slot = params.slots[self.slot];
        let octave = params.octave.clamp(-2.0, 2.0);
        let root = match self.aux_root(inputs) {
            Some(freq) => freq * 2.0_f32.powf(octave),
            None => slot.root(octave),
        };
        self.arp = Arpeggio::build(
            root,
            &slot.intervals(),
            params.range.min(2) as usize + 1,
            params.order,
            params.voices.clamp(1, 7) as usize,
            &mut self.rng,
        );
    }

    fn step(&mut self, params: &PluckParams, inputs: &PluckInputs) {
        if self.arp.is_empty() {
            self.rebuild(params, inputs);
        }
        let Some(freq) = self.arp.step() else {
            return;
        };

        self.note_cv = (freq_to_midi(freq) - 60.0) / 12.0;
        self.lead.freq = freq;
        self.lead.timbre = match self.aux_root(inputs) {
            Some(_) => PluckTimbre::Sine,
            None => params.timbre,
        };
        self.lead.active = true;
        self.envelope.gate_on();
    }

    fn clocked(&mut self, ctx: &ProcessCtx, params: &PluckParams, inputs: &PluckInputs, v: f32) {
        if self.clock.rising(v) {
            if self.arp.is_empty() {
                self.rebuild(params, inputs);
            }
            // A full pass through the list moves on to the next chord
            if !self.arp.is_empty() && self.arp.index() == 0 && self.edges > 0 {
                self.slot = (self.slot + 1) % SLOT_COUNT;
                self.rebuild(params, inputs);
            }

            self.subdivider.edge(ctx.time(), params.step_rate.min(5));
            self.step(params, inputs);
            self.edges = self.edges.saturating_add(1);
        }

        if self.subdivider.process(ctx.sample_time) {
            self.step(params, inputs);
        }
    }

    fn free_running(&mut self, ctx: &ProcessCtx, params: &PluckParams, inputs: &PluckInputs) {
        if self.last_slot != Some(self.slot) {
            self.rebuild(params, inputs);
            self.last_slot = Some(self.slot);
        }

        self.free_timer += ctx.sample_time;
        if self.free_timer >= FREE_RUN_PERIOD {
            self.step(params, inputs);
            self.free_timer = 0.0;
        }
    }
}

impl Module for ChordPluck {
    type Params = PluckParams;
    type Inputs = PluckInputs;
    type Outputs = PluckOutputs;

    fn process(&mut self, ctx: &ProcessCtx, params: &PluckParams, inputs: &PluckInputs) -> PluckOutputs {
        let dt = ctx.sample_time;
        let decay_release = params.decay_release.clamp(0.01, 1.0);
        self.envelope.set_times(
            params.attack.clamp(0.001, 0.1),
            decay_release,
            params.sustain,
            decay_release,
        );

        self.detector.process(inputs.aux, dt);

        if let Some(v) = inputs.reset {
            if self.reset.rising(v) {
                self.slot = 0;
                self.edges = 0;
                self.subdivider.cancel();
                self.rebuild(params, inputs);
            }
        }

        match inputs.clock {
            Some(v) => self.clocked(ctx, params, inputs, v),
            None => {
                self.clock.track(0.0);
                self.free_running(ctx, params, inputs);
            }
        }

        let env = self.envelope.process(dt);
        let out = self.lead.tick(dt) * env;

        PluckOutputs {
            audio: out * AUDIO_5V,
            note: self.note_cv,
            slot_lights: slot_lights(self.slot),
        }
    }

    fn reset(&mut self) {
        self.lead = LeadVoice::default();
        self.envelope.reset();
        self.detector.reset();
        self.arp.clear();
        self.subdivider.reset();
        self.clock.reset();
        self.reset.reset();
        self.slot = 0;
        self.edges = 0;
        self.note_cv = 0.0;
        self.last_slot = None;
        self.free_timer = 0.0;
    }
}
