//! Gate-driven chord synth.
//!
//! ```text
//! pitch CV ──→ root ──→ chord shape ──→ voicing ──→ motion drift ──→ tuning
//!                                                                       │
//!        ┌──────────────────────────────────────────────────────────────┘
//!        ▼
//!   8 × (osc · ADSR) ──→ pan ──→ RC lowpass (L, R) ──→ delay ──→ reverb ──→ amp
//!        ▲                             ▲                                     ▲
//!        └──────────── LFO: pitch ─────┴─────────── cutoff ────────── amp ───┘
//! ```
//!
//! The chord shape (type, voice count, voicing) is fixed when it changes, so a
//! random voicing is drawn once per chord rather than once per sample. Root,
//! tune, detune, spread and motion are re-applied every sample while the gate
//! is held.

use std::f32::consts::TAU;

use rand::rngs::SmallRng;
use rand::SeedableRng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::delay::DelayLine;
use crate::dsp::envelope::{Adsr, Retrigger};
use crate::dsp::filter::RcFilter;
use crate::dsp::lfo::{Lfo, LfoShape, DEFAULT_TEMPO};
use crate::dsp::mix::pan_split;
use crate::dsp::oscillator::{Phase, Waveform};
use crate::dsp::reverb::SimpleReverb;
use crate::dsp::trigger::EdgeDetector;
use crate::module::{light, Module, ProcessCtx, AUDIO_5V, EDGE_THRESHOLD, FREQ_C4};
use crate::synth::chord::{ChordType, Intervals, Tuning, Voicing, MAX_CHORD_NOTES};

pub const MAX_VOICES: usize = MAX_CHORD_NOTES;

const DELAY_SECONDS: f32 = 0.3;
const MOTION_RATE: f32 = 0.0001;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChordSynthParams {
    pub chord: ChordType,
    /// Voice count, 2..8
    pub voices: usize,
    pub voicing: Voicing,
    pub tuning: Tuning,
    /// Stereo spread, 0..1
    pub spread: f32,
    /// Detune across the voices, -0.5..0.5 semitones
    pub detune: f32,
    /// Fine tune, -1..1 semitones
    pub tune: f32,
    /// Slow interval drift, 0..1
    pub motion: f32,
    /// Lowpass cutoff, 20..20000 Hz
    pub cutoff: f32,
    pub resonance: f32,
    pub fx_mix: f32,
    /// 0.1..20 Hz
    pub lfo_rate: f32,
    pub lfo_shape: LfoShape,
    pub lfo_sync: bool,
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
    pub waveform: Waveform,
    pub mod_pitch: f32,
    pub mod_cutoff: f32,
    pub mod_amp: f32,
}

impl Default for ChordSynthParams {
    fn default() -> Self {
        Self {
            chord: ChordType::Major,
            voices: 3,
            voicing: Voicing::Stack,
            tuning: Tuning::Equal12,
            spread: 0.5,
            detune: 0.0,
            tune: 0.0,
            motion: 0.0,
            cutoff: 10_000.0,
            resonance: 0.0,
            fx_mix: 0.3,
            lfo_rate: 1.0,
            lfo_shape: LfoShape::Sine,
            lfo_sync: false,
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.2,
            waveform: Waveform::Sine,
            mod_pitch: 0.0,
            mod_cutoff: 0.0,
            mod_amp: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChordSynthInputs {
    /// Root, 1V/oct with 0V = C4
    pub pitch: Option<f32>,
    pub gate: f32,
    /// Added to the root, 1V/oct
    pub cv: Option<f32>,
    /// 0..10V across the seven chord types
    pub chord_cv: Option<f32>,
    /// ×5 Hz added to the LFO rate
    pub lfo_rate: Option<f32>,
    /// ×1000 Hz added to the cutoff
    pub modulation: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChordSynthOutputs {
    pub left: f32,
    pub right: f32,
    pub lfo: f32,
    pub gate_light: f32,
}

#[derive(Debug, Clone)]
struct ChordVoice {
    phase: Phase,
    freq: f32,
    /// Semitones
    detune: f32,
    pan: f32,
    env: Adsr,
}

impl ChordVoice {
    fn new() -> Self {
        Self {
            phase: Phase::new(),
            freq: 0.0,
            detune: 0.0,
            pan: 0.0,
            env: Adsr::new(Retrigger::Pad),
        }
    }

    #[inline]
    fn tick(&mut self, waveform: Waveform, cents: f32, dt: f32) -> f32 {
        let freq = self.freq * 2.0_f32.powf((self.detune + cents / 100.0) / 12.0);
        let phase = self.phase.advance(freq, dt);
        let signal = waveform.render(phase);
        signal * self.env.process(dt)
    }
}

/// Allocated on the first `process`, once the sample rate is known.
#[derive(Debug, Clone)]
struct Effects {
    delay: [DelayLine; 2],
    reverb: [SimpleReverb; 2],
    delay_samples: usize,
}

impl Effects {
    fn new(sample_rate: f32) -> Self {
        log::debug!("chord synth: allocating effect buffers at {sample_rate} Hz");
        Self {
            delay: [
                DelayLine::with_duration(DELAY_SECONDS, sample_rate),
                DelayLine::with_duration(DELAY_SECONDS, sample_rate),
            ],
            reverb: [SimpleReverb::new(sample_rate), SimpleReverb::new(sample_rate)],
            delay_samples: (DELAY_SECONDS * sample_rate) as usize,
        }
    }
}

/// What the current interval list was built from.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Shape {
    chord: ChordType,
    voices: usize,
    voicing: Voicing,
}

#[derive(Debug, Clone)]
pub struct ChordSynth {
    voices: [ChordVoice; MAX_VOICES],
    shape: Option<Shape>,
    intervals: Intervals,
    active: usize,
    filters: [RcFilter; 2],
    effects: Option<Effects>,
    lfo: Lfo,
    gate: EdgeDetector,
    gate_high: bool,
    motion_phase: f32,
    rng: SmallRng,
}

impl Default for ChordSynth {
    fn default() -> Self {
        Self::new()
    }
}

impl ChordSynth {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng(), Lfo::new())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed), Lfo::with_seed(seed ^ 0x5eed))
    }

    fn with_rng(rng: SmallRng, lfo: Lfo) -> Self {
        Self {
            voices: std::array::from_fn(|_| ChordVoice::new()),
            shape: None,
            intervals: Intervals::from_slice(&[]),
            active: 3,
            filters: [RcFilter::new(), RcFilter::new()],
            effects: None,
            lfo,
            gate: EdgeDetector::default(),
            gate_high: false,
            motion_phase: 0.0,
            rng,
        }
    }

    /// Base frequencies of the voices in the current chord, before detune
    /// and LFO pitch modulation.
    pub fn voice_frequencies(&self) -> impl Iterator<Item = f32> + '_ {
        self.voices[..self.active].iter().map(|v| v.freq)
    }

    /// Number of voices the current chord uses.
    pub fn active_voices(&self) -> usize {
        self.active
    }

    fn chord_type(params: &ChordSynthParams, inputs: &ChordSynthInputs) -> ChordType {
        match inputs.chord_cv {
            Some(v) => ChordType::from_index((v * 0.6).clamp(0.0, 6.0).round() as i32),
            None => params.chord,
        }
    }

    /// Rebuild the interval list if the chord shape changed.
    fn voice_chord(&mut self, chord: ChordType, params: &ChordSynthParams) {
        let shape = Shape {
            chord,
            voices: params.voices.clamp(2, MAX_VOICES),
            voicing: params.voicing,
        };
        if self.shape == Some(shape) {
            return;
        }

        let mut intervals = chord.intervals(shape.voices);
        shape.voicing.apply(&mut intervals, &mut self.rng);
        let active = intervals.len().min(shape.voices);

        if self.gate_high {
            for (i, voice) in self.voices.iter_mut().enumerate() {
                if i < active && i >= self.active {
                    voice.env.gate_on();
                } else if i >= active {
                    voice.env.gate_off();
                }
            }
        }

        self.intervals = intervals;
        self.active = active;
        self.shape = Some(shape);
    }

    /// Retune the voiced chord to `root` (a MIDI note number).
    fn update_chord(&mut self, root: f32, params: &ChordSynthParams) {
        let root_freq = FREQ_C4 * 2.0_f32.powf((root - 60.0) / 12.0);
        let n = self.active;

        let motion = params.motion.clamp(0.0, 1.0);
        if motion > 0.0 {
            self.motion_phase += MOTION_RATE * motion;
            if self.motion_phase >= 1.0 {
                self.motion_phase -= 1.0;
            }
        }

        let spread = params.spread.clamp(0.0, 1.0);
        let detune = params.detune.clamp(-0.5, 0.5);
        let tune = params.tune.clamp(-1.0, 1.0);
        let intervals = self.intervals;
        let motion_phase = self.motion_phase;

        let voiced = self.voices.iter_mut().zip(intervals.as_slice()).take(n);
        for (i, (voice, &interval)) in voiced.enumerate() {
            let drift = if motion > 0.0 {
                (TAU * motion_phase + i as f32 * 0.5).sin() * 0.5 * motion
            } else {
                0.0
            };
            voice.freq = params.tuning.frequency(interval + drift + tune, root_freq);
            voice.detune = detune * (i as i32 - (n / 2) as i32) as f32 / n as f32;
            let side = if i % 2 == 0 { -1.0 } else { 1.0 };
            voice.pan = side * spread * i as f32 / n as f32;
        }
    }
}

impl Module for ChordSynth {
    type Params = ChordSynthParams;
    type Inputs = ChordSynthInputs;
    type Outputs = ChordSynthOutputs;

    fn process(
        &mut self,
        ctx: &ProcessCtx,
        params: &ChordSynthParams,
        inputs: &ChordSynthInputs,
    ) -> ChordSynthOutputs {
        let dt = ctx.sample_time;

        let mut root = inputs.pitch.map(|v| v * 12.0 + 60.0).unwrap_or(60.0);
        if let Some(cv) = inputs.cv {
            root += cv * 12.0;
        }

        for voice in &mut self.voices {
            voice
                .env
                .set_times(params.attack, params.decay, params.sustain, params.release);
        }

        let chord = Self::chord_type(params, inputs);
        if self.gate.rising(inputs.gate) {
            self.gate_high = true;
            self.shape = None;
            self.voice_chord(chord, params);
            for voice in &mut self.voices[..self.active] {
                voice.env.gate_on();
            }
        } else if inputs.gate <= EDGE_THRESHOLD && self.gate_high {
            self.gate_high = false;
            for voice in &mut self.voices {
                voice.env.gate_off();
            }
        }

        if self.gate_high {
            self.voice_chord(chord, params);
            self.update_chord(root, params);
        }

        let mut lfo_rate = params.lfo_rate.clamp(0.1, 20.0);
        if let Some(v) = inputs.lfo_rate {
            lfo_rate += v * 5.0;
        }
        let tempo = params.lfo_sync.then_some(DEFAULT_TEMPO);
        let lfo = self.lfo.process(lfo_rate, params.lfo_shape, tempo, dt);

        let cents = lfo * params.mod_pitch.clamp(0.0, 1.0) * 50.0;
        let mut left = 0.0;
        let mut right = 0.0;
        for voice in &mut self.voices {
            if !voice.env.is_active() {
                continue;
            }
            let out = voice.tick(params.waveform, cents, dt);
            let (gl, gr) = pan_split(voice.pan);
            left += out * gl;
            right += out * gr;
        }

        let mut cutoff = params.cutoff.clamp(20.0, 20_000.0);
        cutoff *= 1.0 + lfo * params.mod_cutoff.clamp(0.0, 1.0);
        if let Some(v) = inputs.modulation {
            cutoff += v * 1000.0;
        }
        let cutoff = cutoff.clamp(20.0, 20_000.0) / ctx.sample_rate;
        let resonance = params.resonance.clamp(0.0, 1.0);

        let mut out = [left, right];
        for (sample, filter) in out.iter_mut().zip(&mut self.filters) {
            filter.set_cutoff(cutoff);
            let low = filter.process(*sample);
            *sample = low + (*sample - low) * resonance * 0.5;
        }

        let fx = self
            .effects
            .get_or_insert_with(|| Effects::new(ctx.sample_rate));
        let fx_mix = params.fx_mix.clamp(0.0, 1.0);
        let amp = 1.0 + lfo * params.mod_amp.clamp(0.0, 1.0) * 0.5;
        for (ch, sample) in out.iter_mut().enumerate() {
            let delayed = fx.delay[ch].read(fx.delay_samples);
            fx.delay[ch].push(*sample);
            *sample += delayed * fx_mix * 0.3;

            let wet = fx.reverb[ch].process(*sample) * fx_mix * 0.5;
            *sample = *sample * (1.0 - fx_mix * 0.3) + wet;
            *sample *= amp;
        }

        ChordSynthOutputs {
            left: out[0] * AUDIO_5V,
            right: out[1] * AUDIO_5V,
            lfo: lfo * AUDIO_5V,
            gate_light: light(self.gate_high),
        }
    }

    fn reset(&mut self) {
        for voice in &mut self.voices {
            voice.env.reset();
            voice.phase.reset();
            voice.freq = 0.0;
        }
        for filter in &mut self.filters {
            filter.reset();
        }
        if let Some(fx) = &mut self.effects {
            for line in &mut fx.delay {
                line.clear();
            }
            for reverb in &mut fx.reverb {
                reverb.clear();
            }
        }
        self.lfo.reset();
        self.gate.reset();
        self.gate_high = false;
        self.shape = None;
        self.active = 3;
        self.motion_phase = 0.0;
    }
}
