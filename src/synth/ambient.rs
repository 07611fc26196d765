//! Generative ambient pad.
//!
//! On every tick a note may be spawned with probability `density`. Notes are
//! drawn at random from a scale and sound as three slightly detuned sines
//! with a slow linear rise and a long exponential tail. The mix goes through
//! a lowpass and a cross-feedback stereo delay.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::dsp::delay::DelayLine;
use crate::dsp::filter::Biquad;
use crate::dsp::mix::blend_dry_wet;
use crate::dsp::oscillator::{Phase, Waveform};
use crate::dsp::trigger::{PulseGenerator, SchmittTrigger};
use crate::module::{light, midi_to_freq, midi_to_voct, Module, ProcessCtx, GATE_HIGH};
use crate::synth::chord::Scale;

pub const AMBIENT_VOICES: usize = 16;

/// Frequency ratios of the three oscillators in a voice (about ±5 cents).
const DETUNE_RATIOS: [f32; 3] = [1.0, 1.002_89, 0.997_12];
const PEAK_LEVEL: f32 = 0.2;
/// Tail rate: `exp(-5.3)` is roughly -46 dB after one release time.
const TAIL_RATE: f32 = 5.3;
const SILENT_LEVEL: f32 = 0.001;

const DELAY_SECONDS: f32 = 4.0;
const GATE_SECONDS: f32 = 0.15;
const OUTPUT_GAIN: f32 = 6.5;

#[derive(Debug, Clone, Copy, Default)]
struct AmbientVoice {
    active: bool,
    freq: f32,
    phases: [Phase; 3],
    age: f32,
    attack: f32,
    release: f32,
}

impl AmbientVoice {
    /// Start a note. Phases carry over from the previous note.
    fn trigger(&mut self, freq: f32, attack: f32, release: f32) {
        self.active = true;
        self.freq = freq;
        self.attack = attack;
        self.release = release;
        self.age = 0.0;
    }

    fn envelope(&self) -> f32 {
        if self.age < self.attack {
            self.age / self.attack * PEAK_LEVEL
        } else {
            let t = self.age - self.attack;
            PEAK_LEVEL * (-TAIL_RATE * t / self.release).exp()
        }
    }

    #[inline]
    fn tick(&mut self, dt: f32) -> f32 {
        if !self.active {
            return 0.0;
        }
        let env = self.envelope();
        if self.age >= self.attack && env < SILENT_LEVEL {
            self.active = false;
            return 0.0;
        }
        self.age += dt;

        let mut sum = 0.0;
        for (phase, ratio) in self.phases.iter_mut().zip(DETUNE_RATIOS) {
            sum += Waveform::Sine.render(phase.advance(self.freq * ratio, dt));
        }
        sum / 3.0 * env
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientParams {
    /// 20..180 BPM; ticks land on eighth notes
    pub tempo: f32,
    pub density: f32,
    /// Lengthens both envelope stages
    pub motion: f32,
    /// Lowpass cutoff, 200..4000 Hz
    pub tone: f32,
    /// Shorter, denser echoes as it rises
    pub space: f32,
    pub mix: f32,
    /// Pitch class 0..11
    pub root: i32,
    pub scale: Scale,
    /// Momentary buttons
    pub freeze: bool,
    pub reset: bool,
}

impl Default for AmbientParams {
    fn default() -> Self {
        Self {
            tempo: 60.0,
            density: 0.4,
            motion: 0.5,
            tone: 800.0,
            space: 0.6,
            mix: 0.5,
            root: 0,
            scale: Scale::Pentatonic,
            freeze: false,
            reset: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AmbientInputs {
    pub clock: Option<f32>,
    pub reset: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AmbientOutputs {
    pub left: f32,
    pub right: f32,
    pub voct: f32,
    pub gate: f32,
    pub freeze_light: f32,
}

#[derive(Debug, Clone)]
struct CrossDelay {
    left: DelayLine,
    right: DelayLine,
}

#[derive(Debug, Clone)]
pub struct AmbientSynth {
    voices: [AmbientVoice; AMBIENT_VOICES],
    filter: Biquad,
    delay: Option<CrossDelay>,
    tick_timer: f32,
    clock: SchmittTrigger,
    reset_input: SchmittTrigger,
    reset_button: SchmittTrigger,
    freeze_button: SchmittTrigger,
    frozen: bool,
    voct: f32,
    gate: PulseGenerator,
    rng: SmallRng,
}

impl Default for AmbientSynth {
    fn default() -> Self {
        Self::new()
    }
}

impl AmbientSynth {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            voices: [AmbientVoice::default(); AMBIENT_VOICES],
            filter: Biquad::lowpass(800.0 / 48_000.0, std::f32::consts::FRAC_1_SQRT_2),
            delay: None,
            tick_timer: 0.0,
            clock: SchmittTrigger::default(),
            reset_input: SchmittTrigger::default(),
            reset_button: SchmittTrigger::default(),
            freeze_button: SchmittTrigger::default(),
            frozen: false,
            voct: 0.0,
            gate: PulseGenerator::new(),
            rng,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }

    /// Draw a note and start it on the first free voice.
    ///
    /// With every voice busy the note is dropped and the CV outputs keep
    /// their previous values.
    fn spawn(&mut self, params: &AmbientParams) {
        let degrees = params.scale.degrees();
        let octave = self.rng.random_range(2..=4);
        let degree = degrees[self.rng.random_range(0..degrees.len())];
        let note = params.root.clamp(0, 11) + degree + octave * 12;

        let motion = params.motion.clamp(0.0, 1.0);
        let attack = 0.5 + motion * 2.0;
        let release = 3.0 + motion * 4.0;

        if let Some(voice) = self.voices.iter_mut().find(|v| !v.active) {
            voice.trigger(midi_to_freq(note as f32), attack, release);
            self.voct = midi_to_voct(note as f32);
            self.gate.trigger(GATE_SECONDS);
        }
    }

    fn silence(&mut self) {
        for voice in &mut self.voices {
            voice.active = false;
        }
        self.frozen = false;
        self.tick_timer = 0.0;
    }
}

impl Module for AmbientSynth {
    type Params = AmbientParams;
    type Inputs = AmbientInputs;
    type Outputs = AmbientOutputs;

    fn process(&mut self, ctx: &ProcessCtx, params: &AmbientParams, inputs: &AmbientInputs) -> AmbientOutputs {
        let dt = ctx.sample_time;

        let reset_in = inputs.reset.is_some_and(|v| self.reset_input.process(v));
        let reset_btn = self.reset_button.process(light(params.reset));
        if reset_in || reset_btn {
            self.silence();
        }

        if self.freeze_button.process(light(params.freeze)) {
            self.frozen = !self.frozen;
        }

        let tick = match inputs.clock {
            Some(v) => self.clock.process(v),
            None => {
                let interval = 60.0 / params.tempo.clamp(20.0, 180.0) * 0.5;
                self.tick_timer += dt;
                if self.tick_timer >= interval {
                    self.tick_timer = 0.0;
                    true
                } else {
                    false
                }
            }
        };

        if tick && !self.frozen && self.rng.random::<f32>() < params.density.clamp(0.0, 1.0) {
            self.spawn(params);
        }

        let mut dry = 0.0;
        for voice in &mut self.voices {
            dry += voice.tick(dt);
        }

        let cutoff = (params.tone.clamp(200.0, 4000.0) / ctx.sample_rate).clamp(0.0, 0.45);
        self.filter.set_lowpass(cutoff, std::f32::consts::FRAC_1_SQRT_2);
        let filtered = self.filter.process(dry);

        let delay = self.delay.get_or_insert_with(|| {
            log::debug!("ambient synth: allocating {DELAY_SECONDS} s delay at {} Hz", ctx.sample_rate);
            CrossDelay {
                left: DelayLine::with_duration(DELAY_SECONDS, ctx.sample_rate),
                right: DelayLine::with_duration(DELAY_SECONDS, ctx.sample_rate),
            }
        });

        let space = params.space.clamp(0.0, 1.0);
        let time = 0.2 + (1.0 - space) * 0.8;
        let feedback = (0.3 + space * 0.55).min(0.85);
        let offset = ((time * ctx.sample_rate) as usize).max(1);

        let wet_l = delay.left.read(offset);
        let wet_r = delay.right.read(offset);
        delay.left.push(filtered + wet_r * feedback);
        delay.right.push(filtered + wet_l * feedback);

        let mix = params.mix.clamp(0.0, 1.0);
        AmbientOutputs {
            left: blend_dry_wet(filtered, wet_l, mix) * OUTPUT_GAIN,
            right: blend_dry_wet(filtered, wet_r, mix) * OUTPUT_GAIN,
            voct: self.voct,
            gate: if self.gate.process(dt) { GATE_HIGH } else { 0.0 },
            freeze_light: light(self.frozen),
        }
    }

    fn reset(&mut self) {
        self.silence();
        self.filter.reset();
        if let Some(delay) = &mut self.delay {
            delay.left.clear();
            delay.right.clear();
        }
        self.clock.reset();
        self.reset_input.reset();
        self.reset_button.reset();
        self.freeze_button.reset();
        self.voct = 0.0;
        self.gate.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(
        synth: &mut AmbientSynth,
        ctx: &ProcessCtx,
        params: &AmbientParams,
        inputs: &AmbientInputs,
        samples: usize,
    ) -> Vec<AmbientOutputs> {
        (0..samples).map(|_| synth.process(ctx, params, inputs)).collect()
    }

    #[test]
    fn full_density_spawns_every_tick() {
        let ctx = ProcessCtx::new(1_000.0);
        let mut synth = AmbientSynth::with_seed(3);
        let params = AmbientParams {
            density: 1.0,
            tempo: 120.0,
            ..Default::default()
        };
        // 250 ms ticks over ~1 s
        let out = render(&mut synth, &ctx, &params, &AmbientInputs::default(), 1_010);
        assert_eq!(synth.active_voices(), 4);
        let gates = out
            .windows(2)
            .filter(|w| w[0].gate == 0.0 && w[1].gate == GATE_HIGH)
            .count();
        assert!(gates >= 3);
    }

    #[test]
    fn zero_density_is_silent() {
        let ctx = ProcessCtx::new(1_000.0);
        let mut synth = AmbientSynth::with_seed(3);
        let params = AmbientParams {
            density: 0.0,
            ..Default::default()
        };
        let out = render(&mut synth, &ctx, &params, &AmbientInputs::default(), 5_000);
        assert!(out.iter().all(|o| o.left == 0.0 && o.right == 0.0 && o.gate == 0.0));
    }

    #[test]
    fn notes_come_from_the_scale() {
        let ctx = ProcessCtx::new(1_000.0);
        let mut synth = AmbientSynth::with_seed(11);
        let params = AmbientParams {
            density: 1.0,
            root: 2,
            scale: Scale::Major,
            ..Default::default()
        };
        // Ticks land near every 500th sample; sample between them
        render(&mut synth, &ctx, &params, &AmbientInputs::default(), 100);
        for _ in 0..20 {
            render(&mut synth, &ctx, &params, &AmbientInputs::default(), 500);
            let midi = synth.voct * 12.0 + 60.0;
            let note = midi.round() as i32;
            assert!((midi - note as f32).abs() < 1e-3);
            assert!((24..=61).contains(&note), "note {note}");
            assert!(Scale::Major.degrees().contains(&(note - 2).rem_euclid(12)));
        }
    }

    #[test]
    fn voice_envelope_rises_then_dies() {
        let mut voice = AmbientVoice::default();
        voice.trigger(220.0, 0.5, 3.0);
        let dt = 1.0 / 1_000.0;
        let mut peak = 0.0_f32;
        let mut samples = 0;
        while voice.active && samples < 10_000 {
            voice.tick(dt);
            peak = peak.max(voice.envelope());
            samples += 1;
        }
        assert!((peak - PEAK_LEVEL).abs() < 1e-2);
        assert!(!voice.active);
        // 0.5 s rise plus ln(200)/5.3 · 3 ≈ 3 s tail
        assert!((3_400..3_700).contains(&samples), "samples {samples}");
    }

    #[test]
    fn freeze_blocks_spawns_and_reset_clears() {
        let ctx = ProcessCtx::new(1_000.0);
        let mut synth = AmbientSynth::with_seed(5);
        let mut params = AmbientParams {
            density: 1.0,
            freeze: true,
            ..Default::default()
        };
        let inputs = AmbientInputs::default();
        let out = render(&mut synth, &ctx, &params, &inputs, 1);
        assert_eq!(out[0].freeze_light, 1.0);
        params.freeze = false;
        render(&mut synth, &ctx, &params, &inputs, 3_000);
        assert_eq!(synth.active_voices(), 0);

        params.freeze = true;
        render(&mut synth, &ctx, &params, &inputs, 1);
        assert!(!synth.is_frozen());
        render(&mut synth, &ctx, &params, &inputs, 1_100);
        assert!(synth.active_voices() > 0);

        let reset = AmbientInputs {
            reset: Some(10.0),
            ..Default::default()
        };
        render(&mut synth, &ctx, &params, &reset, 1);
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn clock_edges_replace_the_timer() {
        let ctx = ProcessCtx::new(1_000.0);
        let mut synth = AmbientSynth::with_seed(9);
        let params = AmbientParams {
            density: 1.0,
            ..Default::default()
        };
        let low = AmbientInputs {
            clock: Some(0.0),
            ..Default::default()
        };
        render(&mut synth, &ctx, &params, &low, 3_000);
        assert_eq!(synth.active_voices(), 0);

        let high = AmbientInputs {
            clock: Some(5.0),
            ..Default::default()
        };
        for _ in 0..3 {
            render(&mut synth, &ctx, &params, &high, 10);
            render(&mut synth, &ctx, &params, &low, 10);
        }
        assert_eq!(synth.active_voices(), 3);
    }
}
