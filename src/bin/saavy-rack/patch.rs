//! Patch wiring: one sound source, clocked, into the looper and effects.

use std::path::Path;

use clap::ValueEnum;
use color_eyre::eyre::{Result as EyreResult, WrapErr};

use saavy_rack::{
    effects::{StereoFx, StereoFxInputs, StereoFxParams},
    granular::{ParticleInputs, ParticleParams, ParticleSynth, SampleLoader},
    io::DecodedSample,
    looper::{BuildupLooper, LooperInputs, LooperParams},
    module::{GATE_HIGH, AUDIO_10V},
    sequencing::{ClockGenerator, ClockOutputs, ClockParams},
    synth::{
        ambient::{AmbientInputs, AmbientParams},
        binaural::{BinauralInputs, BinauralParams},
        chord_synth::{ChordSynthInputs, ChordSynthParams},
        pad::{PadInputs, PadParams},
        pluck::{PluckInputs, PluckParams},
        AmbientSynth, BinauralOscillator, ChordPad, ChordPluck, ChordSlot, ChordSynth, ChordType,
    },
    wavetable::{BankLoader, WavetableInputs, WavetableOscillator, WavetableParams},
    Module, ProcessCtx,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PatchKind {
    Pad,
    Pluck,
    Chord,
    Ambient,
    Particle,
    Wavetable,
    Binaural,
}

/// Roots of the demo progression, 1V/oct: C, F, A minor, G.
const PROGRESSION: [f32; 4] = [0.0, 5.0 / 12.0, -3.0 / 12.0, -5.0 / 12.0];

/// The demo slots for the chord pad and pluck: C, F, Am, G.
fn demo_slots() -> [ChordSlot; 4] {
    [
        ChordSlot::new(0, ChordType::Major),
        ChordSlot::new(5, ChordType::Major),
        ChordSlot::new(9, ChordType::Minor),
        ChordSlot::new(7, ChordType::Major),
    ]
}

/// A sound source driven by the shared clock. Returns a stereo pair in volts.
trait Source: Send {
    fn tick(&mut self, ctx: &ProcessCtx, clock: &ClockOutputs, bar: usize) -> (f32, f32);
}

struct Pad(ChordPad, PadParams);

impl Source for Pad {
    fn tick(&mut self, ctx: &ProcessCtx, clock: &ClockOutputs, _bar: usize) -> (f32, f32) {
        let inputs = PadInputs {
            clock: Some(clock.trigger),
            ..Default::default()
        };
        let out = self.0.process(ctx, &self.1, &inputs);
        (out.audio, out.audio)
    }
}

struct Pluck(ChordPluck, PluckParams);

impl Source for Pluck {
    fn tick(&mut self, ctx: &ProcessCtx, clock: &ClockOutputs, _bar: usize) -> (f32, f32) {
        let inputs = PluckInputs {
            clock: Some(clock.trigger),
            ..Default::default()
        };
        let out = self.0.process(ctx, &self.1, &inputs);
        (out.audio, out.audio)
    }
}

struct Chord {
    synth: ChordSynth,
    params: ChordSynthParams,
    beat_seconds: f64,
}

impl Source for Chord {
    fn tick(&mut self, ctx: &ProcessCtx, _clock: &ClockOutputs, bar: usize) -> (f32, f32) {
        // Held for three beats of every four
        let beat = ctx.time() / self.beat_seconds;
        let gate = if beat % 4.0 < 3.0 { GATE_HIGH } else { 0.0 };
        let inputs = ChordSynthInputs {
            pitch: Some(PROGRESSION[bar % PROGRESSION.len()]),
            gate,
            ..Default::default()
        };
        let out = self.synth.process(ctx, &self.params, &inputs);
        (out.left, out.right)
    }
}

struct Ambient(AmbientSynth, AmbientParams);

impl Source for Ambient {
    fn tick(&mut self, ctx: &ProcessCtx, clock: &ClockOutputs, _bar: usize) -> (f32, f32) {
        let inputs = AmbientInputs {
            clock: Some(clock.trigger),
            reset: None,
        };
        let out = self.0.process(ctx, &self.1, &inputs);
        (out.left, out.right)
    }
}

struct Particle(ParticleSynth, ParticleParams);

impl Source for Particle {
    fn tick(&mut self, ctx: &ProcessCtx, clock: &ClockOutputs, _bar: usize) -> (f32, f32) {
        let inputs = ParticleInputs {
            clock: Some(clock.trigger),
            vitality: None,
        };
        let out = self.0.process(ctx, &self.1, &inputs);
        (out.left, out.right)
    }
}

struct Wavetable(WavetableOscillator, WavetableParams);

impl Source for Wavetable {
    fn tick(&mut self, ctx: &ProcessCtx, _clock: &ClockOutputs, bar: usize) -> (f32, f32) {
        // Slow sweep across the table frames
        let sweep = (ctx.time() * 0.1 * std::f64::consts::TAU).sin() as f32;
        let inputs = WavetableInputs {
            pitch: Some(PROGRESSION[bar % PROGRESSION.len()] - 1.0),
            wt_x: Some(sweep * 10.0),
            ..Default::default()
        };
        let out = self.0.process(ctx, &self.1, &inputs);
        (out.left, out.right)
    }
}

struct Binaural(BinauralOscillator, BinauralParams);

impl Source for Binaural {
    fn tick(&mut self, ctx: &ProcessCtx, _clock: &ClockOutputs, _bar: usize) -> (f32, f32) {
        let out = self.0.process(ctx, &self.1, &BinauralInputs::default());
        (out.left, out.right)
    }
}

/// Loader handles kept off the audio thread.
#[derive(Default)]
pub struct Loaders {
    particle: Option<SampleLoader>,
    wavetable: Option<BankLoader>,
}

impl Loaders {
    /// Free anything the audio side has retired.
    pub fn collect(&mut self) -> usize {
        let mut freed = 0;
        if let Some(loader) = self.particle.as_mut() {
            freed += loader.collect();
        }
        if let Some(loader) = self.wavetable.as_mut() {
            freed += loader.collect();
        }
        freed
    }
}

pub struct Settings<'a> {
    pub kind: PatchKind,
    pub sample_rate: f32,
    pub bpm: f32,
    pub sample: Option<&'a Path>,
    pub seed: Option<u64>,
    /// Engage the looper after this many seconds
    pub build_at: Option<f32>,
    /// Release the looper after this many seconds
    pub release_at: Option<f32>,
    pub fx: bool,
}

/// Clock → source → looper → effects, one frame at a time.
pub struct Rack {
    ctx: ProcessCtx,
    clock: ClockGenerator,
    bpm: f32,
    source: Box<dyn Source>,
    looper: BuildupLooper,
    looper_params: LooperParams,
    build_at: Option<f64>,
    release_at: Option<f64>,
    fx: Option<(StereoFx, StereoFxParams)>,
}

impl Rack {
    pub fn new(settings: &Settings) -> EyreResult<(Self, Loaders)> {
        let sample = settings
            .sample
            .map(|path| {
                saavy_rack::io::decode(path)
                    .wrap_err_with(|| format!("failed to decode {}", path.display()))
            })
            .transpose()?;

        let (source, loaders) = build_source(settings, sample.as_ref())?;

        let fx = settings.fx.then(|| {
            (
                StereoFx::new(),
                StereoFxParams {
                    delay: true,
                    delay_time: 60.0 / settings.bpm * 0.75,
                    reverb: true,
                    ..Default::default()
                },
            )
        });

        let looper_params = LooperParams {
            intensity: 4.0,
            bars: 0,
            ..Default::default()
        };
        let mut looper = BuildupLooper::new();
        looper.settle(&looper_params);

        let rack = Self {
            ctx: ProcessCtx::new(settings.sample_rate),
            clock: ClockGenerator::new(),
            bpm: settings.bpm,
            source,
            looper,
            looper_params,
            build_at: settings.build_at.map(f64::from),
            release_at: settings.release_at.map(f64::from),
            fx,
        };
        Ok((rack, loaders))
    }

    /// Render one stereo frame, normalized to ±1.
    pub fn next_frame(&mut self) -> (f32, f32) {
        let ctx = self.ctx;
        let clock_params = ClockParams {
            bpm: self.bpm,
            ..Default::default()
        };
        let clock = self.clock.process(&ctx, &clock_params, &Default::default());
        let bar = (ctx.time() * f64::from(self.bpm) / 60.0 / 4.0) as usize;

        let (left, right) = self.source.tick(&ctx, &clock, bar);

        let t = ctx.time();
        let building = self.build_at.is_some_and(|at| t >= at)
            && !self.release_at.is_some_and(|at| t >= at);
        self.looper_params.build = building;
        let looped = self.looper.process(
            &ctx,
            &self.looper_params,
            &LooperInputs {
                clock: Some(clock.trigger),
                left: Some(left),
                right: Some(right),
                ..Default::default()
            },
        );

        let (mut left, mut right) = (looped.left, looped.right);
        if let Some((fx, params)) = self.fx.as_mut() {
            let out = fx.process(
                &ctx,
                params,
                &StereoFxInputs {
                    left: Some(left),
                    right: Some(right),
                },
            );
            left = out.left;
            right = out.right;
        }

        self.ctx.advance();
        (
            (left / AUDIO_10V).clamp(-1.0, 1.0),
            (right / AUDIO_10V).clamp(-1.0, 1.0),
        )
    }
}

fn build_source(settings: &Settings, sample: Option<&DecodedSample>) -> EyreResult<(Box<dyn Source>, Loaders)> {
    let mut loaders = Loaders::default();
    let seed = settings.seed;

    let source: Box<dyn Source> = match settings.kind {
        PatchKind::Pad => Box::new(Pad(
            ChordPad::new(),
            PadParams {
                slots: demo_slots(),
                ..Default::default()
            },
        )),
        PatchKind::Pluck => {
            let pluck = seed.map_or_else(ChordPluck::new, ChordPluck::with_seed);
            Box::new(Pluck(
                pluck,
                PluckParams {
                    slots: demo_slots(),
                    step_rate: 4,
                    ..Default::default()
                },
            ))
        }
        PatchKind::Chord => Box::new(Chord {
            synth: seed.map_or_else(ChordSynth::new, ChordSynth::with_seed),
            params: ChordSynthParams {
                voices: 4,
                chord: ChordType::Seventh,
                ..Default::default()
            },
            beat_seconds: 60.0 / f64::from(settings.bpm),
        }),
        PatchKind::Ambient => Box::new(Ambient(
            seed.map_or_else(AmbientSynth::new, AmbientSynth::with_seed),
            AmbientParams {
                tempo: settings.bpm,
                ..Default::default()
            },
        )),
        PatchKind::Particle => {
            let (synth, mut loader) = seed.map_or_else(ParticleSynth::new, ParticleSynth::with_seed);
            if let Some(sample) = sample {
                loader.load(sample).wrap_err("failed to load grain source")?;
            }
            loaders.particle = Some(loader);
            Box::new(Particle(
                synth,
                ParticleParams {
                    bpm: settings.bpm,
                    ..Default::default()
                },
            ))
        }
        PatchKind::Wavetable => {
            let (osc, mut loader) = WavetableOscillator::new();
            if let Some(sample) = sample {
                loader.load(0, sample).wrap_err("failed to load wavetable bank")?;
            }
            loaders.wavetable = Some(loader);
            Box::new(Wavetable(
                osc,
                WavetableParams {
                    unison: 3,
                    ..Default::default()
                },
            ))
        }
        PatchKind::Binaural => Box::new(Binaural(BinauralOscillator::new(), BinauralParams::default())),
    };

    Ok((source, loaders))
}
