//! Beat-synced granular voice over a loadable sample.
//!
//! Until a sample is loaded the grains read a synthesized two-second tone,
//! built on the first `process` call at the host rate. Loading goes through
//! [`SampleLoader`] on another thread; the decoded buffer is published whole
//! and swapped in between samples.

use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use log::{info, warn};

use super::grain::GrainSource;
use super::scheduler::{GrainScheduler, GrainSettings};
use crate::dsp::filter::Biquad;
use crate::error::{LoadError, LoadResult};
use crate::handoff::{self, Publisher, Receiver};
use crate::io::{self, DecodedSample};
use crate::module::{light, Module, ProcessCtx, AUDIO_10V, AUDIO_5V};

/// Sample buffers that may be queued before the audio side drains them.
const IN_FLIGHT: usize = 2;
const SOURCE_SLOT: usize = 0;
const GRAIN_GAIN: f32 = 2.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleParams {
    /// Start-position jitter and filter drive, 0..1
    pub vitality: f32,
    /// Grain playback rate, 0.5..2
    pub pitch: f32,
    /// Seconds, 0.02..0.5
    pub grain_size: f32,
    pub density: f32,
    /// 0..1, mapped exponentially to 40 Hz..16 kHz
    pub cutoff: f32,
    pub resonance: f32,
    /// 40..200
    pub bpm: f32,
    pub volume: f32,
}

impl Default for ParticleParams {
    fn default() -> Self {
        Self {
            vitality: 0.3,
            pitch: 1.0,
            grain_size: 0.12,
            density: 0.4,
            cutoff: 0.4,
            resonance: 0.15,
            bpm: 88.0,
            volume: 0.5,
        }
    }
}

impl ParticleParams {
    /// Lowpass cutoff in Hz: `40 · 400^cutoff`.
    pub fn cutoff_hz(&self) -> f32 {
        40.0 * 400.0_f32.powf(self.cutoff.clamp(0.0, 1.0))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParticleInputs {
    pub clock: Option<f32>,
    /// Added to the vitality knob as volts / 10
    pub vitality: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParticleOutputs {
    pub left: f32,
    pub right: f32,
    pub sample_light: f32,
}

pub struct ParticleSynth {
    sources: [Box<GrainSource>; 1],
    receiver: Receiver<GrainSource>,
    scheduler: GrainScheduler,
    filter: Biquad,
    loaded: bool,
}

/// Loader-side handle that decodes and publishes grain sources.
pub struct SampleLoader {
    publisher: Publisher<GrainSource>,
}

impl ParticleSynth {
    pub fn new() -> (Self, SampleLoader) {
        Self::with_scheduler(GrainScheduler::new())
    }

    pub fn with_seed(seed: u64) -> (Self, SampleLoader) {
        Self::with_scheduler(GrainScheduler::with_seed(seed))
    }

    fn with_scheduler(scheduler: GrainScheduler) -> (Self, SampleLoader) {
        let (publisher, receiver) = handoff::channel(IN_FLIGHT);
        let synth = Self {
            sources: [Box::default()],
            receiver,
            scheduler,
            filter: Biquad::lowpass(0.1, 0.707),
            loaded: false,
        };
        (synth, SampleLoader { publisher })
    }

    /// True once an external sample has been installed.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn source(&self) -> &GrainSource {
        &self.sources[SOURCE_SLOT]
    }

    pub fn active_grains(&self) -> usize {
        self.scheduler.active_grains()
    }
}

impl Module for ParticleSynth {
    type Params = ParticleParams;
    type Inputs = ParticleInputs;
    type Outputs = ParticleOutputs;

    fn process(&mut self, ctx: &ProcessCtx, params: &ParticleParams, inputs: &ParticleInputs) -> ParticleOutputs {
        if self.receiver.poll(&mut self.sources).is_some() {
            self.scheduler.reset();
            self.loaded = true;
        }
        if !self.receiver.is_ready() {
            return ParticleOutputs::default();
        }
        if self.sources[SOURCE_SLOT].is_empty() {
            log::debug!("particle synth: synthesizing default source at {} Hz", ctx.sample_rate);
            *self.sources[SOURCE_SLOT] = GrainSource::synthesized(ctx.sample_rate);
        }

        let mut vitality = params.vitality.clamp(0.0, 1.0);
        if let Some(cv) = inputs.vitality {
            vitality = (vitality + cv / AUDIO_10V).clamp(0.0, 1.0);
        }

        let settings = GrainSettings {
            bpm: params.bpm.clamp(40.0, 200.0),
            density: params.density.clamp(0.0, 1.0),
            size: params.grain_size.clamp(0.02, 0.5),
            rate: params.pitch.clamp(0.5, 2.0),
            vitality,
        };
        let grains = self.scheduler.process(
            &self.sources[SOURCE_SLOT],
            &settings,
            inputs.clock,
            ctx.sample_time,
        );

        let q = (params.resonance.clamp(0.0, 1.0) * 20.0 + vitality * 5.0).clamp(0.1, 20.0);
        let cutoff = (params.cutoff_hz() / ctx.sample_rate).clamp(0.0, 0.45);
        self.filter.set_lowpass(cutoff, q);
        let out = self.filter.process(grains * GRAIN_GAIN) * params.volume.clamp(0.0, 1.0) * AUDIO_5V;

        ParticleOutputs {
            left: out,
            right: out,
            sample_light: light(self.loaded),
        }
    }

    fn reset(&mut self) {
        self.scheduler.reset();
        self.filter.reset();
    }
}

impl SampleLoader {
    /// Publish a decoded sample as the new grain source.
    pub fn load(&mut self, sample: &DecodedSample) -> LoadResult {
        if sample.is_empty() {
            warn!("particle synth: empty sample; keeping previous source");
            return Err(LoadError::Empty);
        }
        self.publisher.begin();
        self.publisher
            .publish(SOURCE_SLOT, Box::new(GrainSource::from(sample)))?;
        info!(
            "particle synth: loaded {:.2} s at {} Hz",
            sample.duration(),
            sample.sample_rate
        );
        Ok(())
    }

    /// Decode a WAV file and publish it.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> LoadResult {
        let sample = io::decode(path)?;
        self.load(&sample)
    }

    /// Free sources the audio side has retired.
    pub fn collect(&mut self) -> usize {
        self.publisher.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_source_is_built_lazily() {
        let ctx = ProcessCtx::new(1_000.0);
        let (mut synth, _loader) = ParticleSynth::with_seed(1);
        assert!(synth.source().is_empty());
        let out = synth.process(&ctx, &ParticleParams::default(), &ParticleInputs::default());
        assert_eq!(synth.source().len(), 2_000);
        assert_eq!(out.sample_light, 0.0);
    }

    #[test]
    fn zero_density_stays_silent() {
        let ctx = ProcessCtx::new(48_000.0);
        let (mut synth, _loader) = ParticleSynth::with_seed(1);
        let params = ParticleParams {
            density: 0.0,
            ..Default::default()
        };
        for _ in 0..96_000 {
            let out = synth.process(&ctx, &params, &ParticleInputs::default());
            assert_eq!(out.left, 0.0);
            assert_eq!(out.right, 0.0);
        }
        assert_eq!(synth.active_grains(), 0);
    }

    #[test]
    fn grains_make_sound() {
        let ctx = ProcessCtx::new(48_000.0);
        let (mut synth, _loader) = ParticleSynth::with_seed(2);
        let params = ParticleParams {
            density: 1.0,
            cutoff: 1.0,
            ..Default::default()
        };
        let mut peak = 0.0_f32;
        for _ in 0..48_000 {
            let out = synth.process(&ctx, &params, &ParticleInputs::default());
            assert!(out.left.is_finite());
            assert_eq!(out.left, out.right);
            peak = peak.max(out.left.abs());
        }
        assert!(peak > 0.1);
    }

    #[test]
    fn loaded_sample_replaces_source() {
        let ctx = ProcessCtx::new(1_000.0);
        let (mut synth, mut loader) = ParticleSynth::with_seed(1);
        synth.process(&ctx, &ParticleParams::default(), &ParticleInputs::default());

        let sample = DecodedSample::new(vec![0.25; 500], 500);
        loader.load(&sample).unwrap();
        let out = synth.process(&ctx, &ParticleParams::default(), &ParticleInputs::default());
        assert!(synth.is_loaded());
        assert_eq!(out.sample_light, 1.0);
        assert_eq!(synth.source().len(), 500);
        assert_eq!(synth.source().sample_rate(), 500.0);
        assert_eq!(loader.collect(), 1);
    }

    #[test]
    fn empty_sample_is_rejected() {
        let (mut synth, mut loader) = ParticleSynth::with_seed(1);
        let ctx = ProcessCtx::new(1_000.0);
        assert!(matches!(
            loader.load(&DecodedSample::new(Vec::new(), 44_100)),
            Err(LoadError::Empty)
        ));
        synth.process(&ctx, &ParticleParams::default(), &ParticleInputs::default());
        assert!(!synth.is_loaded());
    }

    #[test]
    fn cutoff_mapping() {
        let at = |c: f32| ParticleParams {
            cutoff: c,
            ..Default::default()
        }
        .cutoff_hz();
        assert!((at(0.0) - 40.0).abs() < 1e-3);
        assert!((at(1.0) - 16_000.0).abs() < 1.0);
        assert!((at(0.5) - 800.0).abs() < 0.1);
    }
}
