//! Grain source buffers and single-grain playback.

use std::f32::consts::TAU;

use crate::dsp::interp::lerp;
use crate::io::DecodedSample;

/// Fraction of a grain spent fading in.
pub const ATTACK_FRACTION: f32 = 0.1;
/// Fraction of a grain spent fading out.
pub const RELEASE_FRACTION: f32 = 0.4;

/// Length of the synthesized fallback source, seconds.
pub const DEFAULT_SOURCE_SECONDS: f32 = 2.0;

/// Mono audio that grains read from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrainSource {
    samples: Vec<f32>,
    sample_rate: f32,
}

impl GrainSource {
    pub fn new(samples: Vec<f32>, sample_rate: f32) -> Self {
        Self {
            samples,
            sample_rate: sample_rate.max(1.0),
        }
    }

    /// Two seconds of a decaying 110 Hz tone with its 2nd and 3rd harmonics.
    pub fn synthesized(sample_rate: f32) -> Self {
        let len = (DEFAULT_SOURCE_SECONDS * sample_rate) as usize;
        let samples = (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate;
                let decay = 1.0 - t * 0.5;
                let tone = (TAU * 110.0 * t).sin()
                    + 0.3 * (TAU * 220.0 * t).sin()
                    + 0.2 * (TAU * 330.0 * t).sin();
                tone * decay * 0.5
            })
            .collect();
        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds.
    pub fn duration(&self) -> f32 {
        if self.sample_rate <= 0.0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate
    }

    /// Linear read between `index` and `index + 1`; `None` past the end.
    #[inline]
    fn read(&self, pos: f32) -> Option<f32> {
        let i0 = pos as usize;
        let next = self.samples.get(i0 + 1)?;
        Some(lerp(self.samples[i0], *next, pos - i0 as f32))
    }
}

impl From<&DecodedSample> for GrainSource {
    fn from(sample: &DecodedSample) -> Self {
        Self::new(sample.samples.clone(), sample.sample_rate as f32)
    }
}

/// One windowed read through a [`GrainSource`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Grain {
    active: bool,
    /// Read position in source samples
    position: f32,
    duration: f32,
    elapsed: f32,
    rate: f32,
}

impl Grain {
    pub const fn new() -> Self {
        Self {
            active: false,
            position: 0.0,
            duration: 0.0,
            elapsed: 0.0,
            rate: 1.0,
        }
    }

    /// Start reading at `position` source samples for `duration` seconds.
    pub fn activate(&mut self, position: f32, duration: f32, rate: f32) {
        self.active = true;
        self.position = position.max(0.0);
        self.duration = duration.max(crate::MIN_TIME);
        self.elapsed = 0.0;
        self.rate = rate;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    /// Trapezoid window: 10% linear rise, plateau, 40% linear fall.
    pub fn window(&self) -> f32 {
        let attack = self.duration * ATTACK_FRACTION;
        let release = self.duration * RELEASE_FRACTION;
        let release_start = self.duration - release;
        if self.elapsed < attack {
            self.elapsed / attack
        } else if self.elapsed < release_start {
            1.0
        } else {
            1.0 - (self.elapsed - release_start) / release
        }
    }

    /// Advance by `dt` and return the windowed sample.
    ///
    /// The grain frees itself once it outlives its duration or reads past
    /// the end of the source.
    #[inline]
    pub fn process(&mut self, source: &GrainSource, dt: f32) -> f32 {
        if !self.active {
            return 0.0;
        }

        self.elapsed += dt;
        let env = self.window();
        self.position += dt * self.rate * source.sample_rate();

        if self.elapsed >= self.duration || self.position >= source.len() as f32 {
            self.active = false;
            return 0.0;
        }

        match source.read(self.position) {
            Some(sample) => sample * env,
            None => {
                self.active = false;
                0.0
            }
        }
    }
}
