//! Low Frequency Oscillator (LFO).

/*
Low Frequency Oscillators
=========================

An LFO is an oscillator running at control rate (~0.1 to ~20 Hz). The shape
math is the same as the audio-rate waveforms; what differs is the job. The
output moves a parameter instead of a speaker.

Output is bipolar, -1.0 to +1.0, so a modulation route can push a value
above AND below its knob position:

    pitch    ± cents
    cutoff   × (1 + lfo · amount)
    amp      × (1 + lfo · amount · 0.5)


Shapes
------

SINE        smooth, the default
TRIANGLE    constant rate of change
SQUARE      hard switch between -1 and +1
RANDOM      sample & hold: a new uniform value in [-1, 1) is drawn each
            time the phase wraps, then held for the whole cycle


Tempo Sync
----------

When synced, the rate knob reads as cycles per beat instead of Hz:

    freq = rate · tempo / 60

With the default 120 BPM a rate of 1 runs at 2 Hz.
*/

use std::f32::consts::TAU;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tempo assumed by tempo-synced LFOs, in BPM.
pub const DEFAULT_TEMPO: f32 = 120.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfoShape {
    #[default]
    Sine,
    Triangle,
    Square,
    /// Sample & hold, redrawn on every phase wrap
    Random,
}

impl LfoShape {
    pub fn from_index(index: i32) -> Self {
        match index.clamp(0, 3) {
            0 => LfoShape::Sine,
            1 => LfoShape::Triangle,
            2 => LfoShape::Square,
            _ => LfoShape::Random,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f32,
    held: f32,
    rng: SmallRng,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new()
    }
}

impl Lfo {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            phase: 0.0,
            held: 0.0,
            rng,
        }
    }

    /// Advance one sample and return the bipolar output.
    ///
    /// `rate` is Hz, or cycles per beat when `tempo` is `Some`.
    #[inline]
    pub fn process(&mut self, rate: f32, shape: LfoShape, tempo: Option<f32>, dt: f32) -> f32 {
        let freq = match tempo {
            Some(bpm) => rate * bpm / 60.0,
            None => rate,
        };

        self.phase += freq * dt;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
            if shape == LfoShape::Random {
                self.held = self.rng.random::<f32>() * 2.0 - 1.0;
            }
        }
        if self.phase < 0.0 {
            self.phase += 1.0;
        }

        let p = self.phase;
        match shape {
            LfoShape::Sine => (TAU * p).sin(),
            LfoShape::Triangle => {
                if p < 0.5 {
                    4.0 * p - 1.0
                } else {
                    3.0 - 4.0 * p
                }
            }
            LfoShape::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoShape::Random => self.held,
        }
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.held = 0.0;
    }
}
