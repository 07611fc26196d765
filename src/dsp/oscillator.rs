use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Waveforms and Phase
===================

Every periodic source in the crate is a pure function of a normalized phase
in [0, 1) plus a phase accumulator that advances that phase by freq * dt per
sample.

  phase ──→ shape(phase) ──→ sample in [-1, 1]

The four shapes are naive (band-unlimited): they alias at high pitch. The
wavetable engine is the anti-aliased path; these are for LFO-rate and
mid-range voices where the character is wanted.

    Sine       sin(2π p)
    Triangle   4p - 1        for p < 0.5     (rises -1 → 1)
               3 - 4p        otherwise        (falls  1 → -1)
    Saw        2p - 1
    Square     +1 for p < 0.5, -1 otherwise


Harmonic Stacking
-----------------

The stack adds the 2nd..(N+1)th harmonic of the SAME shape, each read at
frac(p * (h + 1)) and weighted 1/(h + 1):

    stack = Σ shape(frac(p·(h+1))) / (h+1)   /   Σ 1/(h+1)

Dividing by the total weight keeps the stack inside [-1, 1]. The result is
crossfaded against the plain fundamental by `strength`:

    out = fundamental · (1 - strength) + stack · strength


Wrapping
--------

The accumulator wraps by a single conditional add or subtract instead of a
modulo. FM can push the increment negative, and the conditional form handles
both directions with no division. A fallback floor only runs when an
increment exceeds a whole cycle.
*/

/// Closed set of naive waveform shapes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Triangle,
    Saw,
    Square,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Triangle,
        Waveform::Saw,
        Waveform::Square,
    ];

    /// Map a switch position to a shape, clamping out-of-range codes.
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.clamp(0, 3) as usize]
    }

    /// Evaluate the shape at `phase` in [0, 1).
    #[inline]
    pub fn render(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
            Waveform::Saw => 2.0 * phase - 1.0,
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }

    /// Fundamental blended with `count` extra harmonics of the same shape.
    pub fn render_stacked(self, phase: f32, count: u32, strength: f32) -> f32 {
        let fundamental = self.render(phase);
        let strength = strength.clamp(0.0, 1.0);
        if count == 0 || strength <= 0.0 {
            return fundamental;
        }

        let mut sum = 0.0;
        let mut total_weight = 0.0;
        for h in 1..=count {
            let multiple = (h + 1) as f32;
            let harmonic_phase = (phase * multiple).fract();
            let weight = 1.0 / multiple;
            sum += self.render(harmonic_phase) * weight;
            total_weight += weight;
        }

        let stack = sum / total_weight;
        fundamental * (1.0 - strength) + stack * strength
    }
}

/// Wrap a phase into [0, 1) by conditional add/subtract.
#[inline]
pub fn wrap_unit(phase: f32) -> f32 {
    let mut p = phase;
    if p >= 1.0 {
        p -= 1.0;
    } else if p < 0.0 {
        p += 1.0;
    }

    if !(0.0..1.0).contains(&p) {
        if !p.is_finite() {
            return 0.0;
        }
        // Increment larger than one cycle, or rounding landed exactly on 1.0
        p -= p.floor();
        if p >= 1.0 {
            p = 0.0;
        }
    }
    p
}

/// Phase accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Phase {
    value: f32,
}

impl Phase {
    pub fn new() -> Self {
        Self { value: 0.0 }
    }

    pub fn at(value: f32) -> Self {
        Self {
            value: wrap_unit(value),
        }
    }

    /// Advance by `freq * dt` and return the wrapped phase.
    #[inline]
    pub fn advance(&mut self, freq: f32, dt: f32) -> f32 {
        self.value = wrap_unit(self.value + freq * dt);
        self.value
    }

    /// Force the phase, the only discontinuous path (hard sync).
    #[inline]
    pub fn set(&mut self, value: f32) {
        self.value = wrap_unit(value);
    }

    #[inline]
    pub fn reset(&mut self) {
        self.value = 0.0;
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }
}
