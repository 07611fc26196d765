//! Reverb - a bank of parallel feedback combs.
//!
//! ```text
//! Input ──┬──→ [Comb 1.0×] ──┐
//!         ├──→ [Comb 1.3×] ──┤
//!         ├──→   ...         ├──→ average ──→ Output
//!         └──→ [Comb 3.7×] ──┘
//! ```
//!
//! Each comb reads its delayed sample and writes `x + delayed * feedback`:
//!
//! ```text
//! y[n] = x[n] + feedback * y[n - delay]
//! ```
//!
//! The delay lengths are a 30ms base stretched by non-integer ratios so the
//! echoes of the eight combs rarely line up. There is no allpass diffusion
//! stage; the output is the plain average of the comb taps.
//!
//! Feedback is clamped to [`MAX_FEEDBACK`] so the network always decays.

use super::delay::{DelayLine, MAX_FEEDBACK};

/// Delay multipliers applied to the 30ms base length.
pub const COMB_RATIOS: [f32; 8] = [1.0, 1.3, 1.7, 2.1, 2.3, 2.7, 3.1, 3.7];

const BASE_SECONDS: f32 = 0.03;

#[derive(Debug, Clone)]
struct Comb {
    line: DelayLine,
    delay: usize,
}

/// Eight-comb reverb sized from the sample rate at construction.
#[derive(Debug, Clone)]
pub struct SimpleReverb {
    combs: Vec<Comb>,
    feedback: f32,
}

impl SimpleReverb {
    pub fn new(sample_rate: f32) -> Self {
        let base = ((sample_rate * BASE_SECONDS) as usize).max(1);
        let combs = COMB_RATIOS
            .iter()
            .map(|ratio| {
                let delay = ((base as f32 * ratio) as usize).max(1);
                Comb {
                    line: DelayLine::new(delay * 2),
                    delay,
                }
            })
            .collect();
        Self {
            combs,
            feedback: 0.5,
        }
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, MAX_FEEDBACK);
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    /// Delay of each comb in samples.
    pub fn comb_delays(&self) -> impl Iterator<Item = usize> + '_ {
        self.combs.iter().map(|c| c.delay)
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let mut acc = 0.0;
        for comb in &mut self.combs {
            let delayed = comb.line.read(comb.delay);
            comb.line.push(input + delayed * self.feedback);
            acc += delayed;
        }
        acc / self.combs.len() as f32
    }

    pub fn clear(&mut self) {
        for comb in &mut self.combs {
            comb.line.clear();
        }
    }
}
