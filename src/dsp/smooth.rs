//! One-pole parameter smoothing.
//!
//! Every click-avoidance path in the crate (knob smoothing in the looper,
//! frequency glide in the chord voices) goes through [`SmoothedParam`]:
//!
//! ```text
//! current += (target - current) * coefficient      once per sample
//! ```
//!
//! A coefficient of 1.0 jumps immediately; small coefficients approach the
//! target exponentially with a time constant of roughly `1 / coefficient`
//! samples.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coefficient: f32,
    snap: f32,
}

impl SmoothedParam {
    pub fn new(initial: f32, coefficient: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coefficient: coefficient.clamp(0.0, 1.0),
            snap: 0.0,
        }
    }

    /// Jump straight to the target once within `tolerance` of it.
    pub fn with_snap(mut self, tolerance: f32) -> Self {
        self.snap = tolerance.max(0.0);
        self
    }

    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Set both target and current value (no glide).
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Advance one sample and return the new value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let delta = self.target - self.current;
        if delta.abs() <= self.snap {
            self.current = self.target;
        } else {
            self.current += delta * self.coefficient;
        }
        self.current
    }

    /// Set the target and advance in one call.
    #[inline]
    pub fn follow(&mut self, target: f32) -> f32 {
        self.target = target;
        self.next()
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }
}
