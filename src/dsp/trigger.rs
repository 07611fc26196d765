//! Gate and trigger plumbing.
//!
//! Clock, gate and reset inputs carry voltages, not events. These helpers
//! turn voltage levels into single-sample events and back into fixed-width
//! pulses.

use crate::module::EDGE_THRESHOLD;

/// Fires once per crossing above `threshold` from at-or-below it.
///
/// This is the plain "crosses above 1V" rule used by clock, sync and reset
/// inputs that have no hysteresis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeDetector {
    threshold: f32,
    last: f32,
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new(EDGE_THRESHOLD)
    }
}

impl EdgeDetector {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            last: 0.0,
        }
    }

    /// Returns true on the sample the input rises through the threshold.
    #[inline]
    pub fn rising(&mut self, value: f32) -> bool {
        let edge = value > self.threshold && self.last <= self.threshold;
        self.last = value;
        edge
    }

    /// Remember `value` without reporting an edge.
    #[inline]
    pub fn track(&mut self, value: f32) {
        self.last = value;
    }

    pub fn reset(&mut self) {
        self.last = 0.0;
    }
}

/// Trigger with hysteresis: arms at or below `low`, fires at or above `high`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchmittTrigger {
    low: f32,
    high: f32,
    state: bool,
}

impl Default for SchmittTrigger {
    fn default() -> Self {
        Self::new(0.1, EDGE_THRESHOLD)
    }
}

impl SchmittTrigger {
    pub fn new(low: f32, high: f32) -> Self {
        Self {
            low,
            high: high.max(low),
            state: false,
        }
    }

    #[inline]
    pub fn process(&mut self, value: f32) -> bool {
        if self.state {
            if value <= self.low {
                self.state = false;
            }
            false
        } else if value >= self.high {
            self.state = true;
            true
        } else {
            false
        }
    }

    pub fn is_high(&self) -> bool {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = false;
    }
}

/// Holds an output high for a fixed duration after each trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PulseGenerator {
    remaining: f32,
}

impl PulseGenerator {
    pub fn new() -> Self {
        Self { remaining: 0.0 }
    }

    /// Start (or extend) a pulse of `duration` seconds.
    pub fn trigger(&mut self, duration: f32) {
        self.remaining = self.remaining.max(duration);
    }

    /// Advance by `dt` and report whether the pulse is high this sample.
    #[inline]
    pub fn process(&mut self, dt: f32) -> bool {
        if self.remaining > 0.0 {
            self.remaining -= dt;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.remaining = 0.0;
    }
}

/// Passes every `division`th event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockDivider {
    count: u32,
    division: u32,
}

impl ClockDivider {
    pub fn new(division: u32) -> Self {
        Self {
            count: 0,
            division: division.max(1),
        }
    }

    pub fn set_division(&mut self, division: u32) {
        self.division = division.max(1);
    }

    pub fn division(&self) -> u32 {
        self.division
    }

    /// Count one event; true when the count reaches the division.
    #[inline]
    pub fn process(&mut self) -> bool {
        self.count += 1;
        if self.count >= self.division {
            self.count = 0;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}
