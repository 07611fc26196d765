#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::trigger::{ClockDivider, EdgeDetector, PulseGenerator};
use crate::module::{light, Module, ProcessCtx, GATE_HIGH, TRIGGER_PULSE};

/// Clock pulses per quarter note
pub const PPQN: u32 = 24;

/// Trigger output division, in clock pulses
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Division {
    /// 4/1, sixteen beats
    FourWhole,
    /// 2/1, eight beats
    TwoWhole,
    /// 1/1, four beats
    Whole,
    Half,
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    /// 1/64 lands on 1.5 pulses, rounded to 2 (1 as a triplet)
    SixtyFourth,
}

impl Division {
    pub const ALL: [Division; 9] = [
        Division::FourWhole,
        Division::TwoWhole,
        Division::Whole,
        Division::Half,
        Division::Quarter,
        Division::Eighth,
        Division::Sixteenth,
        Division::ThirtySecond,
        Division::SixtyFourth,
    ];

    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.clamp(0, 8) as usize]
    }

    /// Clock pulses between trigger outputs.
    ///
    /// Triplets take two thirds of the straight count. Divisions of a whole
    /// note or longer have no triplet form.
    pub fn pulses(self, triplet: bool) -> u32 {
        match (self, triplet) {
            (Division::FourWhole, _) => 384,
            (Division::TwoWhole, _) => 192,
            (Division::Whole, _) => 96,
            (Division::Half, false) => 48,
            (Division::Half, true) => 32,
            (Division::Quarter, false) => 24,
            (Division::Quarter, true) => 16,
            (Division::Eighth, false) => 12,
            (Division::Eighth, true) => 8,
            (Division::Sixteenth, false) => 6,
            (Division::Sixteenth, true) => 4,
            (Division::ThirtySecond, false) => 3,
            (Division::ThirtySecond, true) => 2,
            (Division::SixtyFourth, false) => 2,
            (Division::SixtyFourth, true) => 1,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockParams {
    /// Tempo, 30..300
    pub bpm: f32,
    pub division: Division,
    pub triplet: bool,
    /// Momentary reset button
    pub reset: bool,
    /// Run/stop latch
    pub running: bool,
}

impl Default for ClockParams {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            division: Division::Quarter,
            triplet: false,
            reset: false,
            running: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClockInputs {
    /// External pulse clock; each rising edge is one 24 PPQN pulse
    pub sync: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClockOutputs {
    pub clock: f32,
    pub reset: f32,
    pub trigger: f32,
    pub run_light: f32,
    pub reset_light: f32,
    pub triplet_light: f32,
}

/// 24 PPQN clock with a divided trigger output.
///
/// Runs from an internal timer, or from an external pulse clock when the
/// sync input is patched. The timer carries the overshoot of each period
/// into the next so the long-run tempo does not drift.
#[derive(Debug, Clone)]
pub struct ClockGenerator {
    elapsed: f64,
    clock_pulse: PulseGenerator,
    reset_pulse: PulseGenerator,
    trigger_pulse: PulseGenerator,
    divider: ClockDivider,
    sync: EdgeDetector,
    pulses: u64,
    last_bpm: f32,
    was_running: bool,
    was_reset: bool,
    was_synced: bool,
}

impl Default for ClockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockGenerator {
    pub fn new() -> Self {
        Self {
            elapsed: 0.0,
            clock_pulse: PulseGenerator::new(),
            reset_pulse: PulseGenerator::new(),
            trigger_pulse: PulseGenerator::new(),
            divider: ClockDivider::new(Division::Quarter.pulses(false)),
            sync: EdgeDetector::default(),
            pulses: 0,
            last_bpm: 120.0,
            was_running: false,
            was_reset: false,
            was_synced: false,
        }
    }

    /// Seconds between clock pulses at `bpm`.
    pub fn pulse_period(bpm: f32) -> f64 {
        60.0 / (bpm.clamp(30.0, 300.0) as f64 * PPQN as f64)
    }

    /// Clock pulses emitted since the last restart.
    pub fn pulse_count(&self) -> u64 {
        self.pulses
    }

    fn restart(&mut self) {
        self.reset_pulse.trigger(TRIGGER_PULSE);
        self.elapsed = 0.0;
        self.pulses = 0;
        self.divider.reset();
    }

    fn tick(&mut self) {
        self.clock_pulse.trigger(TRIGGER_PULSE);
        self.pulses += 1;
        if self.divider.process() {
            self.trigger_pulse.trigger(TRIGGER_PULSE);
        }
    }
}

impl Module for ClockGenerator {
    type Params = ClockParams;
    type Inputs = ClockInputs;
    type Outputs = ClockOutputs;

    fn process(&mut self, ctx: &ProcessCtx, params: &ClockParams, inputs: &ClockInputs) -> ClockOutputs {
        let bpm = params.bpm.clamp(30.0, 300.0);

        if params.running && !self.was_running {
            self.restart();
        }
        if !params.running && self.was_running {
            self.clock_pulse.reset();
            self.trigger_pulse.reset();
        }
        self.was_running = params.running;

        if params.reset && !self.was_reset {
            self.restart();
        }
        self.was_reset = params.reset;

        if (bpm - self.last_bpm).abs() > 1.0 {
            self.last_bpm = bpm;
            self.elapsed = 0.0;
            self.pulses = 0;
        }

        self.divider.set_division(params.division.pulses(params.triplet));

        let synced = inputs.sync.is_some();
        if !synced && self.was_synced {
            self.elapsed = 0.0;
        }
        self.was_synced = synced;

        match inputs.sync {
            Some(v) if params.running => {
                if self.sync.rising(v) {
                    self.tick();
                }
            }
            // Stopped: follow the input so a restart does not see a stale edge
            Some(v) => self.sync.track(v),
            None if params.running => {
                let period = Self::pulse_period(bpm);
                self.elapsed += ctx.sample_time as f64;
                if self.elapsed >= period {
                    self.elapsed -= period;
                    self.tick();
                }
            }
            None => {}
        }

        let dt = ctx.sample_time;
        ClockOutputs {
            clock: if self.clock_pulse.process(dt) { GATE_HIGH } else { 0.0 },
            reset: if self.reset_pulse.process(dt) { GATE_HIGH } else { 0.0 },
            trigger: if self.trigger_pulse.process(dt) { GATE_HIGH } else { 0.0 },
            run_light: light(params.running),
            reset_light: light(params.reset),
            triplet_light: light(params.triplet),
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}
