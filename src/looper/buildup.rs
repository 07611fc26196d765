//! Build-up looper: freeze the last bar, then spin it faster.
//!
//! Live input is always written into a capture ring. A build request (gate
//! high, or the latch button when no gate is patched) copies the newest loop
//! window into a [`Snapshot`] and starts playing it back. The playback rate
//! ramps from 1× to the intensity knob over the build time:
//!
//! ```text
//!   rate = 1 + (intensity - 1) · ease(progress)      ease(x) = x²(3 - 2x)
//! ```
//!
//! Dropping the request crossfades from the frozen loop back to the live
//! input over 20 ms.
//!
//! Loop length comes from the LOOP knob in seconds, or with a clock patched
//! from a bar count (4 beats per bar) times the measured beat period.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::ring::{seam_fade, Snapshot};
use crate::dsp::delay::DelayLine;
use crate::dsp::mix::stereo_input;
use crate::dsp::smooth::SmoothedParam;
use crate::dsp::trigger::EdgeDetector;
use crate::module::{Module, ProcessCtx, AUDIO_10V};

/// Seconds of live input the capture ring keeps.
pub const RING_SECONDS: f32 = 2.5;
/// Longest loop, seconds.
pub const MAX_LOOP_SECONDS: f32 = 2.0;
/// Loop-to-live crossfade after a build ends, seconds.
pub const EXIT_FADE_SECONDS: f32 = 0.020;

/// Gate, clock and button threshold.
const GATE_THRESHOLD: f32 = 0.5;
const KNOB_SMOOTHING: f32 = 0.0005;
const BEATS_PER_BAR: f32 = 4.0;
/// Clock periods longer than this many seconds are ignored (~15 BPM).
const MAX_BEAT_SECONDS: f32 = 4.0;

/// Small-signal boost: quiet loops are lifted toward this peak.
const BOOST_TARGET: f32 = 0.25;
const BOOST_MAX_GAIN: f32 = 3.0;
const BOOST_FLOOR: f32 = 0.001;
const BOOST_CEILING: f32 = 0.2;
const OUTPUT_LIMIT: f32 = 1.2;

const BUILD_LIGHT_BASE: f32 = 0.3;

/// Smoothstep acceleration curve, `x²(3 - 2x)` on `[0, 1]`.
#[inline]
pub fn ease_in_out(x: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Idle,
    Build,
    ExitFade,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LooperParams {
    /// Latching button; every change of value toggles the build
    pub build: bool,
    /// Peak playback rate, 1..15
    pub intensity: f32,
    /// Seconds to reach the peak rate, 2..16
    pub time: f32,
    /// Free-running loop length, seconds, 1/16..2
    pub loop_seconds: f32,
    /// 0..3 for 1, 2, 4 or 8 bars when clocked
    pub bars: u32,
    /// Lift quiet loops during a build
    pub boost: bool,
}

impl Default for LooperParams {
    fn default() -> Self {
        Self {
            build: false,
            intensity: 1.0,
            time: 8.0,
            loop_seconds: 0.25,
            bars: 0,
            boost: true,
        }
    }
}

impl LooperParams {
    pub fn bar_count(&self) -> f32 {
        (1u32 << self.bars.min(3)) as f32
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LooperInputs {
    /// Gate; while patched it replaces the button
    pub trigger: Option<f32>,
    /// One pulse per beat
    pub clock: Option<f32>,
    /// 0..10V for 1..15×, replaces the knob
    pub intensity: Option<f32>,
    pub left: Option<f32>,
    pub right: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LooperOutputs {
    pub left: f32,
    pub right: f32,
    pub build_light: f32,
}

/// Sample-rate-sized storage, created on the first `process`.
#[derive(Debug, Clone)]
struct Buffers {
    sample_rate: f32,
    ring: [DelayLine; 2],
    loops: [Snapshot; 2],
}

impl Buffers {
    fn new(sample_rate: f32) -> Self {
        let loop_capacity = (MAX_LOOP_SECONDS * sample_rate).ceil() as usize;
        let preroll = seam_fade(loop_capacity, sample_rate);
        Self {
            sample_rate,
            ring: [
                DelayLine::with_duration(RING_SECONDS, sample_rate),
                DelayLine::with_duration(RING_SECONDS, sample_rate),
            ],
            loops: [
                Snapshot::new(loop_capacity, preroll),
                Snapshot::new(loop_capacity, preroll),
            ],
        }
    }

    fn loop_capacity(&self) -> usize {
        self.loops[0].capacity()
    }
}

#[derive(Debug, Clone)]
pub struct BuildupLooper {
    buffers: Option<Buffers>,
    state: LoopState,

    toggle: bool,
    last_button: bool,

    intensity: SmoothedParam,
    time: SmoothedParam,
    loop_seconds: SmoothedParam,

    clock: EdgeDetector,
    clock_counter: u64,
    last_clock: u64,
    /// Smoothed beat length in samples, 0 until measured
    beat_period: f32,

    playhead: f32,
    ramp: u64,
    exit_elapsed: f32,
}

impl Default for BuildupLooper {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildupLooper {
    pub fn new() -> Self {
        let defaults = LooperParams::default();
        Self {
            buffers: None,
            state: LoopState::Idle,
            toggle: false,
            last_button: false,
            intensity: SmoothedParam::new(defaults.intensity, KNOB_SMOOTHING),
            time: SmoothedParam::new(defaults.time, KNOB_SMOOTHING),
            loop_seconds: SmoothedParam::new(defaults.loop_seconds, KNOB_SMOOTHING),
            clock: EdgeDetector::new(GATE_THRESHOLD),
            clock_counter: 0,
            last_clock: 0,
            beat_period: 0.0,
            playhead: 0.0,
            ramp: 0,
            exit_elapsed: 0.0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Length of the frozen loop in samples, 0 before the first build.
    pub fn loop_len(&self) -> usize {
        self.buffers.as_ref().map_or(0, |b| b.loops[0].len())
    }

    /// Measured beat period in samples, if a clock has been seen.
    pub fn beat_period(&self) -> Option<f32> {
        (self.beat_period > 0.0).then_some(self.beat_period)
    }

    /// Jump the smoothed knobs straight to `params`.
    pub fn settle(&mut self, params: &LooperParams) {
        self.intensity.set_immediate(params.intensity.clamp(1.0, 15.0));
        self.time.set_immediate(params.time.clamp(2.0, 16.0));
        self.loop_seconds
            .set_immediate(params.loop_seconds.clamp(1.0 / 16.0, MAX_LOOP_SECONDS));
    }

    fn wants_build(&mut self, params: &LooperParams, inputs: &LooperInputs) -> bool {
        if params.build != self.last_button {
            self.toggle = !self.toggle;
        }
        self.last_button = params.build;
        match inputs.trigger {
            Some(v) => v >= GATE_THRESHOLD,
            None => self.toggle,
        }
    }

    /// Track the clock and return the loop length in samples.
    fn loop_length(&mut self, ctx: &ProcessCtx, params: &LooperParams, inputs: &LooperInputs, max: usize) -> usize {
        let free_running = self.loop_seconds.value() * ctx.sample_rate;
        let Some(v) = inputs.clock else {
            return (free_running as usize).clamp(1, max);
        };

        if self.clock.rising(v) {
            let period = self.clock_counter.saturating_sub(self.last_clock) as f32;
            if period > 0.0 && period < MAX_BEAT_SECONDS * ctx.sample_rate {
                self.beat_period = 0.1 * self.beat_period + 0.9 * period;
            }
            self.last_clock = self.clock_counter;
        }
        self.clock_counter += 1;

        let len = if self.beat_period > 0.0 {
            params.bar_count() * BEATS_PER_BAR * self.beat_period
        } else {
            free_running
        };
        (len as usize).clamp(1, max)
    }
}

impl Module for BuildupLooper {
    type Params = LooperParams;
    type Inputs = LooperInputs;
    type Outputs = LooperOutputs;

    fn process(&mut self, ctx: &ProcessCtx, params: &LooperParams, inputs: &LooperInputs) -> LooperOutputs {
        let sr = ctx.sample_rate;
        if self.buffers.as_ref().map_or(true, |b| b.sample_rate != sr) {
            log::debug!("buildup looper: allocating {RING_SECONDS} s ring at {sr} Hz");
            self.buffers = Some(Buffers::new(sr));
            // Loop and beat length were measured at another rate
            self.state = LoopState::Idle;
            self.playhead = 0.0;
            self.clock_counter = 0;
            self.last_clock = 0;
            self.beat_period = 0.0;
        }
        let loop_capacity = self.buffers.as_ref().map_or(1, Buffers::loop_capacity);

        let want_build = self.wants_build(params, inputs);

        let target_intensity = match inputs.intensity {
            Some(v) => 1.0 + v / AUDIO_10V * 14.0,
            None => params.intensity,
        };
        self.intensity.follow(target_intensity.clamp(1.0, 15.0));
        self.time.follow(params.time.clamp(2.0, 16.0));
        self.loop_seconds
            .follow(params.loop_seconds.clamp(1.0 / 16.0, MAX_LOOP_SECONDS));

        let len = self.loop_length(ctx, params, inputs, loop_capacity);

        let (in_l, in_r) = stereo_input(inputs.left, inputs.right);
        let input = [in_l / AUDIO_10V, in_r / AUDIO_10V];

        let Some(buffers) = self.buffers.as_mut() else {
            return LooperOutputs::default();
        };
        for (ring, sample) in buffers.ring.iter_mut().zip(input) {
            ring.push(sample);
        }

        if self.state == LoopState::Idle {
            if want_build {
                let preroll = seam_fade(len, sr);
                for (snapshot, ring) in buffers.loops.iter_mut().zip(&buffers.ring) {
                    snapshot.capture(ring, len, preroll);
                }
                self.playhead = 0.0;
                self.ramp = 0;
                self.state = LoopState::Build;
            }
            return LooperOutputs {
                left: input[0] * AUDIO_10V,
                right: input[1] * AUDIO_10V,
                build_light: 0.0,
            };
        }

        let loop_len = buffers.loops[0].len();
        let fade = seam_fade(loop_len, sr);

        if self.state == LoopState::Build {
            if want_build {
                self.ramp += 1;
                let ramp_len = self.time.value() * sr;
                let progress = if ramp_len > 0.0 {
                    (self.ramp as f32 / ramp_len).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                let rate = 1.0 + (self.intensity.value() - 1.0) * ease_in_out(progress);

                let size = loop_len as f32;
                self.playhead += rate;
                while self.playhead >= size {
                    self.playhead -= size;
                }

                let mut out = [
                    buffers.loops[0].read_seamless(self.playhead, fade),
                    buffers.loops[1].read_seamless(self.playhead, fade),
                ];
                if params.boost {
                    let peak = out[0].abs().max(out[1].abs());
                    let mut gain = 1.0;
                    if peak > BOOST_FLOOR && peak < BOOST_CEILING {
                        gain = BOOST_TARGET / peak;
                    }
                    let gain = gain.clamp(1.0, BOOST_MAX_GAIN);
                    for s in &mut out {
                        *s *= gain;
                    }
                }
                for s in &mut out {
                    *s = s.clamp(-OUTPUT_LIMIT, OUTPUT_LIMIT);
                }

                return LooperOutputs {
                    left: out[0] * AUDIO_10V,
                    right: out[1] * AUDIO_10V,
                    build_light: BUILD_LIGHT_BASE + (1.0 - BUILD_LIGHT_BASE) * progress,
                };
            }
            // Fade starts on this frame at mix 0
            self.state = LoopState::ExitFade;
            self.exit_elapsed = 0.0;
        }

        let total = EXIT_FADE_SECONDS * sr;
        let mix = if total > 0.0 {
            (self.exit_elapsed / total).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let looped = [
            buffers.loops[0].read_seamless(self.playhead, fade),
            buffers.loops[1].read_seamless(self.playhead, fade),
        ];
        self.exit_elapsed += 1.0;
        if self.exit_elapsed >= total {
            self.state = LoopState::Idle;
        }

        LooperOutputs {
            left: (looped[0] * (1.0 - mix) + input[0] * mix) * AUDIO_10V,
            right: (looped[1] * (1.0 - mix) + input[1] * mix) * AUDIO_10V,
            build_light: BUILD_LIGHT_BASE * (1.0 - mix),
        }
    }

    fn reset(&mut self) {
        if let Some(buffers) = self.buffers.as_mut() {
            for ring in &mut buffers.ring {
                ring.clear();
            }
            for snapshot in &mut buffers.loops {
                snapshot.clear();
            }
        }
        self.state = LoopState::Idle;
        self.clock.reset();
        self.clock_counter = 0;
        self.last_clock = 0;
        self.beat_period = 0.0;
        self.playhead = 0.0;
        self.ramp = 0;
        self.exit_elapsed = 0.0;
    }
}
