//! Stereo effects rack: delay, then reverb, then echo.
//!
//! ```text
//! in ÷10 ──► [delay] ──► [reverb] ──► [echo] ──► × level ──► ×10 out
//! ```
//!
//! Each stage is bypassed while its enable is off; a bypassed line keeps
//! whatever it last held and resumes from there.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::delay::{feedback_tap, DelayLine, MAX_FEEDBACK};
use crate::dsp::mix::stereo_input;
use crate::dsp::reverb::SimpleReverb;
use crate::module::{light, Module, ProcessCtx, AUDIO_10V};

/// Longest delay time, seconds.
pub const MAX_DELAY_SECONDS: f32 = 1.0;
/// Longest echo time, seconds.
pub const MAX_ECHO_SECONDS: f32 = 0.5;

const ECHO_WET: f32 = 0.5;
/// The echo writes back its wet output as well as its feedback tap, so the
/// loop gain is `ECHO_WET + feedback`.
const MAX_ECHO_FEEDBACK: f32 = MAX_FEEDBACK - ECHO_WET;
/// Reverb comb feedback at full damping.
const REVERB_FEEDBACK_SCALE: f32 = 0.7;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereoFxParams {
    /// Output level, 0..2
    pub level: f32,

    pub delay: bool,
    /// Seconds, 0.001..1
    pub delay_time: f32,
    /// 0..0.95
    pub delay_feedback: f32,

    pub reverb: bool,
    /// Wet amount, 0.1..1
    pub reverb_size: f32,
    /// 0..1; sets comb feedback
    pub reverb_damping: f32,

    pub echo: bool,
    /// Seconds, 0.01..0.5
    pub echo_time: f32,
    /// 0..0.9
    pub echo_feedback: f32,
}

impl Default for StereoFxParams {
    fn default() -> Self {
        Self {
            level: 1.0,
            delay: false,
            delay_time: 0.3,
            delay_feedback: 0.3,
            reverb: false,
            reverb_size: 0.5,
            reverb_damping: 0.5,
            echo: false,
            echo_time: 0.2,
            echo_feedback: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StereoFxInputs {
    pub left: Option<f32>,
    pub right: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StereoFxOutputs {
    pub left: f32,
    pub right: f32,
    pub delay_light: f32,
    pub reverb_light: f32,
    pub echo_light: f32,
}

/// One channel's lines.
#[derive(Debug, Clone)]
struct Channel {
    delay: DelayLine,
    reverb: SimpleReverb,
    echo: DelayLine,
}

impl Channel {
    fn new(sample_rate: f32) -> Self {
        Self {
            delay: DelayLine::with_duration(MAX_DELAY_SECONDS, sample_rate),
            reverb: SimpleReverb::new(sample_rate),
            echo: DelayLine::with_duration(MAX_ECHO_SECONDS, sample_rate),
        }
    }

    #[inline]
    fn process(&mut self, input: f32, stages: &Stages) -> f32 {
        let mut out = input;

        if let Some((offset, feedback)) = stages.delay {
            out += feedback_tap(&mut self.delay, input, offset, feedback);
        }

        if let Some((size, feedback)) = stages.reverb {
            self.reverb.set_feedback(feedback);
            let wet = self.reverb.process(out) * size;
            out = out * (1.0 - size * 0.5) + wet;
        }

        if let Some((offset, feedback)) = stages.echo {
            let echo = self.echo.read(offset);
            out += echo * ECHO_WET;
            self.echo.push(out + echo * feedback);
        }

        out
    }

    fn clear(&mut self) {
        self.delay.clear();
        self.reverb.clear();
        self.echo.clear();
    }
}

/// Clamped per-sample stage settings, `None` when bypassed.
struct Stages {
    delay: Option<(usize, f32)>,
    reverb: Option<(f32, f32)>,
    echo: Option<(usize, f32)>,
}

impl Stages {
    fn new(params: &StereoFxParams, sample_rate: f32) -> Self {
        Self {
            delay: params.delay.then(|| {
                let time = params.delay_time.clamp(0.001, MAX_DELAY_SECONDS);
                ((time * sample_rate) as usize, params.delay_feedback.clamp(0.0, 0.95))
            }),
            reverb: params.reverb.then(|| {
                (
                    params.reverb_size.clamp(0.1, 1.0),
                    params.reverb_damping.clamp(0.0, 1.0) * REVERB_FEEDBACK_SCALE,
                )
            }),
            echo: params.echo.then(|| {
                let time = params.echo_time.clamp(0.01, MAX_ECHO_SECONDS);
                let feedback = params.echo_feedback.clamp(0.0, 0.9).min(MAX_ECHO_FEEDBACK);
                ((time * sample_rate) as usize, feedback)
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StereoFx {
    /// Lines and the rate they were sized for
    channels: Option<(f32, [Channel; 2])>,
}

impl StereoFx {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Module for StereoFx {
    type Params = StereoFxParams;
    type Inputs = StereoFxInputs;
    type Outputs = StereoFxOutputs;

    fn process(&mut self, ctx: &ProcessCtx, params: &StereoFxParams, inputs: &StereoFxInputs) -> StereoFxOutputs {
        let sr = ctx.sample_rate;
        if self.channels.as_ref().map_or(true, |(rate, _)| *rate != sr) {
            log::debug!("stereo fx: allocating delay lines at {sr} Hz");
            self.channels = Some((sr, [Channel::new(sr), Channel::new(sr)]));
        }
        let Some((_, channels)) = self.channels.as_mut() else {
            return StereoFxOutputs::default();
        };

        let (left, right) = stereo_input(inputs.left, inputs.right);
        let stages = Stages::new(params, sr);
        let level = params.level.clamp(0.0, 2.0) * AUDIO_10V;

        StereoFxOutputs {
            left: channels[0].process(left / AUDIO_10V, &stages) * level,
            right: channels[1].process(right / AUDIO_10V, &stages) * level,
            delay_light: light(params.delay),
            reverb_light: light(params.reverb),
            echo_light: light(params.echo),
        }
    }

    fn reset(&mut self) {
        if let Some((_, channels)) = self.channels.as_mut() {
            for channel in channels {
                channel.clear();
            }
        }
    }
}
