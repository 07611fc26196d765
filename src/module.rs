//! The per-sample contract between a host and every module in this crate.
//!
//! A host owns three things per module: a params struct (knob positions), an
//! inputs struct (port voltages, `None` when a port is unpatched) and the
//! module itself. Once per audio sample it calls [`Module::process`] and reads
//! back an outputs struct of voltages and light brightnesses.

/// Reference pitch for 0V on a 1V/oct input or output (middle C).
pub const FREQ_C4: f32 = 261.625_58;

/// Level a gate or trigger output is driven to while high.
pub const GATE_HIGH: f32 = 10.0;

/// Width of every trigger pulse emitted by the crate, in seconds.
pub const TRIGGER_PULSE: f32 = 1e-3;

/// Rising-edge threshold used by clock, gate and reset inputs.
pub const EDGE_THRESHOLD: f32 = 1.0;

/// Scale between the internal [-1, 1] range and a ±5V audio port.
pub const AUDIO_5V: f32 = 5.0;

/// Scale between the internal [-1, 1] range and a ±10V audio port.
pub const AUDIO_10V: f32 = 10.0;

/// Context passed to modules on every sample.
///
/// `frame` counts samples since the context was created and is the only
/// absolute time base a module may rely on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessCtx {
    pub sample_rate: f32,
    pub sample_time: f32,
    pub frame: u64,
}

impl ProcessCtx {
    pub fn new(sample_rate: f32) -> Self {
        let sample_rate = sample_rate.max(1.0);
        Self {
            sample_rate,
            sample_time: 1.0 / sample_rate,
            frame: 0,
        }
    }

    /// Step the frame counter. Hosts call this once after every sample.
    #[inline]
    pub fn advance(&mut self) {
        self.frame += 1;
    }

    /// Seconds elapsed since frame zero.
    #[inline]
    pub fn time(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }
}

/// Core trait for a rack module.
///
/// `process` must be realtime-safe once the module has run at least one
/// sample: no allocation, no locking, bounded work.
pub trait Module: Send {
    type Params;
    type Inputs;
    type Outputs;

    fn process(
        &mut self,
        ctx: &ProcessCtx,
        params: &Self::Params,
        inputs: &Self::Inputs,
    ) -> Self::Outputs;

    /// Return to the just-constructed state, keeping allocated buffers.
    fn reset(&mut self);
}

/// Convert a MIDI note number to frequency in Hz (A4 = 69 = 440 Hz).
#[inline]
pub fn midi_to_freq(note: f32) -> f32 {
    440.0 * 2.0_f32.powf((note - 69.0) / 12.0)
}

/// Convert a frequency to a (fractional) MIDI note number.
#[inline]
pub fn freq_to_midi(freq: f32) -> f32 {
    69.0 + 12.0 * (freq.max(f32::MIN_POSITIVE) / 440.0).log2()
}

/// Convert a 1V/oct voltage to frequency, 0V = C4.
#[inline]
pub fn voct_to_freq(volts: f32) -> f32 {
    FREQ_C4 * 2.0_f32.powf(volts)
}

/// MIDI note to 1V/oct, C4 (60) = 0V.
#[inline]
pub fn midi_to_voct(note: f32) -> f32 {
    (note - 60.0) / 12.0
}

/// Brightness for a boolean indicator.
#[inline]
pub fn light(on: bool) -> f32 {
    if on {
        1.0
    } else {
        0.0
    }
}
