//! Low-level DSP primitives used by the rack modules.
//!
//! These components are allocation-free once constructed and realtime-safe,
//! making them safe to embed directly inside voice and module structs. They
//! stay focused on the signal-processing math; the modules layer on
//! parameter handling, edge detection and voltage scaling.

/// Circular delay line with push/read-by-offset access.
pub mod delay;
/// Attack/decay/sustain/release envelope with pad and pluck retrigger policies.
pub mod envelope;
/// One-pole RC and biquad lowpass filters.
pub mod filter;
/// Linear and cubic Hermite interpolation helpers.
pub mod interp;
/// Control-rate oscillator with sample & hold and tempo sync.
pub mod lfo;
/// Crossfades, dry/wet blends and soft clipping.
pub mod mix;
/// Waveform shapes, harmonic stacking and phase accumulation.
pub mod oscillator;
/// Comb-bank reverb built from delay lines.
pub mod reverb;
/// One-pole parameter smoothing.
pub mod smooth;
/// Schmitt triggers, edge detectors, pulse generators and clock dividers.
pub mod trigger;

pub use envelope::{Adsr, EnvelopeState, Retrigger};
pub use oscillator::{Phase, Waveform};
