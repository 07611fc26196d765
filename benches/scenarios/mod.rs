//! Real-world scenario benchmarks.
//!
//! Whole modules driven with realistic knob settings, plus the voice pool
//! they share.

mod modules;
mod voices;

pub use modules::bench_modules;
pub use voices::bench_voices;
