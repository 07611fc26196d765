pub mod dsp; // Allocation-free signal primitives
pub mod effects;
pub mod error;
pub mod granular; // Grain pool, scheduler and the particle module
pub mod handoff;
pub mod io;
pub mod looper;
pub mod module; // Per-sample module contract and voltage conventions
pub mod sequencing; // Clock generation and arpeggiation
pub mod synth; // Voices, polyphony and the chord/ambient modules
pub mod wavetable;

pub use error::{LoadError, LoadResult};
pub use module::{Module, ProcessCtx};

/// Smallest time constant any envelope or ramp will accept, in seconds.
pub(crate) const MIN_TIME: f32 = 0.001;
