//! Granular synthesis: a grain pool fed from a beat-synced scheduler.
//!
//! ```text
//!   GrainSource ──▶ GrainScheduler (32 grains) ──▶ Biquad LP ──▶ L/R
//!        ▲                 ▲
//!   SampleLoader      clock / BPM timer
//! ```

pub mod grain;
pub mod particle;
pub mod scheduler;

pub use grain::{Grain, GrainSource};
pub use particle::{ParticleInputs, ParticleOutputs, ParticleParams, ParticleSynth, SampleLoader};
pub use scheduler::{GrainScheduler, GrainSettings, MAX_GRAINS};
