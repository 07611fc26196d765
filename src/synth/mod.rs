// Purpose: Voices, polyphony and the host-facing synth modules
// Voices and the pool sit below the modules; chord.rs holds the shared theory

pub mod ambient;
pub mod binaural;
pub mod chord;
pub mod chord_synth;
pub mod pad;
pub mod pitch;
pub mod pluck;
pub mod pool;
pub mod voice;

pub use ambient::AmbientSynth;
pub use binaural::BinauralOscillator;
pub use chord::{ChordSlot, ChordType, Intervals, Scale, Tuning, Voicing};
pub use chord_synth::ChordSynth;
pub use pad::ChordPad;
pub use pitch::PitchDetector;
pub use pluck::ChordPluck;
pub use pool::VoicePool;
pub use voice::{Voice, VoiceState};
