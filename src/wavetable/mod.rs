//! Mipmapped two-bank wavetable synthesis.

pub mod loader;
pub mod oscillator;
pub mod table;

pub use loader::{BankLoader, WavetableBanks};
pub use oscillator::{
    WarpMode, WavetableInputs, WavetableOscillator, WavetableOutputs, WavetableParams,
};
pub use table::{Quality, Wavetable, MIP_LEVELS, NUM_BANKS, NUM_FRAMES, TABLE_SIZE};
