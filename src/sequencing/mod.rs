pub mod arp;
pub mod clock;

pub use arp::{ArpOrder, Arpeggio, StepSubdivider};
pub use clock::{ClockGenerator, ClockInputs, ClockOutputs, ClockParams, Division, PPQN};
