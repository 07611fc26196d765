//! Ring-buffer looper.
//!
//! ```text
//!   input ──► capture ring (always, 1×)
//!                 │ build request
//!                 ▼
//!             snapshot ──► variable-rate read with seam crossfade ──► output
//! ```

pub mod buildup;
pub mod ring;

pub use buildup::{BuildupLooper, LoopState, LooperInputs, LooperOutputs, LooperParams};
pub use ring::{seam_fade, Snapshot};
