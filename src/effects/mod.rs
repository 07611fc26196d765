pub mod stereo;

pub use stereo::{StereoFx, StereoFxInputs, StereoFxOutputs, StereoFxParams};
