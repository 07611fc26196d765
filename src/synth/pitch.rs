/// Zero-crossing frequency tracker for an audio-rate aux input.
///
/// Both upward and downward crossings count. From the second crossing on,
/// each crossing-to-crossing interval `n` samples yields `1 / (n · dt)`,
/// which is folded into the estimate as `0.9 · old + 0.1 · new` when it lies
/// in (20, 20000) Hz.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PitchDetector {
    detected: f32,
    last_sample: f32,
    crossings: u32,
    samples: u32,
}

const MIN_HZ: f32 = 20.0;
const MAX_HZ: f32 = 20_000.0;

impl PitchDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample of the input, `None` when the port is unpatched.
    pub fn process(&mut self, input: Option<f32>, dt: f32) {
        let Some(volts) = input else {
            self.reset();
            return;
        };

        let sample = volts / 5.0;
        let crossed = (self.last_sample <= 0.0 && sample > 0.0)
            || (self.last_sample >= 0.0 && sample < 0.0);
        if crossed {
            self.crossings = self.crossings.saturating_add(1);
            if self.crossings >= 2 && self.samples > 0 {
                let freq = 1.0 / (self.samples as f32 * dt);
                if freq > MIN_HZ && freq < MAX_HZ {
                    self.detected = self.detected * 0.9 + freq * 0.1;
                }
            }
            self.samples = 0;
        }
        self.samples = self.samples.saturating_add(1);
        self.last_sample = sample;
    }

    /// The smoothed estimate, if it is in the usable range.
    pub fn frequency(&self) -> Option<f32> {
        (self.detected > MIN_HZ && self.detected < MAX_HZ).then_some(self.detected)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
