use crate::dsp::oscillator::{Phase, Waveform};
use crate::dsp::smooth::SmoothedParam;

/// Per-sample glide coefficient toward a new target frequency.
pub const GLIDE_COEFFICIENT: f32 = 0.01;
/// Glide lands exactly on its target once within this many Hz.
pub const GLIDE_SNAP_HZ: f32 = 0.1;
/// A voice fading toward 0 Hz is freed below this frequency.
pub const SILENT_HZ: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Free,    // Available for allocation
    Active,  // Sounding at (or gliding to) its target
    Fading,  // Gliding down to 0 Hz, freed below SILENT_HZ
}

/// One oscillator voice with click-free frequency glide.
///
/// The phase is never reset while a voice is sounding: a voice that is
/// reassigned keeps its phase and glides to the new frequency.
#[derive(Debug, Clone)]
pub struct Voice {
    state: VoiceState,
    freq: SmoothedParam,
    phase: Phase,
    waveform: Waveform,
    age: u64,
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice {
    pub fn new() -> Self {
        Self {
            state: VoiceState::Free,
            freq: SmoothedParam::new(0.0, GLIDE_COEFFICIENT).with_snap(GLIDE_SNAP_HZ),
            phase: Phase::new(),
            waveform: Waveform::Sine,
            age: 0,
        }
    }

    /// Start or retarget the voice.
    ///
    /// Always glides: a free voice starts from wherever its slot last left
    /// off, 0 Hz for a voice that has never sounded.
    pub fn start(&mut self, freq: f32, waveform: Waveform, age: u64) {
        self.freq.set_target(freq);
        self.waveform = waveform;
        self.state = VoiceState::Active;
        self.age = age;
    }

    /// Glide toward 0 Hz; the voice frees itself once inaudible.
    pub fn fade_out(&mut self) {
        if self.state == VoiceState::Active {
            self.state = VoiceState::Fading;
            self.freq.set_target(0.0);
        }
    }

    /// Jump to `freq` with no glide.
    pub fn set_frequency(&mut self, freq: f32) {
        self.freq.set_immediate(freq);
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Advance one sample and return the raw oscillator output.
    #[inline]
    pub fn tick(&mut self, dt: f32) -> f32 {
        if self.state == VoiceState::Free {
            return 0.0;
        }
        let freq = self.freq.next();
        if self.state == VoiceState::Fading && freq < SILENT_HZ {
            self.free();
            return 0.0;
        }
        let phase = self.phase.advance(freq, dt);
        self.waveform.render(phase)
    }

    /// Release the slot. The frequency stays put so the next note glides
    /// from it.
    pub fn free(&mut self) {
        self.state = VoiceState::Free;
    }

    pub fn is_free(&self) -> bool {
        self.state == VoiceState::Free
    }

    pub fn is_active(&self) -> bool {
        self.state != VoiceState::Free
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    /// Current (possibly mid-glide) frequency.
    pub fn frequency(&self) -> f32 {
        self.freq.value()
    }

    pub fn target_frequency(&self) -> f32 {
        self.freq.target()
    }

    pub fn phase(&self) -> f32 {
        self.phase.value()
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn reset(&mut self) {
        self.free();
        self.freq.set_immediate(0.0);
        self.phase.reset();
        self.age = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 48_000.0;

    #[test]
    fn fresh_voice_glides_up_from_silence() {
        let mut voice = Voice::new();
        voice.start(440.0, Waveform::Sine, 0);
        voice.tick(DT);
        let f = voice.frequency();
        assert!(f > 0.0 && f < 440.0, "first step {f}");
        assert_eq!(voice.target_frequency(), 440.0);

        for _ in 0..2_000 {
            voice.tick(DT);
        }
        assert_eq!(voice.frequency(), 440.0);
    }

    #[test]
    fn freed_voice_glides_from_its_last_frequency() {
        let mut voice = Voice::new();
        voice.start(300.0, Waveform::Sine, 0);
        for _ in 0..2_000 {
            voice.tick(DT);
        }
        voice.free();
        voice.start(600.0, Waveform::Sine, 1);
        voice.tick(DT);
        let f = voice.frequency();
        assert!(f > 300.0 && f < 310.0, "glide step {f}");
    }

    #[test]
    fn retarget_glides_without_phase_reset() {
        let mut voice = Voice::new();
        voice.start(200.0, Waveform::Sine, 0);
        for _ in 0..100 {
            voice.tick(DT);
        }
        let phase_before = voice.phase();
        voice.start(400.0, Waveform::Sine, 1);
        voice.tick(DT);
        let f = voice.frequency();
        assert!(f > 200.0 && f < 210.0, "glide step {f}");
        assert!((voice.phase() - phase_before).abs() < 0.01);

        for _ in 0..2_000 {
            voice.tick(DT);
        }
        assert_eq!(voice.frequency(), 400.0);
    }

    #[test]
    fn fade_out_frees_below_one_hz() {
        let mut voice = Voice::new();
        voice.start(100.0, Waveform::Saw, 0);
        voice.fade_out();
        assert_eq!(voice.state(), VoiceState::Fading);
        let mut steps = 0;
        while voice.is_active() {
            voice.tick(DT);
            steps += 1;
            assert!(steps < 10_000);
        }
        assert!(voice.is_free());
        assert_eq!(voice.tick(DT), 0.0);
    }
}
