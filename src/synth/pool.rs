use crate::dsp::oscillator::Waveform;
use crate::synth::voice::Voice;

/// Fixed-size voice array with first-free allocation.
///
/// When every slot is busy a new note is dropped: no voice is stolen. The
/// pool never grows after construction.
#[derive(Debug, Clone)]
pub struct VoicePool {
    voices: Vec<Voice>,
    clock: u64,
}

impl VoicePool {
    pub fn new(size: usize) -> Self {
        Self {
            voices: (0..size.max(1)).map(|_| Voice::new()).collect(),
            clock: 0,
        }
    }

    /// Start a note on the first free voice.
    ///
    /// Returns the voice index, or `None` if the pool is full and the note
    /// was dropped.
    pub fn note_on(&mut self, freq: f32, waveform: Waveform) -> Option<usize> {
        let index = self.voices.iter().position(Voice::is_free)?;
        self.assign(index, freq, waveform);
        Some(index)
    }

    /// Point voice `index` at `freq`, gliding if it is already sounding.
    pub fn assign(&mut self, index: usize, freq: f32, waveform: Waveform) {
        self.clock += 1;
        let age = self.clock;
        if let Some(voice) = self.voices.get_mut(index) {
            voice.start(freq, waveform, age);
        }
    }

    /// Glide voice `index` out.
    pub fn fade_out(&mut self, index: usize) {
        if let Some(voice) = self.voices.get_mut(index) {
            voice.fade_out();
        }
    }

    /// Sum of all sounding voices divided by how many there are.
    #[inline]
    pub fn render(&mut self, dt: f32) -> f32 {
        let mut sum = 0.0;
        for voice in &mut self.voices {
            sum += voice.tick(dt);
        }
        let active = self.active_count();
        if active > 0 {
            sum / active as f32
        } else {
            0.0
        }
    }

    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn voice_mut(&mut self, index: usize) -> Option<&mut Voice> {
        self.voices.get_mut(index)
    }

    pub fn reset(&mut self) {
        for voice in &mut self.voices {
            voice.reset();
        }
        self.clock = 0;
    }
}
