/// Fixed-capacity circular delay line.
///
/// `push` writes at the cursor and advances it; `read(offset)` looks
/// `offset` samples behind the cursor. `read(1)` is the most recent push and
/// `read(capacity)` would be the oldest, so offsets are clamped to
/// `capacity - 1`.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Box<[f32]>,
    write_pos: usize,
}

impl DelayLine {
    /// Allocate a silent line. This is the only allocation a line ever makes.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(1)].into_boxed_slice(),
            write_pos: 0,
        }
    }

    /// Line able to hold `seconds` of audio at `sample_rate`.
    pub fn with_duration(seconds: f32, sample_rate: f32) -> Self {
        Self::new((seconds.max(0.0) * sample_rate).ceil() as usize + 1)
    }

    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos += 1;
        if self.write_pos == self.buffer.len() {
            self.write_pos = 0;
        }
    }

    #[inline]
    pub fn read(&self, offset: usize) -> f32 {
        let size = self.buffer.len();
        let offset = offset.min(size - 1);
        let read_pos = (self.write_pos + size - offset) % size;
        self.buffer[read_pos]
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// Echo: read the tap, then write `input + tap * feedback`.
///
/// Feedback is clamped below 1 so the loop always decays.
#[inline]
pub fn feedback_tap(line: &mut DelayLine, input: f32, offset: usize, feedback: f32) -> f32 {
    let delayed = line.read(offset);
    line.push(input + delayed * feedback.clamp(0.0, MAX_FEEDBACK));
    delayed
}

/// Largest feedback any delay network in the crate will run with.
pub const MAX_FEEDBACK: f32 = 0.99;
