//! Capture ring and loop snapshots.
//!
//! The ring records live input forever at 1×. A [`Snapshot`] is a frozen
//! copy of its most recent `len` samples, taken at trigger time, which can
//! then be played back at any rate without racing the writer.

use crate::dsp::delay::DelayLine;
use crate::dsp::interp::read_linear;

/// Seam crossfade length, seconds.
pub const SEAM_FADE_SECONDS: f32 = 0.010;
/// Shortest seam crossfade, samples.
pub const MIN_SEAM_FADE: usize = 4;

/// Seam window for a loop of `len` samples: 10 ms, at least
/// [`MIN_SEAM_FADE`] and at most half the loop.
///
/// Loops shorter than two minimum windows get no crossfade at all.
pub fn seam_fade(len: usize, sample_rate: f32) -> usize {
    let fade = (SEAM_FADE_SECONDS * sample_rate) as usize;
    fade.min(len / 2).max(MIN_SEAM_FADE)
}

/// A fixed-capacity loop copied out of a capture ring.
///
/// Alongside the loop body the snapshot keeps a short pre-roll: the audio
/// recorded just before the loop start. The seam crossfade blends the tail
/// into that pre-roll, which runs straight into the first body sample.
///
/// ```text
///   buffer: [ pre-roll | body ........................ ]
///                      ^ loop position 0
/// ```
#[derive(Debug, Clone)]
pub struct Snapshot {
    buffer: Box<[f32]>,
    capacity: usize,
    preroll: usize,
    len: usize,
}

impl Snapshot {
    /// Allocate room for loops of up to `capacity` samples plus up to
    /// `max_preroll` samples of pre-roll.
    pub fn new(capacity: usize, max_preroll: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: vec![0.0; capacity + max_preroll].into_boxed_slice(),
            capacity,
            preroll: 0,
            len: 0,
        }
    }

    /// Longest loop body, samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Pre-roll captured with the current loop, samples.
    pub fn preroll(&self) -> usize {
        self.preroll
    }

    /// The loop body, oldest first.
    pub fn samples(&self) -> &[f32] {
        &self.buffer[self.preroll..self.preroll + self.len]
    }

    /// Copy the newest `len` samples of `ring` as the loop body, plus up to
    /// `preroll` samples recorded before them.
    ///
    /// `len` is clamped to the snapshot capacity and to what the ring can
    /// hold; the pre-roll shrinks to whatever room is left.
    pub fn capture(&mut self, ring: &DelayLine, len: usize, preroll: usize) {
        let history = ring.capacity() - 1;
        let len = len.min(self.capacity).min(history).max(1);
        let preroll = preroll
            .min(self.buffer.len() - len)
            .min(history.saturating_sub(len));
        let total = len + preroll;
        for (i, slot) in self.buffer[..total].iter_mut().enumerate() {
            *slot = ring.read(total - i);
        }
        self.len = len;
        self.preroll = preroll;
    }

    /// Linear read at `pos`, wrapping around the loop body.
    #[inline]
    pub fn read(&self, pos: f32) -> f32 {
        read_linear(self.samples(), pos)
    }

    /// Read with the last `fade` samples crossfaded into the pre-roll.
    ///
    /// At loop position `len - fade + k` the tail is blended with the sample
    /// recorded `fade - k` before the loop start, so the blend arrives at the
    /// first body sample exactly as the playhead wraps. `fade` is limited to
    /// the captured pre-roll.
    #[inline]
    pub fn read_seamless(&self, pos: f32, fade: usize) -> f32 {
        let len = self.len;
        if len == 0 {
            return 0.0;
        }
        let size = len as f32;
        let mut p = pos;
        while p >= size {
            p -= size;
        }
        while p < 0.0 {
            p += size;
        }

        let tail = self.read(p);
        let fade = fade.min(self.preroll).min(len);
        if fade == 0 {
            return tail;
        }

        let seam = (len - fade) as f32;
        if p < seam {
            return tail;
        }
        // Offset into the pre-roll window ending at the first body sample
        let q = (p - seam) + (self.preroll - fade) as f32;
        let i = q as usize;
        let frac = q - i as f32;
        let pre = self.buffer[i] + (self.buffer[i + 1] - self.buffer[i]) * frac;
        let w = (p - seam) / fade as f32;
        tail * (1.0 - w) + pre * w
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.preroll = 0;
        self.len = 0;
    }
}
