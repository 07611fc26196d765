//! Arpeggiator note lists and clock subdivision.
//!
//! An [`Arpeggio`] is built once per chord change: the chord's intervals are
//! repeated over one to three octaves, put in order, then cut to the voice
//! count. Stepping walks the list and wraps.
//!
//! [`StepSubdivider`] turns one incoming clock edge into `2^rate` evenly
//! spaced steps, using the period measured between the last two edges.

use rand::seq::SliceRandom;
use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::synth::chord::Intervals;

/// Most notes a list can hold before truncation (4 intervals × 3 octaves).
pub const MAX_ARP_NOTES: usize = 12;

/// Shortest and longest clock periods accepted as a measurement, seconds.
const MIN_PERIOD: f32 = 0.001;
const MAX_PERIOD: f32 = 10.0;

/// Period assumed until two edges have been seen.
pub const DEFAULT_PERIOD: f32 = 0.1;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArpOrder {
    #[default]
    Up,
    Down,
    Random,
}

impl ArpOrder {
    pub fn from_index(index: i32) -> Self {
        match index.clamp(0, 2) {
            0 => ArpOrder::Up,
            1 => ArpOrder::Down,
            _ => ArpOrder::Random,
        }
    }
}

/// An ordered list of note frequencies with a play cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arpeggio {
    notes: [f32; MAX_ARP_NOTES],
    len: usize,
    index: usize,
}

impl Default for Arpeggio {
    fn default() -> Self {
        Self {
            notes: [0.0; MAX_ARP_NOTES],
            len: 0,
            index: 0,
        }
    }
}

impl Arpeggio {
    /// Build a list from `root` Hz and chord `intervals`.
    ///
    /// `octaves` is clamped to 1..3 and `voices` to 1..7. The cursor starts
    /// at the first note.
    pub fn build<R: Rng + ?Sized>(
        root: f32,
        intervals: &Intervals,
        octaves: usize,
        order: ArpOrder,
        voices: usize,
        rng: &mut R,
    ) -> Self {
        let mut arp = Self::default();
        for octave in 0..octaves.clamp(1, 3) {
            for &interval in intervals.as_slice() {
                if arp.len == MAX_ARP_NOTES {
                    break;
                }
                let semitones = interval + octave as f32 * 12.0;
                arp.notes[arp.len] = root * 2.0_f32.powf(semitones / 12.0);
                arp.len += 1;
            }
        }

        let notes = &mut arp.notes[..arp.len];
        match order {
            ArpOrder::Up => notes.sort_by(|a, b| a.total_cmp(b)),
            ArpOrder::Down => notes.sort_by(|a, b| b.total_cmp(a)),
            ArpOrder::Random => notes.shuffle(rng),
        }

        arp.len = arp.len.min(voices.clamp(1, 7));
        arp
    }

    /// Return the note under the cursor and move to the next one.
    pub fn step(&mut self) -> Option<f32> {
        if self.len == 0 {
            return None;
        }
        let note = self.notes[self.index];
        self.index = (self.index + 1) % self.len;
        Some(note)
    }

    /// Position of the next note to be played.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn rewind(&mut self) {
        self.index = 0;
    }

    pub fn notes(&self) -> &[f32] {
        &self.notes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
        self.index = 0;
    }
}

/// Spreads `2^rate` steps across one measured clock period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSubdivider {
    last_edge: Option<f64>,
    period: f32,
    interval: f32,
    timer: f32,
    remaining: u32,
}

impl Default for StepSubdivider {
    fn default() -> Self {
        Self {
            last_edge: None,
            period: DEFAULT_PERIOD,
            interval: 0.0,
            timer: 0.0,
            remaining: 0,
        }
    }
}

impl StepSubdivider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a clock edge at absolute time `now` seconds.
    ///
    /// The caller plays the first step itself on the edge; the remaining
    /// `2^rate - 1` come out of [`StepSubdivider::process`].
    pub fn edge(&mut self, now: f64, rate: u32) {
        if let Some(last) = self.last_edge {
            let period = (now - last) as f32;
            if period > MIN_PERIOD && period < MAX_PERIOD {
                self.period = period;
            }
        }
        self.last_edge = Some(now);

        let steps = 1u32 << rate.min(5);
        self.interval = self.period / steps as f32;
        self.timer = 0.0;
        self.remaining = steps - 1;
    }

    /// Advance by `dt`; true when a scheduled step is due.
    #[inline]
    pub fn process(&mut self, dt: f32) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.timer += dt;
        if self.timer >= self.interval {
            self.timer -= self.interval;
            self.remaining -= 1;
            if self.remaining == 0 {
                self.timer = 0.0;
            }
            return true;
        }
        false
    }

    /// Measured clock period in seconds.
    pub fn period(&self) -> f32 {
        self.period
    }

    /// Drop pending steps, keeping the period measurement.
    pub fn cancel(&mut self) {
        self.timer = 0.0;
        self.remaining = 0;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
