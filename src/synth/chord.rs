//! Chord shapes, voicings, tunings and scales.
//!
//! Everything here is a closed set selected by an integer knob, so every
//! enum has a clamping `from_index`. Interval lists live in fixed-size
//! [`Intervals`] buffers so the audio thread never allocates when a chord
//! changes.

use rand::seq::SliceRandom;
use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::module::{light, FREQ_C4};

/// Largest chord any module builds.
pub const MAX_CHORD_NOTES: usize = 8;

/// Intervals for [`ChordType::Custom`], in semitones above the root.
pub const CUSTOM_INTERVALS: [f32; MAX_CHORD_NOTES] = [0.0, 4.0, 7.0, 12.0, 16.0, 19.0, 24.0, 28.0];

/// A short list of semitone offsets above a root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intervals {
    notes: [f32; MAX_CHORD_NOTES],
    len: usize,
}

impl Intervals {
    pub fn from_slice(semitones: &[f32]) -> Self {
        let len = semitones.len().min(MAX_CHORD_NOTES);
        let mut notes = [0.0; MAX_CHORD_NOTES];
        notes[..len].copy_from_slice(&semitones[..len]);
        Self { notes, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.notes[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.notes[..self.len]
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChordType {
    #[default]
    Major,
    Minor,
    Diminished,
    Augmented,
    Seventh,
    Suspended,
    /// Stacked thirds up to two octaves, cut to the voice count
    Custom,
}

impl ChordType {
    pub const ALL: [ChordType; 7] = [
        ChordType::Major,
        ChordType::Minor,
        ChordType::Diminished,
        ChordType::Augmented,
        ChordType::Seventh,
        ChordType::Suspended,
        ChordType::Custom,
    ];

    /// All types, Custom included.
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.clamp(0, 6) as usize]
    }

    /// The six fixed triads/tetrads, for modules without a Custom slot.
    pub fn from_basic_index(index: i32) -> Self {
        Self::ALL[index.clamp(0, 5) as usize]
    }

    /// Semitone offsets. `voice_count` only limits [`ChordType::Custom`].
    pub fn intervals(self, voice_count: usize) -> Intervals {
        match self {
            ChordType::Major => Intervals::from_slice(&[0.0, 4.0, 7.0]),
            ChordType::Minor => Intervals::from_slice(&[0.0, 3.0, 7.0]),
            ChordType::Diminished => Intervals::from_slice(&[0.0, 3.0, 6.0]),
            ChordType::Augmented => Intervals::from_slice(&[0.0, 4.0, 8.0]),
            ChordType::Seventh => Intervals::from_slice(&[0.0, 4.0, 7.0, 10.0]),
            ChordType::Suspended => Intervals::from_slice(&[0.0, 5.0, 7.0]),
            ChordType::Custom => {
                Intervals::from_slice(&CUSTOM_INTERVALS[..voice_count.min(MAX_CHORD_NOTES)])
            }
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Voicing {
    /// Intervals as listed
    #[default]
    Stack,
    /// Any interval below its predecessor moves up an octave
    Spread,
    /// Root stays put, the rest are shuffled
    Random,
}

impl Voicing {
    pub fn from_index(index: i32) -> Self {
        match index.clamp(0, 2) {
            0 => Voicing::Stack,
            1 => Voicing::Spread,
            _ => Voicing::Random,
        }
    }

    pub fn apply<R: Rng + ?Sized>(self, intervals: &mut Intervals, rng: &mut R) {
        let notes = intervals.as_mut_slice();
        match self {
            Voicing::Stack => {}
            Voicing::Spread => {
                for i in 1..notes.len() {
                    if notes[i] < notes[i - 1] {
                        notes[i] += 12.0;
                    }
                }
            }
            Voicing::Random => {
                if notes.len() > 2 {
                    notes[1..].shuffle(rng);
                }
            }
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tuning {
    #[default]
    Equal12,
    Equal24,
    /// Pure ratios for unison, thirds, fifth and sixth
    Just,
    /// Semitones read as hundreds of cents
    Cents,
}

impl Tuning {
    pub fn from_index(index: i32) -> Self {
        match index.clamp(0, 3) {
            0 => Tuning::Equal12,
            1 => Tuning::Equal24,
            2 => Tuning::Just,
            _ => Tuning::Cents,
        }
    }

    /// Frequency of a note `semitones` above `root` Hz.
    pub fn frequency(self, semitones: f32, root: f32) -> f32 {
        match self {
            Tuning::Equal12 | Tuning::Cents => root * 2.0_f32.powf(semitones / 12.0),
            Tuning::Equal24 => root * 2.0_f32.powf(semitones / 24.0),
            Tuning::Just => {
                let octaves = (semitones / 12.0).floor();
                let remainder = semitones - octaves * 12.0;
                let near = |target: f32| (remainder - target).abs() < 0.1;
                let ratio = if near(0.0) {
                    1.0
                } else if near(3.86) {
                    6.0 / 5.0
                } else if near(4.0) {
                    5.0 / 4.0
                } else if near(7.02) {
                    3.0 / 2.0
                } else if near(9.69) {
                    5.0 / 3.0
                } else {
                    2.0_f32.powf(remainder / 12.0)
                };
                root * 2.0_f32.powf(octaves) * ratio
            }
        }
    }
}

/// Root frequency for a pitch class 0..11 above C4, shifted by octaves.
#[inline]
pub fn pitch_class_root(pitch_class: i32, octave: f32) -> f32 {
    FREQ_C4 * 2.0_f32.powf(pitch_class.clamp(0, 11) as f32 / 12.0) * 2.0_f32.powf(octave)
}

/// One step of a four-slot chord sequence.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChordSlot {
    /// 0 = C .. 11 = B
    pub pitch_class: i32,
    pub chord: ChordType,
}

impl ChordSlot {
    pub fn new(pitch_class: i32, chord: ChordType) -> Self {
        Self { pitch_class, chord }
    }

    pub fn root(&self, octave: f32) -> f32 {
        pitch_class_root(self.pitch_class, octave)
    }

    pub fn intervals(&self) -> Intervals {
        self.chord.intervals(MAX_CHORD_NOTES)
    }
}

/// Number of slots a chord sequence cycles through.
pub const SLOT_COUNT: usize = 4;

/// One light per slot, lit for `current`.
pub fn slot_lights(current: usize) -> [f32; SLOT_COUNT] {
    std::array::from_fn(|i| light(i == current))
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scale {
    Major,
    Minor,
    #[default]
    Pentatonic,
    Lydian,
    Phrygian,
    Dorian,
}

impl Scale {
    pub const ALL: [Scale; 6] = [
        Scale::Major,
        Scale::Minor,
        Scale::Pentatonic,
        Scale::Lydian,
        Scale::Phrygian,
        Scale::Dorian,
    ];

    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.clamp(0, 5) as usize]
    }

    pub fn degrees(self) -> &'static [i32] {
        match self {
            Scale::Major => &[0, 2, 4, 5, 7, 9, 11],
            Scale::Minor => &[0, 2, 3, 5, 7, 8, 10],
            Scale::Pentatonic => &[0, 2, 4, 7, 9],
            Scale::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            Scale::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            Scale::Dorian => &[0, 2, 3, 5, 7, 9, 10],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn chord_intervals() {
        assert_eq!(ChordType::Major.intervals(8).as_slice(), &[0.0, 4.0, 7.0]);
        assert_eq!(ChordType::Seventh.intervals(2).len(), 4);
        assert_eq!(
            ChordType::Custom.intervals(5).as_slice(),
            &[0.0, 4.0, 7.0, 12.0, 16.0]
        );
        assert_eq!(ChordType::from_index(42), ChordType::Custom);
        assert_eq!(ChordType::from_basic_index(42), ChordType::Suspended);
    }

    #[test]
    fn spread_voicing_lifts_descending_notes() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut notes = Intervals::from_slice(&[0.0, 7.0, 4.0]);
        Voicing::Spread.apply(&mut notes, &mut rng);
        assert_eq!(notes.as_slice(), &[0.0, 7.0, 16.0]);
    }

    #[test]
    fn random_voicing_keeps_root() {
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..20 {
            let mut notes = ChordType::Custom.intervals(8);
            Voicing::Random.apply(&mut notes, &mut rng);
            assert_eq!(notes.as_slice()[0], 0.0);
            let mut sorted = notes.as_slice().to_vec();
            sorted.sort_by(|a, b| a.total_cmp(b));
            assert_eq!(sorted, CUSTOM_INTERVALS.to_vec());
        }
    }

    #[test]
    fn tunings() {
        let root = 200.0;
        assert!((Tuning::Equal12.frequency(12.0, root) - 400.0).abs() < 1e-3);
        assert!((Tuning::Equal24.frequency(12.0, root) - 200.0 * 2.0_f32.sqrt()).abs() < 1e-3);
        assert!((Tuning::Just.frequency(7.0, root) - 300.0).abs() < 1e-3);
        assert!((Tuning::Just.frequency(16.0, root) - 500.0).abs() < 1e-3);
        // No just ratio near a tritone: falls back to equal temperament
        assert!((Tuning::Just.frequency(6.0, root) - 200.0 * 2.0_f32.sqrt()).abs() < 1e-3);
        assert_eq!(Tuning::Cents.frequency(3.0, root), Tuning::Equal12.frequency(3.0, root));
    }

    #[test]
    fn scales() {
        assert_eq!(Scale::default(), Scale::Pentatonic);
        assert_eq!(Scale::from_index(-3), Scale::Major);
        assert_eq!(Scale::Dorian.degrees().len(), 7);
    }

    #[test]
    fn slots() {
        let slot = ChordSlot::new(7, ChordType::Minor);
        assert!((slot.root(0.0) - 391.995_43).abs() < 1e-2);
        assert_eq!(slot.intervals().as_slice(), &[0.0, 3.0, 7.0]);
        assert_eq!(slot_lights(2), [0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn pitch_class_root_octaves() {
        assert!((pitch_class_root(0, 0.0) - FREQ_C4).abs() < 1e-3);
        assert!((pitch_class_root(0, -1.0) - FREQ_C4 / 2.0).abs() < 1e-3);
        assert!((pitch_class_root(12, 0.0) - pitch_class_root(11, 0.0)).abs() < 1e-6);
    }
}
