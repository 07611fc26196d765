use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::interp::{cubic_hermite, lerp};
use crate::error::{LoadError, LoadResult};
use crate::io::DecodedSample;

/*
Wavetables and Mip Levels
=========================

A table holds NUM_FRAMES single-cycle waveforms of TABLE_SIZE samples each.
Each frame is stored at MIP_LEVELS resolutions:

    data[frame][mip][sample]

Level 0 is the raw cycle. Level k is a box average over a window of 2^k
neighbouring samples (wrapping around the cycle), which removes roughly the
upper (1 - 1/2^k) of the spectrum. The samples stay at TABLE_SIZE per level;
only the content gets smoother.

Mip Selection
-------------

The read path asks how many table samples one output sample skips:

    fc = freq / sample_rate × TABLE_SIZE

    fc < 32    → mip 0
    fc < 64    → mip 1
    ...            (thresholds double per level)
    otherwise  → mip 9

Low quality pushes two levels further (cheaper to alias-proof, duller).

Frame Blend
-----------

A frame position in [0, 1] maps onto the 63 gaps between frames. The two
neighbouring frames are read at the same phase and linearly blended, so a
slow sweep of the position morphs smoothly through the table.
*/

pub const TABLE_SIZE: usize = 2048;
pub const NUM_FRAMES: usize = 64;
pub const MIP_LEVELS: usize = 10;
pub const NUM_BANKS: usize = 2;

const FRAME_STRIDE: usize = MIP_LEVELS * TABLE_SIZE;
const PEAK_FLOOR: f32 = 0.0001;

/// Interpolation and mip policy for table reads.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    /// Two mip levels duller, linear interpolation
    Low,
    /// Linear interpolation
    #[default]
    Medium,
    /// Cubic Hermite interpolation
    High,
}

impl Quality {
    pub fn from_index(index: i32) -> Self {
        match index.clamp(0, 2) {
            0 => Quality::Low,
            1 => Quality::Medium,
            _ => Quality::High,
        }
    }
}

/// One bank: every frame at every mip level.
#[derive(Clone)]
pub struct Wavetable {
    data: Box<[f32]>,
}

impl std::fmt::Debug for Wavetable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wavetable")
            .field("frames", &NUM_FRAMES)
            .field("mips", &MIP_LEVELS)
            .field("table_size", &TABLE_SIZE)
            .finish()
    }
}

impl Wavetable {
    /// Build from `NUM_FRAMES × TABLE_SIZE` level-0 samples laid out frame
    /// after frame. Missing samples are zero; extra samples are ignored.
    pub fn from_frames(level0: &[f32]) -> Self {
        let mut data = vec![0.0; NUM_FRAMES * FRAME_STRIDE].into_boxed_slice();
        let mut prefix = vec![0.0f64; 3 * TABLE_SIZE + 1];

        for frame in 0..NUM_FRAMES {
            let base = frame * FRAME_STRIDE;
            let src_start = (frame * TABLE_SIZE).min(level0.len());
            let src_end = ((frame + 1) * TABLE_SIZE).min(level0.len());
            let src = &level0[src_start..src_end];
            data[base..base + src.len()].copy_from_slice(src);

            build_mips(&mut data[base..base + FRAME_STRIDE], &mut prefix);
        }

        Self { data }
    }

    /// The synthesized default for `bank` (0 = harmonic morph, 1 = formant
    /// morph). Any other index falls back to bank 1.
    pub fn default_bank(bank: usize) -> Self {
        let mut level0 = vec![0.0; NUM_FRAMES * TABLE_SIZE];
        for (frame, cycle) in level0.chunks_exact_mut(TABLE_SIZE).enumerate() {
            let t = frame as f32 / (NUM_FRAMES - 1) as f32;
            for (s, out) in cycle.iter_mut().enumerate() {
                let phase = s as f32 / TABLE_SIZE as f32;
                *out = if bank == 0 {
                    harmonic_morph(phase, t)
                } else {
                    formant_morph(phase, t)
                };
            }
            normalize_peak(cycle);
        }
        Self::from_frames(&level0)
    }

    /// Resample a decoded buffer into a full table and peak-normalize it.
    ///
    /// A source at least one table long is cut into `NUM_FRAMES` equal
    /// slices and each slice is stretched onto one cycle. A shorter source is
    /// stretched across all frames end to end.
    pub fn from_decoded(sample: &DecodedSample) -> LoadResult<Self> {
        if sample.is_empty() {
            return Err(LoadError::Empty);
        }
        let mut level0 = resample_to_frames(&sample.samples);
        normalize_peak(&mut level0);
        Ok(Self::from_frames(&level0))
    }

    #[inline]
    fn cycle(&self, frame: usize, mip: usize) -> &[f32] {
        let start = frame * FRAME_STRIDE + mip * TABLE_SIZE;
        &self.data[start..start + TABLE_SIZE]
    }

    /// One mip level of one frame.
    pub fn frame(&self, frame: usize, mip: usize) -> &[f32] {
        self.cycle(frame.min(NUM_FRAMES - 1), mip.min(MIP_LEVELS - 1))
    }

    /// Read at a frame position in [0, 1] and a phase in [0, 1).
    #[inline]
    pub fn read(&self, frame_pos: f32, phase: f32, mip: usize, quality: Quality) -> f32 {
        let mip = mip.min(MIP_LEVELS - 1);

        let frame_idx = frame_pos.clamp(0.0, 1.0) * (NUM_FRAMES - 1) as f32;
        let f0 = (frame_idx as usize).min(NUM_FRAMES - 2);
        let frame_frac = frame_idx - f0 as f32;

        let pos = phase * TABLE_SIZE as f32;
        let whole = pos.floor();
        let frac = pos - whole;
        let s0 = (whole as i64).rem_euclid(TABLE_SIZE as i64) as usize;

        let v0 = read_cycle(self.cycle(f0, mip), s0, frac, quality);
        let v1 = read_cycle(self.cycle(f0 + 1, mip), s0, frac, quality);
        lerp(v0, v1, frame_frac)
    }
}

/// Pick the mip level for a fundamental at `freq` Hz.
#[inline]
pub fn mip_for(freq: f32, sample_rate: f32, quality: Quality) -> usize {
    let fc = freq / sample_rate * TABLE_SIZE as f32;
    let mut mip = MIP_LEVELS - 1;
    let mut threshold = 32.0;
    for level in 0..MIP_LEVELS - 1 {
        if fc < threshold {
            mip = level;
            break;
        }
        threshold *= 2.0;
    }
    if quality == Quality::Low {
        mip = (mip + 2).min(MIP_LEVELS - 1);
    }
    mip
}

#[inline]
fn read_cycle(cycle: &[f32], s0: usize, frac: f32, quality: Quality) -> f32 {
    let s1 = (s0 + 1) % TABLE_SIZE;
    if quality == Quality::High {
        let sm1 = (s0 + TABLE_SIZE - 1) % TABLE_SIZE;
        let sp2 = (s1 + 1) % TABLE_SIZE;
        cubic_hermite(cycle[sm1], cycle[s0], cycle[s1], cycle[sp2], frac)
    } else {
        lerp(cycle[s0], cycle[s1], frac)
    }
}

/// Fill levels 1.. of one frame from its level 0.
fn build_mips(frame: &mut [f32], prefix: &mut [f64]) {
    // Prefix sums over three back-to-back copies of the cycle so any window
    // that wraps either edge is a single subtraction.
    prefix[0] = 0.0;
    for i in 0..3 * TABLE_SIZE {
        prefix[i + 1] = prefix[i] + frame[i % TABLE_SIZE] as f64;
    }

    for mip in 1..MIP_LEVELS {
        let window = 1usize << mip;
        let half = window / 2;
        let dst = mip * TABLE_SIZE;
        for s in 0..TABLE_SIZE {
            let start = TABLE_SIZE + s - half;
            let sum = prefix[start + window] - prefix[start];
            frame[dst + s] = (sum / window as f64) as f32;
        }
    }
}

fn normalize_peak(samples: &mut [f32]) {
    let peak = samples
        .iter()
        .fold(PEAK_FLOOR, |peak, &v| peak.max(v.abs()));
    for v in samples.iter_mut() {
        *v /= peak;
    }
}

fn resample_to_frames(raw: &[f32]) -> Vec<f32> {
    let want = TABLE_SIZE * NUM_FRAMES;
    let last = raw.len() - 1;
    let mut out = vec![0.0; want];

    if raw.len() >= want {
        let per_frame = raw.len() / NUM_FRAMES;
        for (frame, cycle) in out.chunks_exact_mut(TABLE_SIZE).enumerate() {
            let frame_start = frame * per_frame;
            for (s, v) in cycle.iter_mut().enumerate() {
                let t = s as f32 / TABLE_SIZE as f32 * (per_frame - 1) as f32;
                let i0 = (frame_start + t as usize).min(last);
                let i1 = (i0 + 1).min(last);
                *v = lerp(raw[i0], raw[i1], t.fract());
            }
        }
    } else {
        for (i, v) in out.iter_mut().enumerate() {
            let t = i as f32 / want as f32 * raw.len() as f32;
            let i0 = (t as usize).min(last);
            let i1 = (i0 + 1).min(last);
            *v = lerp(raw[i0], raw[i1], t - i0 as f32);
        }
    }
    out
}

fn harmonic_morph(phase: f32, t: f32) -> f32 {
    let sine = (TAU * phase).sin();
    let saw = 2.0 * phase - 1.0;
    let square = if phase < 0.5 { 1.0 } else { -1.0 };
    let mut rich = sine;
    for h in 2..=8 {
        rich += 0.3 / h as f32 * (TAU * phase * h as f32).sin();
    }
    rich /= 1.8;
    sine * (1.0 - t * 0.7) + saw * (t * 0.4) + square * (t * 0.3) + rich * (t * 0.5)
}

fn formant_morph(phase: f32, t: f32) -> f32 {
    let sine = (TAU * phase).sin();
    let w1 = 0.5 * (1.0 + (t * TAU).sin());
    let w2 = 0.3 * (1.0 + (t * 3.0 * std::f32::consts::PI).cos());
    let mut formant = 0.0;
    for h in 1..=12 {
        let hf = h as f32;
        let w = 1.0 / hf + w1 / (hf + 2.0) + w2 / (hf + 4.0);
        formant += w * (TAU * phase * hf).sin();
    }
    formant /= 2.5;
    sine * (1.0 - t) + formant * t
}
