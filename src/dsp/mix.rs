//! Signal mixing, panning and level safety.

/*
Signal Mixing
=============

Vocabulary
----------

  crossfade     Transitioning between two signals using complementary weights.
                As one fades out, the other fades in.

  wet/dry       Effect mixing.
                  dry = original signal (unprocessed)
                  wet = effect signal (processed)

  pan           Position in the stereo field, -1 (left) to +1 (right).

  soft clip     A smooth saturating curve that keeps sums of many voices
                inside the port range without the hard corners of a clamp.


Linear Crossfade
----------------

    output = (A × (1 - t)) + (B × t)

The weights always sum to 1.0, so two full-scale inputs cannot sum past
full scale. Every crossfade in the crate is linear: loop seams in the
looper, the exit fade back to the live input, the dry/wet knobs of the
effects, and the frame blend in the wavetable oscillator.

    Level
      1.0 ──────╲      ╱──────
                 ╲    ╱
      0.5         ╲  ╱  ← loudness dip for uncorrelated signals
                   ╲╱
      0.0 ─────────────────────
          0.0     0.5     1.0


Linear Pan
----------

Two conventions appear in the modules:

    split:   L = (1 - pan) × 0.5    R = (1 + pan) × 0.5
    unity:   L = (1 - pan)          R = (1 + pan)

The split form is used when voices are summed into a stereo pair and must
not exceed a single voice at the centre. The unity form is used when the
caller divides by the voice count itself.


Soft Clip
---------

    y = x / (1 + |x|)

Near zero the curve has unit slope; large sums bend smoothly towards ±1
without ever reaching it. No transcendental call, so it is cheap enough to
run on every output sample.
*/

/// Linear crossfade between `a` and `b`. `t` is clamped to [0, 1].
#[inline]
pub fn crossfade(a: f32, b: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    a * (1.0 - t) + b * t
}

/// Blend dry and wet samples using linear crossfade.
///
/// output = (dry × (1-mix)) + (wet × mix)
#[inline]
pub fn blend_dry_wet(dry: f32, wet: f32, mix: f32) -> f32 {
    dry * (1.0 - mix) + wet * mix
}

/// Split pan gains, `(L, R)` summing to 1.
#[inline]
pub fn pan_split(pan: f32) -> (f32, f32) {
    let pan = pan.clamp(-1.0, 1.0);
    ((1.0 - pan) * 0.5, (1.0 + pan) * 0.5)
}

/// Unity pan gains, `(L, R)` summing to 2.
#[inline]
pub fn pan_unity(pan: f32) -> (f32, f32) {
    let pan = pan.clamp(-1.0, 1.0);
    (1.0 - pan, 1.0 + pan)
}

#[inline]
pub fn soft_clip(x: f32) -> f32 {
    x / (1.0 + x.abs())
}

/// Sum one stereo frame into an accumulator.
#[inline]
pub fn accumulate(acc: &mut (f32, f32), sample: f32, gains: (f32, f32)) {
    acc.0 += sample * gains.0;
    acc.1 += sample * gains.1;
}

/// Read a stereo input pair. A lone patched side feeds both channels;
/// nothing patched reads silence.
#[inline]
pub fn stereo_input(left: Option<f32>, right: Option<f32>) -> (f32, f32) {
    match (left, right) {
        (Some(l), Some(r)) => (l, r),
        (Some(v), None) | (None, Some(v)) => (v, v),
        (None, None) => (0.0, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossfade_endpoints() {
        assert_eq!(crossfade(1.0, 0.25, 0.0), 1.0);
        assert_eq!(crossfade(1.0, 0.25, 1.0), 0.25);
        assert_eq!(crossfade(1.0, 0.0, 0.5), 0.5);
    }

    #[test]
    fn test_crossfade_clamped() {
        assert_eq!(crossfade(1.0, 0.0, 2.0), 0.0);
        assert_eq!(crossfade(1.0, 0.0, -1.0), 1.0);
    }

    #[test]
    fn test_weights_sum_to_one() {
        assert_eq!(crossfade(1.0, 1.0, 0.3), 1.0);
    }

    #[test]
    fn test_blend_dry_wet() {
        assert_eq!(blend_dry_wet(1.0, 0.5, 0.0), 1.0);
        assert_eq!(blend_dry_wet(1.0, 0.5, 1.0), 0.5);
        assert_eq!(blend_dry_wet(1.0, 0.0, 0.5), 0.5);
    }

    #[test]
    fn test_pan_laws() {
        assert_eq!(pan_split(0.0), (0.5, 0.5));
        assert_eq!(pan_split(-1.0), (1.0, 0.0));
        assert_eq!(pan_unity(1.0), (0.0, 2.0));
        assert_eq!(pan_unity(5.0), (0.0, 2.0));
    }

    #[test]
    fn test_soft_clip_bounded() {
        assert!(soft_clip(100.0) < 1.0);
        assert!(soft_clip(-100.0) > -1.0);
        assert_eq!(soft_clip(1.0), 0.5);
        assert!((soft_clip(0.001) - 0.001).abs() < 1e-5);
    }

    #[test]
    fn test_stereo_input_mono_copy() {
        assert_eq!(stereo_input(Some(0.3), None), (0.3, 0.3));
        assert_eq!(stereo_input(None, Some(0.3)), (0.3, 0.3));
        assert_eq!(stereo_input(Some(0.3), Some(-0.1)), (0.3, -0.1));
        assert_eq!(stereo_input(None, None), (0.0, 0.0));
    }
}
