use std::f32::consts::PI;

/*
| type        | order | used by                              | cutoff given as      |
| ----------- | ----- | ------------------------------------ | -------------------- |
| RcFilter    | 1     | pad/chord tone, pluck timbres        | cutoff / sample rate |
| Biquad (LP) | 2     | granular tone, ambient tone          | cutoff / sample rate |

Both take NORMALIZED cutoffs (cycles per sample) so callers decide how to
derive them; neither clamps to Nyquist beyond what keeps it finite.
*/

/// One-pole lowpass from the bilinear transform of an RC network.
///
/// `y = (x + x[n-1] - y[n-1] * (1 - c)) / (1 + c)` with `c = 2 / (2π f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RcFilter {
    c: f32,
    x_state: f32,
    y_state: f32,
}

impl Default for RcFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl RcFilter {
    pub fn new() -> Self {
        Self {
            c: 0.0,
            x_state: 0.0,
            y_state: 0.0,
        }
    }

    /// Cutoff as a fraction of the sample rate.
    #[inline]
    pub fn set_cutoff(&mut self, normalized: f32) {
        let omega = 2.0 * PI * normalized.max(1e-6);
        self.c = 2.0 / omega;
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = (x + self.x_state - self.y_state * (1.0 - self.c)) / (1.0 + self.c);
        self.x_state = x;
        self.y_state = y;
        y
    }

    #[inline]
    pub fn lowpass(&self) -> f32 {
        self.y_state
    }

    #[inline]
    pub fn highpass(&self) -> f32 {
        self.x_state - self.y_state
    }

    pub fn reset(&mut self) {
        self.x_state = 0.0;
        self.y_state = 0.0;
    }
}

/// Second-order lowpass, transposed direct form II.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    s1: f32,
    s2: f32,
}

impl Default for Biquad {
    fn default() -> Self {
        let mut biquad = Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            s1: 0.0,
            s2: 0.0,
        };
        biquad.set_lowpass(0.25, std::f32::consts::FRAC_1_SQRT_2);
        biquad
    }
}

impl Biquad {
    pub fn lowpass(normalized: f32, q: f32) -> Self {
        let mut biquad = Self::default();
        biquad.set_lowpass(normalized, q);
        biquad
    }

    /// Recompute coefficients. Keeps the filter state so sweeps stay smooth.
    pub fn set_lowpass(&mut self, normalized: f32, q: f32) {
        let k = (PI * normalized.clamp(1e-6, 0.499)).tan();
        let q = q.max(1e-3);
        let k2 = k * k;
        let norm = 1.0 / (1.0 + k / q + k2);
        self.b0 = k2 * norm;
        self.b1 = 2.0 * self.b0;
        self.b2 = self.b0;
        self.a1 = 2.0 * (k2 - 1.0) * norm;
        self.a2 = (1.0 - k / q + k2) * norm;
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.s1;
        self.s1 = self.b1 * x - self.a1 * y + self.s2;
        self.s2 = self.b2 * x - self.a2 * y;
        y
    }

    pub fn reset(&mut self) {
        self.s1 = 0.0;
        self.s2 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_rms(filter: &mut dyn FnMut(f32) -> f32, freq: f32, sample_rate: f32) -> f32 {
        let n = (sample_rate * 0.5) as usize;
        let mut acc = 0.0;
        for i in 0..n {
            let x = (2.0 * PI * freq * i as f32 / sample_rate).sin();
            let y = filter(x);
            if i > n / 2 {
                acc += y * y;
            }
        }
        (acc / (n / 2) as f32).sqrt()
    }

    #[test]
    fn rc_passes_dc() {
        let mut rc = RcFilter::new();
        rc.set_cutoff(0.01);
        let mut y = 0.0;
        for _ in 0..5_000 {
            y = rc.process(1.0);
        }
        assert!((y - 1.0).abs() < 1e-3);
        assert!(rc.highpass().abs() < 1e-3);
    }

    #[test]
    fn rc_attenuates_above_cutoff() {
        let sr = 48_000.0;
        let mut rc = RcFilter::new();
        rc.set_cutoff(200.0 / sr);
        let low = sine_rms(&mut |x| rc.process(x), 50.0, sr);
        rc.reset();
        let high = sine_rms(&mut |x| rc.process(x), 5_000.0, sr);
        assert!(high < low * 0.2, "low {low}, high {high}");
    }

    #[test]
    fn biquad_attenuates_above_cutoff() {
        let sr = 48_000.0;
        let mut lp = Biquad::lowpass(500.0 / sr, 0.707);
        let low = sine_rms(&mut |x| lp.process(x), 100.0, sr);
        lp.reset();
        let high = sine_rms(&mut |x| lp.process(x), 8_000.0, sr);
        assert!(low > 0.6);
        assert!(high < 0.05, "high {high}");
    }

    #[test]
    fn biquad_stable_at_high_q() {
        let mut lp = Biquad::lowpass(0.45, 20.0);
        for i in 0..48_000 {
            let y = lp.process(if i % 97 == 0 { 1.0 } else { 0.0 });
            assert!(y.is_finite());
        }
    }
}
