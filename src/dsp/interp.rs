//! Fractional-index reads.

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Catmull-Rom style cubic Hermite through `y1`..`y2`, using `y0` and `y3`
/// for the tangents. `t` in [0, 1).
#[inline]
pub fn cubic_hermite(y0: f32, y1: f32, y2: f32, y3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    let m0 = (y2 - y0) * 0.5;
    let m1 = (y3 - y1) * 0.5;
    (2.0 * t3 - 3.0 * t2 + 1.0) * y1
        + (t3 - 2.0 * t2 + t) * m0
        + (-2.0 * t3 + 3.0 * t2) * y2
        + (t3 - t2) * m1
}

/// Linear read at a fractional position, wrapping both the position and the
/// upper neighbour around the buffer.
#[inline]
pub fn read_linear(buf: &[f32], pos: f32) -> f32 {
    let len = buf.len();
    if len == 0 {
        return 0.0;
    }
    let size = len as f32;
    let mut p = pos;
    while p < 0.0 {
        p += size;
    }
    while p >= size {
        p -= size;
    }

    let i0 = (p as usize).min(len - 1);
    let i1 = if i0 + 1 >= len { 0 } else { i0 + 1 };
    let frac = p - i0 as f32;
    buf[i0] * (1.0 - frac) + buf[i1] * frac
}
