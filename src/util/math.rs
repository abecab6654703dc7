//! Small numeric helpers shared by geometry, cropping and interpolation.

/// Returns the centre coordinate of a span of `n` samples, `(n - 1) / 2`.
pub(crate) fn get_center(n: f64) -> f64 {
    (n - 1.0) / 2.0
}

/// Linear interpolation written as `a + (b - a) * t`.
///
/// Equal endpoints return `a` bit-exactly for any `t`.
#[inline]
pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Keys cubic convolution weights for fractional offset `t` in `[0, 1)`.
///
/// Taps are ordered `[-1, 0, 1, 2]` relative to the floor sample.
pub(crate) fn cubic_weights(t: f32, a: f32) -> [f32; 4] {
    let near = |x: f32| ((a + 2.0) * x - (a + 3.0)) * x * x + 1.0;
    let far = |x: f32| ((a * x - 5.0 * a) * x + 8.0 * a) * x - 4.0 * a;
    [far(t + 1.0), near(t), near(1.0 - t), far(2.0 - t)]
}
