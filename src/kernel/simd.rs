//! SIMD row dot product using the `wide` crate.
//!
//! Eight lanes are accumulated with `f32x8`; the tail shorter than a lane
//! group falls back to scalar accumulation.

use crate::kernel::CorrelationKernel;
use wide::f32x8;

const LANES: usize = 8;

#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

/// `f32x8` accumulation kernel.
pub struct SimdKernel;

impl CorrelationKernel for SimdKernel {
    #[inline]
    fn dot(a: &[f32], b: &[f32]) -> f32 {
        let len = a.len().min(b.len());
        let simd_end = len / LANES * LANES;
        let mut acc = f32x8::ZERO;
        let mut i = 0;
        while i < simd_end {
            acc += load_f32x8(&a[i..]) * load_f32x8(&b[i..]);
            i += LANES;
        }
        let mut tail = 0.0f32;
        while i < len {
            tail += a[i] * b[i];
            i += 1;
        }
        acc.to_array().iter().sum::<f32>() + tail
    }
}

#[cfg(test)]
mod tests {
    use super::SimdKernel;
    use crate::kernel::scalar::ScalarKernel;
    use crate::kernel::CorrelationKernel;

    #[test]
    fn simd_dot_matches_scalar() {
        let a: Vec<f32> = (0..37).map(|v| (v as f32 * 0.37).sin()).collect();
        let b: Vec<f32> = (0..37).map(|v| (v as f32 * 0.11).cos()).collect();
        let s = ScalarKernel::dot(&a, &b);
        let v = SimdKernel::dot(&a, &b);
        assert!((s - v).abs() < 1e-4, "{s} vs {v}");
    }
}
