//! Scalar reference kernel.

use crate::kernel::CorrelationKernel;

/// Straightforward sequential accumulation.
pub struct ScalarKernel;

impl CorrelationKernel for ScalarKernel {
    #[inline]
    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }
}
