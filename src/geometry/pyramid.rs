//! Symmetric scale pyramid.

use crate::util::{SiamTrackError, SiamTrackResult};

/// Scale factors `step^k` for `k` in a zero-centred integer range.
///
/// With an odd scale count the exponents are `-(n-1)/2 ..= (n-1)/2`, so they
/// sum to zero and the centre factor is exactly `1.0`.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalePyramid {
    exponents: Vec<i32>,
    factors: Vec<f64>,
}

impl ScalePyramid {
    /// Builds a pyramid of `num_scales` levels spaced by `scale_step`.
    pub fn new(num_scales: usize, scale_step: f32) -> SiamTrackResult<Self> {
        if num_scales == 0 || num_scales % 2 == 0 {
            return Err(SiamTrackError::InvalidConfig {
                reason: "num_scales must be odd",
            });
        }
        if !scale_step.is_finite() || scale_step <= 0.0 {
            return Err(SiamTrackError::InvalidConfig {
                reason: "scale_step must be positive and finite",
            });
        }
        let half = (num_scales / 2) as i32;
        let exponents: Vec<i32> = (-half..=half).collect();
        let step = f64::from(scale_step);
        let factors = exponents.iter().map(|&k| step.powi(k)).collect();
        Ok(Self { exponents, factors })
    }

    pub fn len(&self) -> usize {
        self.exponents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exponents.is_empty()
    }

    /// Index of the unscaled level.
    pub fn center_index(&self) -> usize {
        self.exponents.len() / 2
    }

    pub fn exponents(&self) -> &[i32] {
        &self.exponents
    }

    /// Scale factors in pyramid order, smallest first for `scale_step > 1`.
    pub fn factors(&self) -> impl Iterator<Item = f64> + '_ {
        self.factors.iter().copied()
    }
}
