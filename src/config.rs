//! Tracker configuration.

use crate::upsample::{UpsampleMethod, MAX_UPSAMPLE_FACTOR};
use crate::util::{SiamTrackError, SiamTrackResult};

/// Configuration for the Siamese tracking pipeline.
///
/// Sizes are in pixels of the canonical exemplar and search patches. The
/// defaults follow the usual SiamFC setup: a 127px exemplar, a 255px search
/// region and three scales 3.75% apart.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackerConfig {
    /// Side of the square exemplar patch.
    pub z_image_size: usize,
    /// Side of the square search patch.
    pub x_image_size: usize,
    /// Number of search scales; must be odd so the pyramid has a centre.
    pub num_scales: usize,
    /// Ratio between neighbouring scales.
    pub scale_step: f32,
    /// Context padding as a fraction of the box perimeter half-sum.
    pub context_amount: f32,
    /// Interpolation used to upsample the response.
    pub upsample_method: UpsampleMethod,
    /// Integer upsampling factor of the response surface.
    pub upsample_factor: usize,
    /// Multiplicative response calibration.
    pub response_scale: f32,
    /// Additive response calibration.
    pub response_bias: f32,
    /// Diagnostic verbosity; above zero `step` also returns the search crops.
    pub log_level: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            z_image_size: 127,
            x_image_size: 255,
            num_scales: 3,
            scale_step: 1.0375,
            context_amount: 0.5,
            upsample_method: UpsampleMethod::Bicubic,
            upsample_factor: 16,
            response_scale: 1e-3,
            response_bias: 0.0,
            log_level: 0,
        }
    }
}

impl TrackerConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> SiamTrackResult<()> {
        if self.z_image_size == 0 {
            return Err(SiamTrackError::InvalidConfig {
                reason: "z_image_size must be positive",
            });
        }
        if self.x_image_size < self.z_image_size {
            return Err(SiamTrackError::InvalidConfig {
                reason: "x_image_size must be at least z_image_size",
            });
        }
        if self.x_image_size < 2 {
            return Err(SiamTrackError::InvalidConfig {
                reason: "x_image_size must be at least 2",
            });
        }
        if self.num_scales == 0 || self.num_scales % 2 == 0 {
            return Err(SiamTrackError::InvalidConfig {
                reason: "num_scales must be odd",
            });
        }
        if !self.scale_step.is_finite() || self.scale_step <= 0.0 {
            return Err(SiamTrackError::InvalidConfig {
                reason: "scale_step must be positive and finite",
            });
        }
        if !self.context_amount.is_finite() || self.context_amount < 0.0 {
            return Err(SiamTrackError::InvalidConfig {
                reason: "context_amount must be non-negative and finite",
            });
        }
        if self.upsample_factor == 0 {
            return Err(SiamTrackError::InvalidConfig {
                reason: "upsample_factor must be at least 1",
            });
        }
        if self.upsample_factor > MAX_UPSAMPLE_FACTOR {
            return Err(SiamTrackError::InvalidConfig {
                reason: "upsample_factor exceeds MAX_UPSAMPLE_FACTOR",
            });
        }
        if !self.response_scale.is_finite() || !self.response_bias.is_finite() {
            return Err(SiamTrackError::InvalidConfig {
                reason: "response calibration must be finite",
            });
        }
        Ok(())
    }

    /// Whether `step` should keep the search crops by default.
    pub fn keep_search_images_default(&self) -> bool {
        self.log_level > 0
    }
}

#[cfg(test)]
mod tests {
    use super::TrackerConfig;
    use crate::upsample::MAX_UPSAMPLE_FACTOR;
    use crate::util::SiamTrackError;

    #[test]
    fn default_config_is_valid() {
        let cfg = TrackerConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(!cfg.keep_search_images_default());
    }

    #[test]
    fn even_scale_count_is_rejected() {
        let cfg = TrackerConfig {
            num_scales: 4,
            ..TrackerConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(SiamTrackError::InvalidConfig {
                reason: "num_scales must be odd"
            })
        );
    }

    #[test]
    fn search_smaller_than_exemplar_is_rejected() {
        let cfg = TrackerConfig {
            x_image_size: 100,
            ..TrackerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn log_level_enables_search_images() {
        let cfg = TrackerConfig {
            log_level: 1,
            ..TrackerConfig::default()
        };
        assert!(cfg.keep_search_images_default());
    }

    #[test]
    fn oversized_upsample_factor_is_rejected() {
        let cfg = TrackerConfig {
            upsample_factor: MAX_UPSAMPLE_FACTOR + 1,
            ..TrackerConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(SiamTrackError::InvalidConfig { .. })
        ));
        let cfg = TrackerConfig {
            upsample_factor: MAX_UPSAMPLE_FACTOR,
            ..TrackerConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
