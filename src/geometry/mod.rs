//! Search-region geometry: scale pyramid, crop boxes and scale factors.
//!
//! The target box is grown by a context margin and squared to an area
//! preserving extent `s_z`; the search extent `s_x` adds the padding needed to
//! map the exemplar size onto the search size at the same scale. Each pyramid
//! factor then yields one normalized crop box around the target centre and the
//! resize factor from frame pixels to search-patch pixels. All intermediate
//! values are computed in `f64`.

mod pyramid;

pub use pyramid::ScalePyramid;

use crate::config::TrackerConfig;
use crate::trace::stage_event;
use crate::util::math::get_center;
use crate::util::{SiamTrackError, SiamTrackResult};

/// Target box as centre and size, in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub center_y: f32,
    pub center_x: f32,
    pub height: f32,
    pub width: f32,
}

impl BoundingBox {
    pub fn new(center_y: f32, center_x: f32, height: f32, width: f32) -> Self {
        Self {
            center_y,
            center_x,
            height,
            width,
        }
    }

    /// Builds a box from `[center_y, center_x, height, width]`.
    pub fn from_array(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    /// Rejects non-finite coordinates and non-positive sizes.
    pub fn validate(&self) -> SiamTrackResult<()> {
        if !(self.center_y.is_finite()
            && self.center_x.is_finite()
            && self.height.is_finite()
            && self.width.is_finite())
        {
            return Err(SiamTrackError::InvalidGeometry {
                reason: "bounding box has non-finite values",
            });
        }
        if self.height <= 0.0 || self.width <= 0.0 {
            return Err(SiamTrackError::InvalidGeometry {
                reason: "target size must be positive",
            });
        }
        Ok(())
    }
}

/// Normalized crop rectangle; `(0, 0)` and `(1, 1)` are the first and last pixel centres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropBox {
    pub top: f32,
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
}

/// Resolved search geometry for one frame and target box.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchGeometry {
    /// Exemplar extent in frame pixels, context included.
    pub base_s_z: f32,
    /// Frame-to-exemplar resize factor.
    pub base_scale_z: f32,
    /// Unscaled search extent in frame pixels.
    pub base_s_x: f32,
    /// Frame-to-search resize factor for the centre scale.
    pub base_scale_x: f32,
    /// One crop box per pyramid level.
    pub boxes: Vec<CropBox>,
    /// One resize factor per pyramid level, `base_scale_x / factor`.
    pub scale_factors: Vec<f32>,
}

impl SearchGeometry {
    /// Resolves crop boxes and scale factors for `bbox` in a frame of the given size.
    pub fn resolve(
        bbox: &BoundingBox,
        frame_height: usize,
        frame_width: usize,
        cfg: &TrackerConfig,
    ) -> SiamTrackResult<Self> {
        bbox.validate()?;
        if frame_height < 2 || frame_width < 2 {
            return Err(SiamTrackError::InvalidGeometry {
                reason: "frame must be at least 2x2",
            });
        }
        let pyramid = ScalePyramid::new(cfg.num_scales, cfg.scale_step)?;

        let size_z = cfg.z_image_size as f64;
        let size_x = cfg.x_image_size as f64;
        let (h, w) = (f64::from(bbox.height), f64::from(bbox.width));
        let context = f64::from(cfg.context_amount) * (h + w);

        let base_s_z = ((h + context) * (w + context)).sqrt();
        let base_scale_z = size_z / base_s_z;
        let base_pad = ((size_x - size_z) / 2.0) / base_scale_z;
        let base_s_x = base_s_z + 2.0 * base_pad;
        let base_scale_x = size_x / base_s_x;
        if !(base_scale_z.is_finite() && base_scale_x.is_finite() && base_scale_x > 0.0) {
            return Err(SiamTrackError::InvalidGeometry {
                reason: "degenerate search extent",
            });
        }

        let denom_y = (frame_height - 1) as f64;
        let denom_x = (frame_width - 1) as f64;
        let (cy, cx) = (f64::from(bbox.center_y), f64::from(bbox.center_x));

        let mut boxes = Vec::with_capacity(pyramid.len());
        let mut scale_factors = Vec::with_capacity(pyramid.len());
        for factor in pyramid.factors() {
            let s_x = factor * base_s_x;
            let half = get_center(s_x);
            boxes.push(CropBox {
                top: ((cy - half) / denom_y) as f32,
                left: ((cx - half) / denom_x) as f32,
                bottom: ((cy + half) / denom_y) as f32,
                right: ((cx + half) / denom_x) as f32,
            });
            scale_factors.push((base_scale_x / factor) as f32);
        }

        stage_event!(
            "search_geometry",
            base_s_z = base_s_z,
            base_s_x = base_s_x,
            base_scale_x = base_scale_x,
        );

        Ok(Self {
            base_s_z: base_s_z as f32,
            base_scale_z: base_scale_z as f32,
            base_s_x: base_s_x as f32,
            base_scale_x: base_scale_x as f32,
            boxes,
            scale_factors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundingBox, SearchGeometry};
    use crate::config::TrackerConfig;
    use crate::util::SiamTrackError;

    #[test]
    fn base_values_match_reference_box() {
        let cfg = TrackerConfig::default();
        let bbox = BoundingBox::new(200.0, 200.0, 60.0, 120.0);
        let geo = SearchGeometry::resolve(&bbox, 400, 400, &cfg).unwrap();

        // context = 0.5 * 180 = 90; sqrt(150 * 210)
        let s_z = (150.0f64 * 210.0).sqrt();
        assert!((f64::from(geo.base_s_z) - s_z).abs() < 1e-3);
        let scale_z = 127.0 / s_z;
        let s_x = s_z + 2.0 * (64.0 / scale_z);
        assert!((f64::from(geo.base_s_x) - s_x).abs() < 1e-3);
        assert!((f64::from(geo.base_scale_x) - 255.0 / s_x).abs() < 1e-5);
        assert_eq!(geo.boxes.len(), 3);
        assert_eq!(geo.scale_factors.len(), 3);
    }

    #[test]
    fn center_box_is_symmetric_about_target() {
        let cfg = TrackerConfig::default();
        let bbox = BoundingBox::new(100.0, 150.0, 40.0, 40.0);
        let geo = SearchGeometry::resolve(&bbox, 201, 301, &cfg).unwrap();
        let b = geo.boxes[1];
        let mid_y = (b.top + b.bottom) / 2.0 * 200.0;
        let mid_x = (b.left + b.right) / 2.0 * 300.0;
        assert!((mid_y - 100.0).abs() < 1e-3);
        assert!((mid_x - 150.0).abs() < 1e-3);
        let extent = (b.bottom - b.top) * 200.0;
        assert!((extent - (geo.base_s_x - 1.0)).abs() < 1e-2);
    }

    #[test]
    fn scale_factors_follow_pyramid_order() {
        let cfg = TrackerConfig::default();
        let bbox = BoundingBox::new(50.0, 50.0, 20.0, 30.0);
        let geo = SearchGeometry::resolve(&bbox, 100, 100, &cfg).unwrap();
        assert_eq!(geo.scale_factors[1], geo.base_scale_x);
        assert!(geo.scale_factors[0] > geo.scale_factors[1]);
        assert!(geo.scale_factors[2] < geo.scale_factors[1]);
        assert!(geo.scale_factors.iter().all(|&s| s > 0.0));
        let small = geo.boxes[0].bottom - geo.boxes[0].top;
        let large = geo.boxes[2].bottom - geo.boxes[2].top;
        assert!(small < large);
    }

    #[test]
    fn boxes_may_leave_the_frame() {
        let cfg = TrackerConfig::default();
        let bbox = BoundingBox::new(0.0, 0.0, 50.0, 50.0);
        let geo = SearchGeometry::resolve(&bbox, 64, 64, &cfg).unwrap();
        assert!(geo.boxes.iter().all(|b| b.top < 0.0 && b.left < 0.0));
    }

    #[test]
    fn degenerate_targets_are_rejected() {
        let cfg = TrackerConfig::default();
        for bbox in [
            BoundingBox::new(10.0, 10.0, 0.0, 5.0),
            BoundingBox::new(10.0, 10.0, 5.0, -1.0),
            BoundingBox::new(f32::NAN, 10.0, 5.0, 5.0),
        ] {
            let err = SearchGeometry::resolve(&bbox, 64, 64, &cfg).unwrap_err();
            assert!(matches!(err, SiamTrackError::InvalidGeometry { .. }));
        }
        let ok = BoundingBox::new(10.0, 10.0, 5.0, 5.0);
        assert!(SearchGeometry::resolve(&ok, 1, 64, &cfg).is_err());
    }
}
