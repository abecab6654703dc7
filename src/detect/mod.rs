//! Per-scale cross-correlation detection.
//!
//! Scale slot `s` of the search embeddings is correlated with scale slot `s`
//! of the templates; there is no broadcasting between different scale counts.
//! Raw scores are mapped through a fixed affine calibration.

use crate::kernel::{CorrelationKernel, MapView};
use crate::tensor::{ResponseMap, Tensor4};
use crate::trace::{stage_event, stage_span};
use crate::util::{SiamTrackError, SiamTrackResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(not(feature = "simd"))]
use crate::kernel::scalar::ScalarKernel as ActiveKernel;
#[cfg(feature = "simd")]
use crate::kernel::simd::SimdKernel as ActiveKernel;

/// Fixed affine response adjustment, `scale * raw + bias`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResponseCalibration {
    pub scale: f32,
    pub bias: f32,
}

impl Default for ResponseCalibration {
    fn default() -> Self {
        Self {
            scale: 1.0,
            bias: 0.0,
        }
    }
}

impl ResponseCalibration {
    #[inline]
    pub fn apply(&self, raw: f32) -> f32 {
        self.scale * raw + self.bias
    }
}

/// Correlates each search embedding with its template and calibrates the result.
///
/// `search` is `[S, H, W, C]` and `templates` is `[S, h, w, C]`; the output is
/// `[S, H - h + 1, W - w + 1]`.
pub fn correlate(
    search: &Tensor4,
    templates: &Tensor4,
    calibration: ResponseCalibration,
) -> SiamTrackResult<ResponseMap> {
    let [scales, height, width, channels] = search.shape();
    let [t_scales, t_height, t_width, t_channels] = templates.shape();
    if scales != t_scales || channels != t_channels {
        return Err(SiamTrackError::ShapeMismatch {
            context: "frame templates",
            expected: vec![scales, t_height, t_width, channels],
            got: templates.shape().to_vec(),
        });
    }
    let _span = stage_span!("correlate", scales = scales).entered();

    if t_height > height || t_width > width {
        return Err(SiamTrackError::InvalidGeometry {
            reason: "template larger than search embedding",
        });
    }
    let (out_h, out_w) = (height - t_height + 1, width - t_width + 1);
    let plane = out_h * out_w;
    let mut data = vec![0.0f32; scales * plane];

    let correlate_one = |(idx, out): (usize, &mut [f32])| -> SiamTrackResult<()> {
        let s = item_view(search, idx)?;
        let t = item_view(templates, idx)?;
        ActiveKernel::correlate_valid(s, t, out)?;
        for v in out.iter_mut() {
            *v = calibration.apply(*v);
        }
        Ok(())
    };

    #[cfg(feature = "rayon")]
    {
        data.par_chunks_mut(plane)
            .enumerate()
            .try_for_each(correlate_one)?;
    }
    #[cfg(not(feature = "rayon"))]
    {
        data.chunks_mut(plane)
            .enumerate()
            .try_for_each(correlate_one)?;
    }

    stage_event!("correlate", scales = scales, out_h = out_h, out_w = out_w);
    ResponseMap::from_vec(data, scales, out_h, out_w)
}

fn item_view(t: &Tensor4, idx: usize) -> SiamTrackResult<MapView<'_>> {
    let item = t.item(idx).ok_or(SiamTrackError::ShapeMismatch {
        context: "scale index",
        expected: vec![idx + 1],
        got: vec![t.batch()],
    })?;
    MapView::new(item, t.height(), t.width(), t.channels())
}

#[cfg(test)]
mod tests {
    use super::{correlate, ResponseCalibration};
    use crate::tensor::Tensor4;
    use crate::util::SiamTrackError;

    fn ramp(shape: [usize; 4], mul: f32) -> Tensor4 {
        let len: usize = shape.iter().product();
        let data = (0..len).map(|v| ((v % 7) as f32 - 3.0) * mul).collect();
        Tensor4::from_vec(data, shape).unwrap()
    }

    #[test]
    fn output_is_valid_size_per_scale() {
        let search = ramp([3, 22, 22, 4], 0.5);
        let templates = ramp([3, 6, 6, 4], 1.0);
        let map = correlate(&search, &templates, ResponseCalibration::default()).unwrap();
        assert_eq!(map.shape(), [3, 17, 17]);
    }

    #[test]
    fn calibration_is_affine() {
        let search = ramp([1, 5, 5, 2], 1.0);
        let templates = ramp([1, 2, 2, 2], 1.0);
        let raw = correlate(&search, &templates, ResponseCalibration::default()).unwrap();
        let cal = ResponseCalibration {
            scale: 1e-3,
            bias: 0.25,
        };
        let adjusted = correlate(&search, &templates, cal).unwrap();
        for (r, a) in raw.as_slice().iter().zip(adjusted.as_slice()) {
            assert!((a - (1e-3 * r + 0.25)).abs() < 1e-6);
        }
    }

    #[test]
    fn matching_patch_scores_highest() {
        // template cut from the search map at (row 3, col 4)
        let search = ramp([1, 10, 10, 1], 1.0);
        let mut tpl = Vec::new();
        for y in 3..6 {
            for x in 4..7 {
                tpl.push(search.get(0, y, x, 0).unwrap());
            }
        }
        let mut search_data = vec![0.0f32; 100];
        for y in 3..6 {
            for x in 4..7 {
                search_data[y * 10 + x] = search.get(0, y, x, 0).unwrap();
            }
        }
        let search = Tensor4::from_vec(search_data, [1, 10, 10, 1]).unwrap();
        let templates = Tensor4::from_vec(tpl, [1, 3, 3, 1]).unwrap();
        let map = correlate(&search, &templates, ResponseCalibration::default()).unwrap();
        let peak = map.peak().unwrap();
        assert_eq!((peak.y, peak.x), (3, 4));
    }

    #[test]
    fn scale_count_mismatch_is_reported() {
        let search = ramp([3, 8, 8, 2], 1.0);
        let templates = ramp([1, 3, 3, 2], 1.0);
        let err = correlate(&search, &templates, ResponseCalibration::default()).unwrap_err();
        assert!(matches!(err, SiamTrackError::ShapeMismatch { .. }));
    }

    #[test]
    fn channel_mismatch_is_reported() {
        let search = ramp([1, 8, 8, 2], 1.0);
        let templates = ramp([1, 3, 3, 3], 1.0);
        let err = correlate(&search, &templates, ResponseCalibration::default()).unwrap_err();
        assert!(matches!(err, SiamTrackError::ShapeMismatch { .. }));
    }

    #[test]
    fn oversized_template_is_invalid_geometry() {
        let search = ramp([1, 4, 4, 1], 1.0);
        let templates = ramp([1, 5, 3, 1], 1.0);
        let err = correlate(&search, &templates, ResponseCalibration::default()).unwrap_err();
        assert_eq!(
            err,
            SiamTrackError::InvalidGeometry {
                reason: "template larger than search embedding"
            }
        );
    }
}
