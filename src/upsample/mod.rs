//! Corner-aligned response upsampling.
//!
//! Output sample `i` of an axis with `n` input and `m = n * factor` output
//! samples reads input coordinate `i * (n - 1) / (m - 1)`, so the first and
//! last samples of both grids coincide and corner values are copied exactly.
//! Interpolation is written relative to a reference tap, which keeps flat
//! regions bit-exact.

use std::fmt;
use std::str::FromStr;

use crate::tensor::ResponseMap;
use crate::trace::{stage_event, stage_span};
use crate::util::math::{cubic_weights, lerp};
use crate::util::{SiamTrackError, SiamTrackResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Keys kernel parameter used by the legacy TensorFlow bicubic resize.
const CUBIC_A: f32 = -0.75;

/// Largest accepted upsampling factor.
pub const MAX_UPSAMPLE_FACTOR: usize = 64;

/// Interpolation kernel for response upsampling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsampleMethod {
    Bilinear,
    Bicubic,
}

impl UpsampleMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsampleMethod::Bilinear => "bilinear",
            UpsampleMethod::Bicubic => "bicubic",
        }
    }
}

impl fmt::Display for UpsampleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpsampleMethod {
    type Err = SiamTrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bilinear" => Ok(UpsampleMethod::Bilinear),
            "bicubic" => Ok(UpsampleMethod::Bicubic),
            _ => Err(SiamTrackError::UnsupportedUpsampleMethod {
                name: s.to_string(),
            }),
        }
    }
}

/// Source taps and weights of one output sample along one axis.
#[derive(Clone, Copy, Debug)]
struct Taps {
    idx: [usize; 4],
    weight: [f32; 4],
    /// Position of the reference tap within `idx`.
    anchor: usize,
}

/// Upsamples every scale of `response` by `factor` along both spatial axes.
pub fn upsample(
    response: &ResponseMap,
    factor: usize,
    method: UpsampleMethod,
) -> SiamTrackResult<ResponseMap> {
    if factor == 0 {
        return Err(SiamTrackError::InvalidConfig {
            reason: "upsample_factor must be at least 1",
        });
    }
    if factor > MAX_UPSAMPLE_FACTOR {
        return Err(SiamTrackError::InvalidConfig {
            reason: "upsample_factor exceeds MAX_UPSAMPLE_FACTOR",
        });
    }
    let [scales, in_h, in_w] = response.shape();
    let out_h = in_h.checked_mul(factor).ok_or(SiamTrackError::InvalidDimensions {
        height: in_h,
        width: in_w,
        channels: 1,
    })?;
    let out_w = in_w.checked_mul(factor).ok_or(SiamTrackError::InvalidDimensions {
        height: in_h,
        width: in_w,
        channels: 1,
    })?;
    let _span = stage_span!("upsample", method = method.as_str(), factor = factor).entered();

    let ys = axis_taps(in_h, out_h, method);
    let xs = axis_taps(in_w, out_w, method);
    let plane = out_h * out_w;
    let mut data = vec![0.0f32; scales * plane];

    let resize_one = |(s, dst): (usize, &mut [f32])| {
        if let Some(src) = response.scale(s) {
            resize_plane(src, in_w, &ys, &xs, dst);
        }
    };

    #[cfg(feature = "rayon")]
    {
        data.par_chunks_mut(plane).enumerate().for_each(resize_one);
    }
    #[cfg(not(feature = "rayon"))]
    {
        data.chunks_mut(plane).enumerate().for_each(resize_one);
    }

    stage_event!("upsample", out_h = out_h, out_w = out_w);
    ResponseMap::from_vec(data, scales, out_h, out_w)
}

fn axis_taps(n_in: usize, n_out: usize, method: UpsampleMethod) -> Vec<Taps> {
    let last = n_in - 1;
    (0..n_out)
        .map(|i| {
            let src = if n_out > 1 {
                (i * last) as f64 / (n_out - 1) as f64
            } else {
                0.0
            };
            let base = (src.floor() as usize).min(last);
            let t = (src - base as f64) as f32;
            match method {
                UpsampleMethod::Bilinear => Taps {
                    idx: [base, (base + 1).min(last), base, base],
                    weight: [1.0 - t, t, 0.0, 0.0],
                    anchor: 0,
                },
                UpsampleMethod::Bicubic => Taps {
                    idx: [
                        base.saturating_sub(1),
                        base,
                        (base + 1).min(last),
                        (base + 2).min(last),
                    ],
                    weight: cubic_weights(t, CUBIC_A),
                    anchor: 1,
                },
            }
        })
        .collect()
}

/// Evaluates `ref + sum_k w_k * (v_k - ref)` over the taps.
#[inline]
fn interpolate(taps: &Taps, value: impl Fn(usize) -> f32) -> f32 {
    let reference = value(taps.idx[taps.anchor]);
    if taps.anchor == 0 && taps.weight[2] == 0.0 && taps.weight[3] == 0.0 {
        return lerp(reference, value(taps.idx[1]), taps.weight[1]);
    }
    let mut acc = 0.0f32;
    for k in 0..4 {
        if k != taps.anchor {
            acc += taps.weight[k] * (value(taps.idx[k]) - reference);
        }
    }
    reference + acc
}

fn resize_plane(src: &[f32], in_w: usize, ys: &[Taps], xs: &[Taps], dst: &mut [f32]) {
    let out_w = xs.len();
    // horizontal pass over every source row, then the vertical pass
    let in_h = src.len() / in_w;
    let mut rows = vec![0.0f32; in_h * out_w];
    for y in 0..in_h {
        let row = &src[y * in_w..(y + 1) * in_w];
        for (ox, tx) in xs.iter().enumerate() {
            rows[y * out_w + ox] = interpolate(tx, |i| row[i]);
        }
    }
    for (oy, ty) in ys.iter().enumerate() {
        let out_row = &mut dst[oy * out_w..(oy + 1) * out_w];
        for (ox, v) in out_row.iter_mut().enumerate() {
            *v = interpolate(ty, |i| rows[i * out_w + ox]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{upsample, UpsampleMethod, MAX_UPSAMPLE_FACTOR};
    use crate::tensor::ResponseMap;
    use crate::util::SiamTrackError;

    fn sample_map() -> ResponseMap {
        let data: Vec<f32> = (0..2 * 4 * 5)
            .map(|v| ((v * 37) % 11) as f32 * 0.3 - 1.0)
            .collect();
        ResponseMap::from_vec(data, 2, 4, 5).unwrap()
    }

    #[test]
    fn method_names_parse() {
        assert_eq!("bilinear".parse::<UpsampleMethod>(), Ok(UpsampleMethod::Bilinear));
        assert_eq!("BICUBIC".parse::<UpsampleMethod>(), Ok(UpsampleMethod::Bicubic));
        assert_eq!(
            "lanczos".parse::<UpsampleMethod>(),
            Err(SiamTrackError::UnsupportedUpsampleMethod {
                name: "lanczos".to_string()
            })
        );
    }

    #[test]
    fn corners_are_preserved() {
        let map = sample_map();
        for method in [UpsampleMethod::Bilinear, UpsampleMethod::Bicubic] {
            let up = upsample(&map, 16, method).unwrap();
            assert_eq!(up.shape(), [2, 64, 80]);
            for s in 0..2 {
                assert_eq!(up.corners(s), map.corners(s), "{method}");
            }
        }
    }

    #[test]
    fn unit_factor_is_identity() {
        // factor 1 maps every output sample onto its input sample
        let data = vec![1.0f32, 4.0, 2.0, -3.0, 0.5, 7.0, 2.0, 2.0, 9.0];
        let map = ResponseMap::from_vec(data.clone(), 1, 3, 3).unwrap();
        let up = upsample(&map, 1, UpsampleMethod::Bilinear).unwrap();
        assert_eq!(up.as_slice(), data.as_slice());
    }

    #[test]
    fn bilinear_midpoint_is_average() {
        let map = ResponseMap::from_vec(vec![0.0, 3.0, 6.0, 9.0], 1, 2, 2).unwrap();
        let up = upsample(&map, 2, UpsampleMethod::Bilinear).unwrap();
        // src coordinate of output 1 is 1/3
        let v = up.get(0, 0, 1).unwrap();
        assert!((v - 1.0).abs() < 1e-6, "{v}");
        assert_eq!(up.get(0, 3, 3), Some(9.0));
    }

    #[test]
    fn flat_response_stays_flat() {
        let value = 0.1f32 + 0.2;
        let map = ResponseMap::from_vec(vec![value; 17 * 17], 1, 17, 17).unwrap();
        for method in [UpsampleMethod::Bilinear, UpsampleMethod::Bicubic] {
            let up = upsample(&map, 16, method).unwrap();
            assert!(up.as_slice().iter().all(|&v| v == value));
        }
    }

    #[test]
    fn bicubic_uses_keys_weights_with_clamped_taps() {
        let map = ResponseMap::from_vec(vec![0.0, 1.0, 6.0, 3.0], 1, 1, 4).unwrap();
        let up = upsample(&map, 3, UpsampleMethod::Bicubic).unwrap();
        assert_eq!(up.shape(), [1, 3, 12]);
        // output 1 reads src 3/11 with taps [0, 0, 1, 2]
        let border = up.get(0, 0, 1).unwrap();
        assert!((border - 0.047_332_83).abs() < 1e-5, "{border}");
        // output 5 reads src 15/11 with taps [0, 1, 2, 3]
        let interior = up.get(0, 0, 5).unwrap();
        assert!((interior - 3.039_068_4).abs() < 1e-5, "{interior}");
        // rows are replicated from the single source row
        assert_eq!(up.get(0, 2, 5), Some(interior));
    }

    #[test]
    fn oversized_factor_is_rejected() {
        let map = ResponseMap::from_vec(vec![0.0; 17 * 17], 1, 17, 17).unwrap();
        assert!(matches!(
            upsample(&map, MAX_UPSAMPLE_FACTOR + 1, UpsampleMethod::Bilinear),
            Err(SiamTrackError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn zero_factor_is_rejected() {
        assert!(upsample(&sample_map(), 0, UpsampleMethod::Bicubic).is_err());
    }
}
