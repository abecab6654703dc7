//! Mean-padded crop-and-resize of search patches.
//!
//! Each crop box is sampled on a regular `size x size` grid spanning the box
//! corners, with bilinear interpolation between the four neighbouring pixel
//! centres. The frame's per-channel mean is subtracted before sampling and
//! added back afterwards; grid points outside the frame sample zero, so they
//! come out as the mean of the same frame.

use crate::geometry::CropBox;
use crate::image::FrameView;
use crate::tensor::Tensor4;
use crate::trace::{stage_event, stage_span};
use crate::util::math::{get_center, lerp};
use crate::util::{SiamTrackError, SiamTrackResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Crops every box from `frame` and resizes it to `size x size`.
///
/// Returns a `[boxes.len(), size, size, channels]` tensor.
pub fn crop_and_resize(
    frame: FrameView<'_>,
    boxes: &[CropBox],
    size: usize,
) -> SiamTrackResult<Tensor4> {
    let _span = stage_span!("crop_and_resize", boxes = boxes.len(), size = size).entered();
    if size == 0 {
        return Err(SiamTrackError::InvalidConfig {
            reason: "crop size must be positive",
        });
    }
    if boxes.iter().any(|b| {
        !(b.top.is_finite() && b.left.is_finite() && b.bottom.is_finite() && b.right.is_finite())
    }) {
        return Err(SiamTrackError::InvalidGeometry {
            reason: "crop box has non-finite corners",
        });
    }

    let mean = frame.channel_mean();
    let mut out = Tensor4::zeros([boxes.len(), size, size, frame.channels()])?;
    let item_len = out.item_len();

    #[cfg(feature = "rayon")]
    {
        out.as_mut_slice()
            .par_chunks_mut(item_len)
            .zip(boxes.par_iter())
            .for_each(|(dst, crop)| resample_box(frame, &mean, crop, size, dst));
    }
    #[cfg(not(feature = "rayon"))]
    {
        for (dst, crop) in out.as_mut_slice().chunks_exact_mut(item_len).zip(boxes) {
            resample_box(frame, &mean, crop, size, dst);
        }
    }

    stage_event!("crop_and_resize", scales = boxes.len(), channels = mean.len());
    Ok(out)
}

fn resample_box(frame: FrameView<'_>, mean: &[f32], crop: &CropBox, size: usize, dst: &mut [f32]) {
    let channels = frame.channels();
    let max_y = (frame.height() - 1) as f64;
    let max_x = (frame.width() - 1) as f64;
    let ys = sample_coords(crop.top, crop.bottom, max_y, size);
    let xs = sample_coords(crop.left, crop.right, max_x, size);

    for (oy, &in_y) in ys.iter().enumerate() {
        let row_start = oy * size * channels;
        let dst_row = &mut dst[row_start..row_start + size * channels];
        if !(0.0..=max_y).contains(&in_y) {
            fill_mean(dst_row, mean);
            continue;
        }
        let y0 = in_y.floor() as usize;
        let y1 = in_y.ceil() as usize;
        let fy = (in_y - y0 as f64) as f32;
        let (Some(row0), Some(row1)) = (frame.row(y0), frame.row(y1)) else {
            fill_mean(dst_row, mean);
            continue;
        };

        for (ox, &in_x) in xs.iter().enumerate() {
            let px = &mut dst_row[ox * channels..(ox + 1) * channels];
            if !(0.0..=max_x).contains(&in_x) {
                px.copy_from_slice(mean);
                continue;
            }
            let x0 = in_x.floor() as usize;
            let x1 = in_x.ceil() as usize;
            let fx = (in_x - x0 as f64) as f32;
            for c in 0..channels {
                let m = mean[c];
                let tl = row0[x0 * channels + c] - m;
                let tr = row0[x1 * channels + c] - m;
                let bl = row1[x0 * channels + c] - m;
                let br = row1[x1 * channels + c] - m;
                let top = lerp(tl, tr, fx);
                let bottom = lerp(bl, br, fx);
                px[c] = lerp(top, bottom, fy) + m;
            }
        }
    }
}

/// Source coordinates of a `size`-point grid spanning `[lo, hi]` in normalized units.
fn sample_coords(lo: f32, hi: f32, max: f64, size: usize) -> Vec<f64> {
    let (lo, hi) = (f64::from(lo), f64::from(hi));
    if size == 1 {
        return vec![0.5 * (lo + hi) * max];
    }
    let step = (hi - lo) * max / (size - 1) as f64;
    (0..size).map(|i| lo * max + i as f64 * step).collect()
}

fn fill_mean(dst: &mut [f32], mean: &[f32]) {
    for px in dst.chunks_exact_mut(mean.len()) {
        px.copy_from_slice(mean);
    }
}

/// Extracts a centred `size x size` patch from batch item `index`.
///
/// The patch's top-left corner is `center(H) - center(size)` rounded half to
/// even, which places the exemplar region at the middle of an unscaled search
/// patch.
pub fn center_crop(batch: &Tensor4, index: usize, size: usize) -> SiamTrackResult<Tensor4> {
    let [n, height, width, channels] = batch.shape();
    if size == 0 || size > height || size > width {
        return Err(SiamTrackError::ShapeMismatch {
            context: "center_crop",
            expected: vec![size, size],
            got: vec![height, width],
        });
    }
    let src = batch.item(index).ok_or(SiamTrackError::ShapeMismatch {
        context: "center_crop index",
        expected: vec![index + 1],
        got: vec![n],
    })?;

    let top = (get_center(height as f64) - get_center(size as f64)).round_ties_even() as usize;
    let left = (get_center(width as f64) - get_center(size as f64)).round_ties_even() as usize;
    let row_len = width * channels;
    let mut data = Vec::with_capacity(size * size * channels);
    for y in top..top + size {
        let start = y * row_len + left * channels;
        data.extend_from_slice(&src[start..start + size * channels]);
    }
    Tensor4::from_vec(data, [1, size, size, channels])
}
