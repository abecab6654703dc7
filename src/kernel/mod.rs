//! Valid-mode cross-correlation kernels.
//!
//! A search map `E` (`H x W x C`) is correlated with a template `T`
//! (`h x w x C`) at every placement where `T` fits entirely inside `E`:
//!
//! `R[y, x] = sum_{ty, tx, c} E[y + ty, x + tx, c] * T[ty, tx, c]`
//!
//! In HWC layout one template row and the matching search row segment are
//! both contiguous runs of `w * C` values, so every kernel reduces to a row
//! dot product accumulated over `h` rows.

use crate::util::{SiamTrackError, SiamTrackResult};

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

/// Borrowed single HWC feature map.
#[derive(Clone, Copy, Debug)]
pub struct MapView<'a> {
    data: &'a [f32],
    height: usize,
    width: usize,
    channels: usize,
}

impl<'a> MapView<'a> {
    pub fn new(
        data: &'a [f32],
        height: usize,
        width: usize,
        channels: usize,
    ) -> SiamTrackResult<Self> {
        let needed = height * width * channels;
        if data.len() != needed {
            return Err(SiamTrackError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            height,
            width,
            channels,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Row `y` as `width * channels` values.
    #[inline]
    pub fn row(&self, y: usize) -> &'a [f32] {
        let len = self.width * self.channels;
        &self.data[y * len..(y + 1) * len]
    }
}

/// Correlation kernel over contiguous row segments.
pub trait CorrelationKernel {
    /// Dot product of two equally long slices.
    fn dot(a: &[f32], b: &[f32]) -> f32;

    /// Raw correlation at placement `(x, y)`; the caller guarantees the template fits.
    #[inline]
    fn score_at(search: MapView<'_>, template: MapView<'_>, x: usize, y: usize) -> f32 {
        let span = template.width * template.channels;
        let offset = x * search.channels;
        let mut acc = 0.0f32;
        for ty in 0..template.height {
            let s = &search.row(y + ty)[offset..offset + span];
            acc += Self::dot(s, template.row(ty));
        }
        acc
    }

    /// Writes the full `(H - h + 1) x (W - w + 1)` response into `out`.
    fn correlate_valid(
        search: MapView<'_>,
        template: MapView<'_>,
        out: &mut [f32],
    ) -> SiamTrackResult<()> {
        let (out_h, out_w) = valid_size(search, template)?;
        if out.len() != out_h * out_w {
            return Err(SiamTrackError::BufferTooSmall {
                needed: out_h * out_w,
                got: out.len(),
            });
        }
        for y in 0..out_h {
            for x in 0..out_w {
                out[y * out_w + x] = Self::score_at(search, template, x, y);
            }
        }
        Ok(())
    }
}

/// Output size of a valid correlation, checking channels and spatial fit.
pub fn valid_size(search: MapView<'_>, template: MapView<'_>) -> SiamTrackResult<(usize, usize)> {
    if search.channels != template.channels {
        return Err(SiamTrackError::ShapeMismatch {
            context: "correlation channels",
            expected: vec![search.channels],
            got: vec![template.channels],
        });
    }
    if template.height > search.height || template.width > search.width {
        return Err(SiamTrackError::InvalidGeometry {
            reason: "template larger than search embedding",
        });
    }
    Ok((
        search.height - template.height + 1,
        search.width - template.width + 1,
    ))
}
