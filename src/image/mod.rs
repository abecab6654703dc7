//! Frame views and owned frame buffers.
//!
//! `FrameView` is a borrowed HWC raster of `f32` channels. Rows are stored
//! back to back; `row(y)` returns the `width * channels` values of one row.
//! Pixel values are not normalized, so 8-bit frames keep their `0..=255`
//! range after conversion.

use crate::util::{SiamTrackError, SiamTrackResult};

#[cfg(feature = "image-io")]
pub mod io;

/// Borrowed HWC frame.
#[derive(Copy, Clone, Debug)]
pub struct FrameView<'a> {
    data: &'a [f32],
    height: usize,
    width: usize,
    channels: usize,
}

impl<'a> FrameView<'a> {
    /// Creates a view over a contiguous HWC buffer.
    pub fn new(
        data: &'a [f32],
        height: usize,
        width: usize,
        channels: usize,
    ) -> SiamTrackResult<Self> {
        let needed = required_len(height, width, channels)?;
        if data.len() < needed {
            return Err(SiamTrackError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data: &data[..needed],
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

    /// Returns the backing slice.
    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }

    /// Returns row `y` as `width * channels` interleaved values.
    pub fn row(&self, y: usize) -> Option<&'a [f32]> {
        if y >= self.height {
            return None;
        }
        let len = self.width * self.channels;
        self.data.get(y * len..(y + 1) * len)
    }

    /// Returns the channel values of pixel `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> Option<&'a [f32]> {
        if x >= self.width {
            return None;
        }
        let c = self.channels;
        self.row(y).and_then(|row| row.get(x * c..(x + 1) * c))
    }

    /// Per-channel mean of the whole frame, accumulated in `f64`.
    pub fn channel_mean(&self) -> Vec<f32> {
        let mut sums = vec![0.0f64; self.channels];
        for px in self.data.chunks_exact(self.channels) {
            for (sum, &v) in sums.iter_mut().zip(px) {
                *sum += f64::from(v);
            }
        }
        let count = (self.height * self.width) as f64;
        sums.into_iter().map(|s| (s / count) as f32).collect()
    }
}

/// Owned contiguous HWC frame.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedFrame {
    data: Vec<f32>,
    height: usize,
    width: usize,
    channels: usize,
}

impl OwnedFrame {
    /// Takes ownership of a contiguous HWC buffer.
    pub fn new(
        data: Vec<f32>,
        height: usize,
        width: usize,
        channels: usize,
    ) -> SiamTrackResult<Self> {
        let needed = required_len(height, width, channels)?;
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

    /// Creates a frame where every pixel equals `value`.
    pub fn filled(height: usize, width: usize, value: &[f32]) -> SiamTrackResult<Self> {
        let channels = value.len();
        let needed = required_len(height, width, channels)?;
        let data = value.iter().copied().cycle().take(needed).collect();
        Self::new(data, height, width, channels)
    }

    /// Returns a borrowed view of the frame.
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            data: &self.data,
            height: self.height,
            width: self.width,
            channels: self.channels,
        }
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

    /// Returns the backing buffer.
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

fn required_len(height: usize, width: usize, channels: usize) -> SiamTrackResult<usize> {
    if height == 0 || width == 0 || channels == 0 {
        return Err(SiamTrackError::InvalidDimensions {
            height,
            width,
            channels,
        });
    }
    height
        .checked_mul(width)
        .and_then(|v| v.checked_mul(channels))
        .ok_or(SiamTrackError::InvalidDimensions {
            height,
            width,
            channels,
        })
}

#[cfg(test)]
mod tests {
    use super::{FrameView, OwnedFrame};
    use crate::util::SiamTrackError;

    #[test]
    fn view_rejects_short_buffer() {
        let data = [0.0f32; 11];
        let err = FrameView::new(&data, 2, 2, 3).unwrap_err();
        assert_eq!(err, SiamTrackError::BufferTooSmall { needed: 12, got: 11 });
    }

    #[test]
    fn rows_and_pixels_are_interleaved() {
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let view = FrameView::new(&data, 2, 2, 3).unwrap();
        assert_eq!(view.row(1).unwrap(), &[6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
        assert_eq!(view.pixel(1, 0).unwrap(), &[3.0, 4.0, 5.0]);
        assert!(view.pixel(2, 0).is_none());
    }

    #[test]
    fn channel_mean_is_per_channel() {
        let data = [0.0f32, 10.0, 2.0, 20.0, 4.0, 30.0, 6.0, 40.0];
        let view = FrameView::new(&data, 2, 2, 2).unwrap();
        assert_eq!(view.channel_mean(), vec![3.0, 25.0]);
    }

    #[test]
    fn filled_frame_is_constant() {
        let frame = OwnedFrame::filled(3, 4, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(frame.data().len(), 36);
        assert_eq!(frame.view().pixel(3, 2).unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(frame.view().channel_mean(), vec![1.0, 2.0, 3.0]);
    }
}
