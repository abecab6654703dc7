//! Per-scale response surfaces and deterministic peak lookup.

use std::cmp::Ordering;

use crate::util::{SiamTrackError, SiamTrackResult};

/// Owned `[num_scales, height, width]` score surface.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseMap {
    data: Vec<f32>,
    num_scales: usize,
    height: usize,
    width: usize,
}

/// Location and value of a response maximum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResponsePeak {
    /// Scale slot of the peak.
    pub scale: usize,
    /// Row of the peak.
    pub y: usize,
    /// Column of the peak.
    pub x: usize,
    /// Response value at the peak.
    pub score: f32,
}

impl ResponseMap {
    /// Wraps a contiguous NHW buffer.
    pub fn from_vec(
        data: Vec<f32>,
        num_scales: usize,
        height: usize,
        width: usize,
    ) -> SiamTrackResult<Self> {
        if height == 0 || width == 0 {
            return Err(SiamTrackError::InvalidDimensions {
                height,
                width,
                channels: 1,
            });
        }
        let needed = num_scales
            .checked_mul(height)
            .and_then(|v| v.checked_mul(width))
            .ok_or(SiamTrackError::InvalidDimensions {
                height,
                width,
                channels: 1,
            })?;
        if data.len() != needed {
            return Err(SiamTrackError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            num_scales,
            height,
            width,
        })
    }

    /// Returns `[num_scales, height, width]`.
    pub fn shape(&self) -> [usize; 3] {
        [self.num_scales, self.height, self.width]
    }

    pub fn num_scales(&self) -> usize {
        self.num_scales
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns the surface for one scale in row-major order.
    pub fn scale(&self, index: usize) -> Option<&[f32]> {
        if index >= self.num_scales {
            return None;
        }
        let len = self.height * self.width;
        self.data.get(index * len..(index + 1) * len)
    }

    /// Returns the value at `(scale, y, x)` if in bounds.
    pub fn get(&self, scale: usize, y: usize, x: usize) -> Option<f32> {
        if y >= self.height || x >= self.width {
            return None;
        }
        self.scale(scale)
            .and_then(|plane| plane.get(y * self.width + x))
            .copied()
    }

    /// Returns the four corner values of a scale as `[tl, tr, bl, br]`.
    pub fn corners(&self, scale: usize) -> Option<[f32; 4]> {
        let (h, w) = (self.height - 1, self.width - 1);
        Some([
            self.get(scale, 0, 0)?,
            self.get(scale, 0, w)?,
            self.get(scale, h, 0)?,
            self.get(scale, h, w)?,
        ])
    }

    /// Returns the maximum of one scale.
    ///
    /// Equal scores resolve to the location closest to the surface centre,
    /// then to the first in row-major order. NaN values are never selected
    /// unless the whole surface is NaN.
    pub fn peak_in(&self, scale: usize) -> Option<ResponsePeak> {
        let plane = self.scale(scale)?;
        let mut best: Option<ResponsePeak> = None;
        for (idx, &score) in plane.iter().enumerate() {
            let candidate = ResponsePeak {
                scale,
                y: idx / self.width,
                x: idx % self.width,
                score,
            };
            best = match best {
                Some(current) if self.peak_cmp(&candidate, &current) != Ordering::Greater => {
                    Some(current)
                }
                _ => Some(candidate),
            };
        }
        best
    }

    /// Returns the maximum over all scales.
    ///
    /// Ties across scales prefer the scale slot closest to the pyramid centre.
    pub fn peak(&self) -> Option<ResponsePeak> {
        let center = centered_offset(0, self.num_scales);
        (0..self.num_scales)
            .filter_map(|s| self.peak_in(s))
            .max_by(|a, b| {
                self.peak_cmp(a, b).then_with(|| {
                    let da = (2 * a.scale as i64 - center).abs();
                    let db = (2 * b.scale as i64 - center).abs();
                    db.cmp(&da).then_with(|| b.scale.cmp(&a.scale))
                })
            })
    }

    fn peak_cmp(&self, a: &ResponsePeak, b: &ResponsePeak) -> Ordering {
        let score = match (a.score.is_nan(), b.score.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => a.score.total_cmp(&b.score),
        };
        score
            .then_with(|| self.center_dist2(b).cmp(&self.center_dist2(a)))
            .then_with(|| (b.y, b.x).cmp(&(a.y, a.x)))
    }

    // Squared distance to the centre in doubled coordinates, which keeps
    // half-pixel centres of even-sized surfaces integral.
    fn center_dist2(&self, p: &ResponsePeak) -> i64 {
        let dy = 2 * p.y as i64 - centered_offset(0, self.height);
        let dx = 2 * p.x as i64 - centered_offset(0, self.width);
        dy * dy + dx * dx
    }
}

fn centered_offset(start: usize, len: usize) -> i64 {
    2 * start as i64 + len as i64 - 1
}
