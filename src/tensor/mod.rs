//! Owned dense tensors used between pipeline stages.
//!
//! `Tensor4` stores batches of feature maps or images in NHWC order: the
//! batch index is the scale slot, and channels are innermost so that one row
//! of a map is a single contiguous run of `width * channels` values.
//! `ResponseMap` stores one scalar surface per scale in NHW order.

mod response;

pub use response::{ResponseMap, ResponsePeak};

use crate::util::{SiamTrackError, SiamTrackResult};

/// Owned NHWC `f32` tensor.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor4 {
    data: Vec<f32>,
    shape: [usize; 4],
}

impl Tensor4 {
    /// Creates a tensor filled with zeros.
    pub fn zeros(shape: [usize; 4]) -> SiamTrackResult<Self> {
        let len = element_count(shape)?;
        Ok(Self {
            data: vec![0.0; len],
            shape,
        })
    }

    /// Wraps a contiguous NHWC buffer.
    pub fn from_vec(data: Vec<f32>, shape: [usize; 4]) -> SiamTrackResult<Self> {
        let needed = element_count(shape)?;
        if data.len() != needed {
            return Err(SiamTrackError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self { data, shape })
    }

    /// Stacks equally shaped HWC items into one batch.
    pub fn stack(items: &[&[f32]], item_shape: [usize; 3]) -> SiamTrackResult<Self> {
        let [height, width, channels] = item_shape;
        let item_len = element_count([1, height, width, channels])?;
        let mut data = Vec::with_capacity(item_len * items.len());
        for item in items {
            if item.len() != item_len {
                return Err(SiamTrackError::BufferTooSmall {
                    needed: item_len,
                    got: item.len(),
                });
            }
            data.extend_from_slice(item);
        }
        Self::from_vec(data, [items.len(), height, width, channels])
    }

    /// Returns `[batch, height, width, channels]`.
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn batch(&self) -> usize {
        self.shape[0]
    }

    pub fn height(&self) -> usize {
        self.shape[1]
    }

    pub fn width(&self) -> usize {
        self.shape[2]
    }

    pub fn channels(&self) -> usize {
        self.shape[3]
    }

    /// Number of values in one batch item.
    pub fn item_len(&self) -> usize {
        self.shape[1] * self.shape[2] * self.shape[3]
    }

    /// Returns the whole backing buffer.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns the whole backing buffer mutably.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Returns batch item `index` as a contiguous HWC slice.
    pub fn item(&self, index: usize) -> Option<&[f32]> {
        if index >= self.shape[0] {
            return None;
        }
        let len = self.item_len();
        self.data.get(index * len..(index + 1) * len)
    }

    /// Iterates over batch items in order.
    pub fn items(&self) -> impl Iterator<Item = &[f32]> {
        // item_len is non-zero: spatial and channel sizes are validated on construction
        self.data.chunks_exact(self.item_len())
    }

    /// Returns the value at `(n, y, x, c)` if in bounds.
    pub fn get(&self, n: usize, y: usize, x: usize, c: usize) -> Option<f32> {
        let [batch, height, width, channels] = self.shape;
        if n >= batch || y >= height || x >= width || c >= channels {
            return None;
        }
        self.data
            .get(((n * height + y) * width + x) * channels + c)
            .copied()
    }

    /// Returns `true` if every value is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

fn element_count(shape: [usize; 4]) -> SiamTrackResult<usize> {
    let [batch, height, width, channels] = shape;
    if height == 0 || width == 0 || channels == 0 {
        return Err(SiamTrackError::InvalidDimensions {
            height,
            width,
            channels,
        });
    }
    batch
        .checked_mul(height)
        .and_then(|v| v.checked_mul(width))
        .and_then(|v| v.checked_mul(channels))
        .ok_or(SiamTrackError::InvalidDimensions {
            height,
            width,
            channels,
        })
}
