//! Parameter-free reference embedding with AlexNet receptive-field geometry.
//!
//! Every layer is a `k x k` box average with stride `s`, applied in the same
//! kernel/stride sequence as the five-convolution AlexNet used by SiamFC
//! (conv 11/2, pool 3/2, conv 5/1, pool 3/2, conv 3/1 three times). A 127px
//! exemplar becomes a 6x6 map and a 255px search patch a 22x22 map, so the
//! correlation response is 17x17 exactly as with the trained network.
//! Channels pass through unchanged.

use crate::embed::{EmbedStage, Embeddings, EmbeddingNetwork, ParamScope};
use crate::tensor::Tensor4;
use crate::util::{SiamTrackError, SiamTrackResult};

/// `(kernel, stride)` per layer.
const ALEXNET_LAYERS: [(usize, usize); 7] = [(11, 2), (3, 2), (5, 1), (3, 2), (3, 1), (3, 1), (3, 1)];

/// Deterministic box-pooling stand-in for a trained backbone.
#[derive(Clone, Debug)]
pub struct PooledEmbedding {
    layers: Vec<(usize, usize)>,
}

impl Default for PooledEmbedding {
    fn default() -> Self {
        Self {
            layers: ALEXNET_LAYERS.to_vec(),
        }
    }
}

impl PooledEmbedding {
    /// AlexNet-shaped pooling chain.
    pub fn alexnet() -> Self {
        Self::default()
    }

    /// Custom `(kernel, stride)` chain; kernels and strides must be positive.
    pub fn with_layers(layers: Vec<(usize, usize)>) -> SiamTrackResult<Self> {
        if layers.iter().any(|&(k, s)| k == 0 || s == 0) {
            return Err(SiamTrackError::InvalidConfig {
                reason: "pooling kernel and stride must be positive",
            });
        }
        Ok(Self { layers })
    }

    /// Spatial output size for a square input, `None` if the input is too small.
    pub fn output_size(&self, input: usize) -> Option<usize> {
        self.layers.iter().try_fold(input, |n, &(k, s)| {
            if n < k {
                None
            } else {
                Some((n - k) / s + 1)
            }
        })
    }

    fn track_features(&self, images: &Tensor4) -> SiamTrackResult<Tensor4> {
        let [batch, height, width, channels] = images.shape();
        let mut out_h = height;
        let mut out_w = width;
        for &(k, s) in &self.layers {
            if out_h < k || out_w < k {
                return Err(SiamTrackError::ShapeMismatch {
                    context: "embedding receptive field",
                    expected: vec![k, k],
                    got: vec![out_h, out_w],
                });
            }
            out_h = (out_h - k) / s + 1;
            out_w = (out_w - k) / s + 1;
        }

        let mut data = Vec::with_capacity(batch * out_h * out_w * channels);
        for item in images.items() {
            let mut cur = item.to_vec();
            let (mut h, mut w) = (height, width);
            for &(k, s) in &self.layers {
                let (next, nh, nw) = box_pool(&cur, h, w, channels, k, s);
                cur = next;
                h = nh;
                w = nw;
            }
            data.extend_from_slice(&cur);
        }
        Tensor4::from_vec(data, [batch, out_h, out_w, channels])
    }
}

impl EmbeddingNetwork for PooledEmbedding {
    fn embed(
        &self,
        images: &Tensor4,
        _stage: EmbedStage,
        _params: ParamScope,
    ) -> SiamTrackResult<Embeddings> {
        let track = self.track_features(images)?;
        let reid = global_average(&track)?;
        Ok(Embeddings { track, reid })
    }
}

/// Separable `k x k` box average with stride `s` over one HWC map.
fn box_pool(
    src: &[f32],
    height: usize,
    width: usize,
    channels: usize,
    k: usize,
    s: usize,
) -> (Vec<f32>, usize, usize) {
    let out_h = (height - k) / s + 1;
    let out_w = (width - k) / s + 1;
    let inv = 1.0 / k as f32;

    let mut horiz = vec![0.0f32; height * out_w * channels];
    for y in 0..height {
        let row = &src[y * width * channels..(y + 1) * width * channels];
        for ox in 0..out_w {
            let dst = &mut horiz[(y * out_w + ox) * channels..(y * out_w + ox + 1) * channels];
            for tap in 0..k {
                let px = &row[(ox * s + tap) * channels..(ox * s + tap + 1) * channels];
                for (d, &v) in dst.iter_mut().zip(px) {
                    *d += v;
                }
            }
            dst.iter_mut().for_each(|d| *d *= inv);
        }
    }

    let row_len = out_w * channels;
    let mut out = vec![0.0f32; out_h * row_len];
    for oy in 0..out_h {
        let dst = &mut out[oy * row_len..(oy + 1) * row_len];
        for tap in 0..k {
            let y = oy * s + tap;
            for (d, &v) in dst.iter_mut().zip(&horiz[y * row_len..(y + 1) * row_len]) {
                *d += v;
            }
        }
        dst.iter_mut().for_each(|d| *d *= inv);
    }
    (out, out_h, out_w)
}

/// Per-channel spatial mean, `[batch, 1, 1, c]`.
fn global_average(track: &Tensor4) -> SiamTrackResult<Tensor4> {
    let channels = track.channels();
    let count = (track.height() * track.width()) as f64;
    let mut data = Vec::with_capacity(track.batch() * channels);
    for item in track.items() {
        let mut sums = vec![0.0f64; channels];
        for px in item.chunks_exact(channels) {
            for (sum, &v) in sums.iter_mut().zip(px) {
                *sum += f64::from(v);
            }
        }
        data.extend(sums.into_iter().map(|s| (s / count) as f32));
    }
    Tensor4::from_vec(data, [track.batch(), 1, 1, channels])
}

#[cfg(test)]
mod tests {
    use super::PooledEmbedding;
    use crate::embed::{EmbedStage, EmbeddingNetwork, ParamScope};
    use crate::tensor::Tensor4;

    #[test]
    fn alexnet_geometry_matches_siamfc_sizes() {
        let net = PooledEmbedding::alexnet();
        assert_eq!(net.output_size(127), Some(6));
        assert_eq!(net.output_size(255), Some(22));
        assert_eq!(net.output_size(10), None);
    }

    #[test]
    fn embedding_shapes_follow_input_batch() {
        let net = PooledEmbedding::alexnet();
        let images = Tensor4::zeros([3, 127, 127, 3]).unwrap();
        let out = net
            .embed(&images, EmbedStage::Exemplar, ParamScope::Create)
            .unwrap();
        assert_eq!(out.track.shape(), [3, 6, 6, 3]);
        assert_eq!(out.reid.shape(), [3, 1, 1, 3]);
    }

    #[test]
    fn box_pool_averages_windows() {
        let net = PooledEmbedding::with_layers(vec![(2, 2)]).unwrap();
        let data: Vec<f32> = (0..16).map(|v| v as f32).collect();
        let images = Tensor4::from_vec(data, [1, 4, 4, 1]).unwrap();
        let out = net
            .embed(&images, EmbedStage::Search, ParamScope::Reuse)
            .unwrap();
        assert_eq!(out.track.as_slice(), &[2.5, 4.5, 10.5, 12.5]);
        assert_eq!(out.reid.as_slice(), &[7.5]);
    }

    #[test]
    fn constant_input_gives_constant_features() {
        let net = PooledEmbedding::alexnet();
        let images = Tensor4::from_vec(vec![0.3; 255 * 255], [1, 255, 255, 1]).unwrap();
        let out = net
            .embed(&images, EmbedStage::Search, ParamScope::Reuse)
            .unwrap();
        let first = out.track.as_slice()[0];
        assert!(out.track.as_slice().iter().all(|&v| v == first));
    }

    #[test]
    fn too_small_input_is_rejected() {
        let net = PooledEmbedding::alexnet();
        let images = Tensor4::zeros([1, 20, 20, 1]).unwrap();
        assert!(net
            .embed(&images, EmbedStage::Search, ParamScope::Reuse)
            .is_err());
    }
}
