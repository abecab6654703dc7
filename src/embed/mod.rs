//! Embedding network interface.
//!
//! The tracker treats the feature extractor as an external, deterministic
//! function from an image batch to a spatial "track" feature map and a
//! re-identification descriptor. Exemplar and search patches go through the
//! same parameters; `SharedEmbedding` makes the first call create them and
//! every later call reuse them, instead of relying on ambient scope lookup.

mod pooled;

pub use pooled::PooledEmbedding;

use crate::tensor::Tensor4;
use crate::util::{SiamTrackError, SiamTrackResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Which patch kind is being embedded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbedStage {
    /// Exemplar patch taken at initialization.
    Exemplar,
    /// Multi-scale search patches of a tracking step.
    Search,
}

/// Whether a call creates the network parameters or reuses existing ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamScope {
    Create,
    Reuse,
}

/// Output of one embedding call.
#[derive(Clone, Debug, PartialEq)]
pub struct Embeddings {
    /// Spatial feature map used for correlation, `[batch, h, w, c]`.
    pub track: Tensor4,
    /// Appearance descriptor for external re-identification, `[batch, rh, rw, rc]`.
    pub reid: Tensor4,
}

/// Image batch to feature map transform.
///
/// Implementations must be deterministic for fixed parameters and must keep
/// the batch dimension of their input.
pub trait EmbeddingNetwork {
    fn embed(
        &self,
        images: &Tensor4,
        stage: EmbedStage,
        params: ParamScope,
    ) -> SiamTrackResult<Embeddings>;
}

impl<N: EmbeddingNetwork + ?Sized> EmbeddingNetwork for Box<N> {
    fn embed(
        &self,
        images: &Tensor4,
        stage: EmbedStage,
        params: ParamScope,
    ) -> SiamTrackResult<Embeddings> {
        (**self).embed(images, stage, params)
    }
}

impl<N: EmbeddingNetwork + ?Sized> EmbeddingNetwork for Arc<N> {
    fn embed(
        &self,
        images: &Tensor4,
        stage: EmbedStage,
        params: ParamScope,
    ) -> SiamTrackResult<Embeddings> {
        (**self).embed(images, stage, params)
    }
}

/// One network instance shared by the exemplar and search branches.
///
/// The first `embed` call is issued with `ParamScope::Create`, all later calls
/// with `ParamScope::Reuse`. Output batch sizes are checked against the input.
pub struct SharedEmbedding<N> {
    network: N,
    created: AtomicBool,
}

impl<N: EmbeddingNetwork> SharedEmbedding<N> {
    pub fn new(network: N) -> Self {
        Self {
            network,
            created: AtomicBool::new(false),
        }
    }

    /// Returns the wrapped network.
    pub fn network(&self) -> &N {
        &self.network
    }

    /// Whether parameters have been created by a previous call.
    pub fn is_created(&self) -> bool {
        self.created.load(Ordering::Acquire)
    }

    /// Embeds `images`, choosing the parameter scope automatically.
    pub fn embed(&self, images: &Tensor4, stage: EmbedStage) -> SiamTrackResult<Embeddings> {
        let params = if self.created.swap(true, Ordering::AcqRel) {
            ParamScope::Reuse
        } else {
            ParamScope::Create
        };
        let out = self.network.embed(images, stage, params)?;
        if out.track.batch() != images.batch() || out.reid.batch() != images.batch() {
            return Err(SiamTrackError::ShapeMismatch {
                context: "embedding batch",
                expected: vec![images.batch()],
                got: vec![out.track.batch(), out.reid.batch()],
            });
        }
        Ok(out)
    }
}
