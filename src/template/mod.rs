//! Exemplar template storage.
//!
//! A `Template` is the exemplar track feature replicated into every scale slot,
//! shaped `[num_scales, h, w, c]`. It is reference counted so that a step can
//! hold on to the template it read while the owner replaces it; replacement
//! swaps the whole value and never mutates a published tensor.

use crate::tensor::Tensor4;
use crate::util::{SiamTrackError, SiamTrackResult};
use std::sync::Arc;

/// Immutable multi-scale exemplar template.
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    features: Arc<Tensor4>,
}

impl Template {
    /// Replicates batch item `index` of `track` into `num_scales` slots.
    pub fn replicate(track: &Tensor4, index: usize, num_scales: usize) -> SiamTrackResult<Self> {
        let center = track.item(index).ok_or(SiamTrackError::ShapeMismatch {
            context: "exemplar scale",
            expected: vec![index + 1],
            got: vec![track.batch()],
        })?;
        let slots = vec![center; num_scales];
        let stacked = Tensor4::stack(&slots, [track.height(), track.width(), track.channels()])?;
        Ok(Self {
            features: Arc::new(stacked),
        })
    }

    /// Wraps an existing `[num_scales, h, w, c]` tensor.
    pub fn from_tensor(features: Tensor4) -> Self {
        Self {
            features: Arc::new(features),
        }
    }

    /// Returns the template tensor.
    pub fn features(&self) -> &Tensor4 {
        &self.features
    }

    pub fn shape(&self) -> [usize; 4] {
        self.features.shape()
    }
}

/// Holds the single live template of one tracked target.
#[derive(Debug, Default)]
pub struct TemplateStore {
    current: Option<Template>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored template, returning the previous one.
    pub fn replace(&mut self, template: Template) -> Option<Template> {
        self.current.replace(template)
    }

    /// Returns the stored template, if any.
    pub fn current(&self) -> Option<&Template> {
        self.current.as_ref()
    }

    /// Drops the stored template.
    pub fn clear(&mut self) -> Option<Template> {
        self.current.take()
    }
}
