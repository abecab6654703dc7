//! siamtrack is the inference core of a Siamese single-target tracker.
//!
//! Given a frame and the target's previous box it crops a scale pyramid of
//! mean-padded search patches, embeds them with a caller-provided network,
//! cross-correlates the embeddings with an exemplar template and upsamples the
//! response for sub-pixel localization. Per-scale work can run in parallel
//! via the `rayon` feature; the `simd` feature vectorizes correlation.

pub mod config;
pub mod crop;
pub mod detect;
pub mod embed;
pub mod geometry;
pub mod image;
pub mod kernel;
pub mod template;
pub mod tensor;
pub(crate) mod trace;
pub mod tracker;
pub mod upsample;
pub mod util;

#[cfg(feature = "image-io")]
pub use crate::image::io;

pub use config::TrackerConfig;
pub use crop::{center_crop, crop_and_resize};
pub use detect::{correlate, ResponseCalibration};
pub use embed::{
    EmbedStage, Embeddings, EmbeddingNetwork, ParamScope, PooledEmbedding, SharedEmbedding,
};
pub use geometry::{BoundingBox, CropBox, ScalePyramid, SearchGeometry};
pub use crate::image::{FrameView, OwnedFrame};
pub use template::{Template, TemplateStore};
pub use tensor::{ResponseMap, ResponsePeak, Tensor4};
pub use tracker::{Exemplar, SiameseTracker, StepOutput};
pub use upsample::{upsample, UpsampleMethod, MAX_UPSAMPLE_FACTOR};
pub use util::{SiamTrackError, SiamTrackResult};
