//! Tracker entry points: exemplar initialization and per-frame stepping.
//!
//! `initialize` crops the exemplar around the target, embeds it and stores
//! the replicated template. `step` crops the multi-scale search region,
//! embeds it, correlates it with caller-supplied per-scale templates and
//! upsamples the response. The stored template is used for matching only
//! through `step_with_stored`, which leaves template refresh policies to the
//! caller.

use crate::config::TrackerConfig;
use crate::crop::{center_crop, crop_and_resize};
use crate::detect::{correlate, ResponseCalibration};
use crate::embed::{EmbedStage, EmbeddingNetwork, SharedEmbedding};
use crate::geometry::{BoundingBox, ScalePyramid, SearchGeometry};
use crate::image::FrameView;
use crate::template::{Template, TemplateStore};
use crate::tensor::{ResponseMap, Tensor4};
use crate::trace::{stage_event, stage_span};
use crate::upsample::upsample;
use crate::util::{SiamTrackError, SiamTrackResult};

/// Result of `initialize`.
#[derive(Clone, Debug)]
pub struct Exemplar {
    /// Stored `[num_scales, h, w, c]` template.
    pub template: Template,
    /// Re-identification descriptor of the exemplar, batch of one.
    pub reid: Tensor4,
    /// Per-scale resize factors of the initialization frame.
    pub scale_factors: Vec<f32>,
}

/// Result of `step`.
#[derive(Clone, Debug)]
pub struct StepOutput {
    /// Per-scale frame-to-search resize factors.
    pub scale_factors: Vec<f32>,
    /// Calibrated correlation response, `[num_scales, H, W]`.
    pub response: ResponseMap,
    /// Upsampled response, `[num_scales, H * f, W * f]`.
    pub response_up: ResponseMap,
    /// Search track embeddings.
    pub track: Tensor4,
    /// Search re-identification embeddings.
    pub reid: Tensor4,
    /// Search crops, present only when requested.
    pub search_images: Option<Tensor4>,
}

/// Siamese tracker for a single target.
pub struct SiameseTracker<N> {
    cfg: TrackerConfig,
    embedding: SharedEmbedding<N>,
    store: TemplateStore,
}

impl<N: EmbeddingNetwork> SiameseTracker<N> {
    /// Creates a tracker; configuration errors are reported here, not per call.
    pub fn new(network: N, cfg: TrackerConfig) -> SiamTrackResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            embedding: SharedEmbedding::new(network),
            store: TemplateStore::new(),
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.cfg
    }

    pub fn network(&self) -> &N {
        self.embedding.network()
    }

    /// Currently stored template, if `initialize` has run.
    pub fn template(&self) -> Option<&Template> {
        self.store.current()
    }

    /// Forgets the stored template.
    pub fn reset(&mut self) {
        self.store.clear();
    }

    /// Resolves the geometry and crops the multi-scale search patches.
    pub fn search_images(
        &self,
        frame: FrameView<'_>,
        bbox: &BoundingBox,
    ) -> SiamTrackResult<(SearchGeometry, Tensor4)> {
        let geometry = SearchGeometry::resolve(bbox, frame.height(), frame.width(), &self.cfg)?;
        let images = crop_and_resize(frame, &geometry.boxes, self.cfg.x_image_size)?;
        Ok((geometry, images))
    }

    /// Builds and stores the exemplar template from the target in `frame`.
    ///
    /// Calling it again replaces the previous template as a whole.
    pub fn initialize(
        &mut self,
        frame: FrameView<'_>,
        bbox: &BoundingBox,
    ) -> SiamTrackResult<Exemplar> {
        let _span = stage_span!("initialize").entered();
        let geometry = SearchGeometry::resolve(bbox, frame.height(), frame.width(), &self.cfg)?;
        let center = ScalePyramid::new(self.cfg.num_scales, self.cfg.scale_step)?.center_index();

        let search = crop_and_resize(
            frame,
            &geometry.boxes[center..=center],
            self.cfg.x_image_size,
        )?;
        let exemplar = center_crop(&search, 0, self.cfg.z_image_size)?;
        let embeds = self.embedding.embed(&exemplar, EmbedStage::Exemplar)?;

        let template = Template::replicate(&embeds.track, 0, self.cfg.num_scales)?;
        stage_event!(
            "initialize",
            template_h = template.shape()[1],
            template_w = template.shape()[2],
            channels = template.shape()[3],
        );
        self.store.replace(template.clone());

        Ok(Exemplar {
            template,
            reid: embeds.reid,
            scale_factors: geometry.scale_factors,
        })
    }

    /// Localizes the target in `frame` against `frame_templates`.
    ///
    /// `frame_templates` must be `[num_scales, h, w, c]` with the channel count
    /// of the search embeddings. `keep_search_images` only controls whether the
    /// crops are returned.
    pub fn step(
        &self,
        frame: FrameView<'_>,
        bbox: &BoundingBox,
        frame_templates: &Tensor4,
        keep_search_images: bool,
    ) -> SiamTrackResult<StepOutput> {
        let _span = stage_span!("step", keep_search_images = keep_search_images).entered();
        if frame_templates.batch() != self.cfg.num_scales {
            return Err(SiamTrackError::ShapeMismatch {
                context: "frame templates scales",
                expected: vec![self.cfg.num_scales],
                got: vec![frame_templates.batch()],
            });
        }

        let (geometry, images) = self.search_images(frame, bbox)?;
        let embeds = self.embedding.embed(&images, EmbedStage::Search)?;
        let calibration = ResponseCalibration {
            scale: self.cfg.response_scale,
            bias: self.cfg.response_bias,
        };
        let response = correlate(&embeds.track, frame_templates, calibration)?;
        let response_up = upsample(
            &response,
            self.cfg.upsample_factor,
            self.cfg.upsample_method,
        )?;

        Ok(StepOutput {
            scale_factors: geometry.scale_factors,
            response,
            response_up,
            track: embeds.track,
            reid: embeds.reid,
            search_images: keep_search_images.then_some(images),
        })
    }

    /// `step` against the template stored by `initialize`.
    pub fn step_with_stored(
        &self,
        frame: FrameView<'_>,
        bbox: &BoundingBox,
        keep_search_images: bool,
    ) -> SiamTrackResult<StepOutput> {
        let template = self.store.current().ok_or(SiamTrackError::NotInitialized)?;
        self.step(frame, bbox, template.features(), keep_search_images)
    }
}

#[cfg(test)]
mod tests {
    use super::SiameseTracker;
    use crate::config::TrackerConfig;
    use crate::embed::PooledEmbedding;
    use crate::geometry::BoundingBox;
    use crate::image::OwnedFrame;
    use crate::tensor::Tensor4;
    use crate::util::SiamTrackError;

    fn small_config() -> TrackerConfig {
        TrackerConfig {
            upsample_factor: 2,
            ..TrackerConfig::default()
        }
    }

    #[test]
    fn invalid_config_fails_at_construction() {
        let cfg = TrackerConfig {
            upsample_factor: 0,
            ..TrackerConfig::default()
        };
        assert!(SiameseTracker::new(PooledEmbedding::alexnet(), cfg).is_err());
    }

    #[test]
    fn stored_step_requires_initialize() {
        let tracker = SiameseTracker::new(PooledEmbedding::alexnet(), small_config()).unwrap();
        let frame = OwnedFrame::filled(64, 64, &[10.0, 20.0, 30.0]).unwrap();
        let bbox = BoundingBox::new(32.0, 32.0, 10.0, 10.0);
        let err = tracker
            .step_with_stored(frame.view(), &bbox, false)
            .unwrap_err();
        assert_eq!(err, SiamTrackError::NotInitialized);
    }

    #[test]
    fn wrong_template_scale_count_is_rejected_before_embedding() {
        let tracker = SiameseTracker::new(PooledEmbedding::alexnet(), small_config()).unwrap();
        let frame = OwnedFrame::filled(64, 64, &[1.0, 1.0, 1.0]).unwrap();
        let bbox = BoundingBox::new(32.0, 32.0, 10.0, 10.0);
        let templates = Tensor4::zeros([1, 6, 6, 3]).unwrap();
        let err = tracker
            .step(frame.view(), &bbox, &templates, false)
            .unwrap_err();
        assert!(matches!(err, SiamTrackError::ShapeMismatch { .. }));
        assert!(!tracker.embedding.is_created());
    }

    #[test]
    fn search_images_are_returned_only_on_request() {
        let mut tracker =
            SiameseTracker::new(PooledEmbedding::alexnet(), small_config()).unwrap();
        let frame = OwnedFrame::filled(80, 90, &[5.0, 6.0, 7.0]).unwrap();
        let bbox = BoundingBox::new(40.0, 45.0, 20.0, 16.0);
        tracker.initialize(frame.view(), &bbox).unwrap();

        let quiet = tracker.step_with_stored(frame.view(), &bbox, false).unwrap();
        let verbose = tracker.step_with_stored(frame.view(), &bbox, true).unwrap();
        assert!(quiet.search_images.is_none());
        assert_eq!(
            verbose.search_images.as_ref().map(|t| t.shape()),
            Some([3, 255, 255, 3])
        );
        assert_eq!(quiet.response_up, verbose.response_up);
        assert_eq!(quiet.response.shape(), [3, 17, 17]);
        assert_eq!(quiet.response_up.shape(), [3, 34, 34]);
    }

    #[test]
    fn reset_drops_template() {
        let mut tracker =
            SiameseTracker::new(PooledEmbedding::alexnet(), small_config()).unwrap();
        let frame = OwnedFrame::filled(50, 50, &[1.0, 2.0, 3.0]).unwrap();
        let bbox = BoundingBox::new(25.0, 25.0, 8.0, 8.0);
        tracker.initialize(frame.view(), &bbox).unwrap();
        assert!(tracker.template().is_some());
        tracker.reset();
        assert!(tracker.template().is_none());
    }
}
