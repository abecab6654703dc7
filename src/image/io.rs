//! Frame loading through the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::OwnedFrame;
use crate::util::{SiamTrackError, SiamTrackResult};
use std::path::Path;

/// Converts an 8-bit RGB buffer to an `f32` frame in `0..=255`.
pub fn frame_from_rgb_image(img: &image::RgbImage) -> SiamTrackResult<OwnedFrame> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    let data = img.as_raw().iter().map(|&v| f32::from(v)).collect();
    OwnedFrame::new(data, height, width, 3)
}

/// Converts any decoded image to an RGB `f32` frame.
pub fn frame_from_dynamic_image(img: &image::DynamicImage) -> SiamTrackResult<OwnedFrame> {
    frame_from_rgb_image(&img.to_rgb8())
}

/// Loads an image from disk as an RGB `f32` frame.
pub fn load_rgb_frame<P: AsRef<Path>>(path: P) -> SiamTrackResult<OwnedFrame> {
    let img = image::open(path).map_err(|err| SiamTrackError::ImageIo {
        reason: err.to_string(),
    })?;
    frame_from_dynamic_image(&img)
}
