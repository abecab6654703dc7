//! Error types for siamtrack.

use thiserror::Error;

/// Result alias for siamtrack operations.
pub type SiamTrackResult<T> = std::result::Result<T, SiamTrackError>;

/// Errors that can occur while cropping, embedding, correlating or upsampling.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SiamTrackError {
    /// Frame or tensor dimensions are zero or overflow.
    #[error("invalid dimensions: {height}x{width}x{channels}")]
    InvalidDimensions {
        height: usize,
        width: usize,
        channels: usize,
    },
    /// Backing buffer does not match the declared shape.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Target geometry cannot produce a finite crop.
    #[error("invalid target geometry: {reason}")]
    InvalidGeometry { reason: &'static str },
    /// Two tensors that must agree structurally do not.
    #[error("shape mismatch in {context}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// Configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Upsample method name is not recognized.
    #[error("unsupported upsample method: {name}")]
    UnsupportedUpsampleMethod { name: String },
    /// `step` requested the stored template before `initialize` ran.
    #[error("tracker has no exemplar template; call initialize first")]
    NotInitialized,
    /// Image loading failed (image-io feature).
    #[error("image I/O error: {reason}")]
    ImageIo { reason: String },
}
