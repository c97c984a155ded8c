use photoreg_image::{ImageError, ImageSize, Rect};
use photoreg_imgproc::features::{DetectorError, MatchError};

/// An error type for the registration pipeline.
///
/// Only contract violations are errors. Images without features, too few
/// correspondences or degenerate point sets are reported through
/// [`crate::Diagnostics`] with an identity homography.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RegistrationError {
    /// The images have a channel count other than 1 or 3.
    #[error("Unsupported number of channels {0}, expected 1 or 3")]
    UnsupportedChannels(usize),

    /// The region of interest has zero area.
    #[error("Empty region of interest {0}")]
    EmptyRoi(Rect),

    /// The region of interest exceeds one of the images.
    #[error("Region of interest {roi} exceeds the {image} image of size {size}")]
    RoiOutOfBounds {
        /// The offending region.
        roi: Rect,
        /// Which image it exceeds, `"source"` or `"destination"`.
        image: &'static str,
        /// Size of that image.
        size: ImageSize,
    },

    /// The preview blend weight is outside `[0, 1]`.
    #[error("Invalid blend weight {0}, expected a value in [0, 1]")]
    InvalidBlendAlpha(f32),

    /// Image processing failed.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Descriptor matching failed.
    #[error(transparent)]
    Match(#[from] MatchError),

    /// The detector name is unknown.
    #[error(transparent)]
    Detector(#[from] DetectorError),
}
