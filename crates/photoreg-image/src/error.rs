/// An error type for the image module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when channel and shape are not valid.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when the image size is not valid.
    #[error("Invalid image size ({0}, {1}) and ({2}, {3})")]
    InvalidImageSize(usize, usize, usize, usize),

    /// Error when the number of channels is not supported by an operation.
    #[error("Unsupported number of channels ({0})")]
    UnsupportedChannels(usize),

    /// Error when a pixel value cannot be cast to the target type.
    #[error("Failed to cast image data")]
    CastError,

    /// Error when a filter kernel has an invalid length.
    #[error("Invalid kernel length ({0}, {1})")]
    InvalidKernelLength(usize, usize),

    /// Error when a transform matrix is not invertible.
    #[error("Cannot compute the determinant of the transform matrix")]
    CannotComputeDeterminant,

    /// Error when a rectangle has zero width or height.
    #[error("Rectangle ({0}x{1}) is empty")]
    EmptyRect(usize, usize),

    /// Error when a rectangle does not fit inside an image.
    #[error("Rectangle (x: {x}, y: {y}, w: {width}, h: {height}) exceeds image bounds ({image_width}x{image_height})")]
    RectOutOfBounds {
        /// Left edge of the rectangle.
        x: usize,
        /// Top edge of the rectangle.
        y: usize,
        /// Width of the rectangle.
        width: usize,
        /// Height of the rectangle.
        height: usize,
        /// Width of the image.
        image_width: usize,
        /// Height of the image.
        image_height: usize,
    },
}
