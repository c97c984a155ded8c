#![deny(missing_docs)]
//! Image types used across the registration crates.

/// image representation for computer vision purposes.
pub mod image;

/// Error types for the image module.
pub mod error;

/// rectangular regions of interest.
pub mod roi;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageDtype, ImageSize};
pub use crate::roi::Rect;
