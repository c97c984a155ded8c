//! Pixel interpolation methods for image transformations.
//!
//! - **Nearest**: uses the nearest pixel value
//! - **Bilinear**: linear interpolation between the four adjacent pixels

mod bilinear;
pub use bilinear::bilinear_interpolation;

mod interpolate;
pub use interpolate::{interpolate_pixel, InterpolationMode};
