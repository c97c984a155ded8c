#![deny(missing_docs)]
//! Image processing and feature extraction used by the registration pipeline.

/// color transformations module.
pub mod color;

/// image cropping module.
pub mod crop;

/// utilities to draw on images.
pub mod draw;

/// image enhancement module.
pub mod enhance;

/// feature detection, description and matching module.
pub mod features;

/// image filtering module.
pub mod filter;

/// utilities for interpolation.
pub mod interpolation;

/// module containing parallelization utilities.
pub mod parallel;

/// image resizing module.
pub mod resize;

/// image geometric transformation module.
pub mod warp;
