#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the geometry module.
pub mod error;

/// 3x3 matrix helpers.
pub mod linalg;

/// Direct linear transform homography estimation.
pub mod homography;

/// Robust homography fitting.
pub mod ransac;

/// Moving homographies between cropped and full image coordinates.
pub mod anchor;

pub use crate::anchor::{re_anchor, to_local, translation};
pub use crate::error::HomographyError;
pub use crate::homography::homography_dlt;
pub use crate::linalg::{Mat3, IDENTITY};
pub use crate::ransac::{
    estimate_homography, ransac_homography, HomographyFit, RansacParams, RansacResult,
    REPROJECTION_THRESHOLD_PX,
};
