//! Feature detection, description and matching.
//!
//! Four interchangeable extractors implement [`FeatureExtractor`]:
//!
//! - **ORB**: oriented FAST corners with steered BRIEF binary descriptors
//! - **SIFT**: difference-of-Gaussian blobs with gradient histogram float descriptors
//! - **AKAZE**: nonlinear scale space Hessian blobs with M-SURF float descriptors
//! - **BRISK**: multi-scale FAST corners with binary concentric-ring descriptors
//!
//! Binary descriptors are compared with the Hamming distance and float
//! descriptors with the Euclidean distance, see [`match_features`].

mod types;
pub use types::*;

mod fast;
pub use fast::*;

mod harris;
pub use harris::*;

mod orb;
pub use orb::{OrbDetector, ORB_DESCRIPTOR_BYTES};

mod sift;
pub use sift::{SiftDetector, SIFT_DESCRIPTOR_SIZE};

mod akaze;
pub use akaze::{AkazeDetector, AKAZE_DESCRIPTOR_SIZE};

mod brisk;
pub use brisk::{BriskDetector, BRISK_DESCRIPTOR_BYTES};

mod matching;
pub use matching::*;

mod detector;
pub use detector::*;

#[cfg(test)]
mod testing;
