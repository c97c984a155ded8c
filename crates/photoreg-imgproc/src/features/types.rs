use photoreg_image::{Image, ImageError};

/// A detected point of interest.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Keypoint {
    /// Column in full resolution pixel coordinates of the image the detector ran on.
    pub x: f32,
    /// Row in full resolution pixel coordinates of the image the detector ran on.
    pub y: f32,
    /// Diameter of the meaningful neighbourhood in pixels.
    pub size: f32,
    /// Dominant orientation in radians, measured in image coordinates (y down).
    pub angle: f32,
    /// Detector response, larger is stronger.
    pub response: f32,
    /// Pyramid octave the keypoint was detected in.
    pub octave: usize,
}

/// The distance family of a descriptor set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DescriptorKind {
    /// Bit-packed descriptors compared with the Hamming distance.
    Binary,
    /// Real valued descriptors compared with the Euclidean distance.
    Float,
}

/// Descriptors of a set of keypoints, one row per keypoint.
#[derive(Clone, Debug, PartialEq)]
pub enum Descriptors {
    /// Bit-packed binary descriptors.
    Binary(Vec<Vec<u8>>),
    /// Real valued descriptors.
    Float(Vec<Vec<f32>>),
}

impl Descriptors {
    /// An empty descriptor set of the given kind.
    pub fn empty(kind: DescriptorKind) -> Self {
        match kind {
            DescriptorKind::Binary => Descriptors::Binary(Vec::new()),
            DescriptorKind::Float => Descriptors::Float(Vec::new()),
        }
    }

    /// The distance family of the descriptors.
    pub fn kind(&self) -> DescriptorKind {
        match self {
            Descriptors::Binary(_) => DescriptorKind::Binary,
            Descriptors::Float(_) => DescriptorKind::Float,
        }
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        match self {
            Descriptors::Binary(d) => d.len(),
            Descriptors::Float(d) => d.len(),
        }
    }

    /// Whether there are no descriptors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keypoints and their descriptors, produced by a single extractor call.
#[derive(Clone, Debug, PartialEq)]
pub struct Features {
    /// The detected keypoints.
    pub keypoints: Vec<Keypoint>,
    /// The descriptors, parallel to `keypoints`.
    pub descriptors: Descriptors,
}

impl Features {
    /// Features without any keypoint.
    pub fn empty(kind: DescriptorKind) -> Self {
        Self {
            keypoints: Vec::new(),
            descriptors: Descriptors::empty(kind),
        }
    }

    /// Number of keypoints.
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    /// Whether no keypoint was found.
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// A keypoint detector paired with a descriptor.
///
/// Textureless images produce empty [`Features`], never an error.
pub trait FeatureExtractor: Send + Sync {
    /// Detect keypoints on a gray image with values in `[0, 1]` and describe them.
    fn detect_and_compute(&self, image: &Image<f32, 1>) -> Result<Features, ImageError>;

    /// The kind of descriptors produced by [`FeatureExtractor::detect_and_compute`].
    fn descriptor_kind(&self) -> DescriptorKind;
}
