use std::{fmt, str::FromStr};

use super::{
    AkazeDetector, BriskDetector, DescriptorKind, FeatureExtractor, MatchStrategy, OrbDetector,
    SiftDetector, RATIO_TEST, TOP_FRACTION,
};

/// Error returned when parsing an unknown detector name.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    /// The name does not designate one of the available detectors.
    #[error("Unsupported detector {0:?}, expected one of orb, sift, akaze, brisk")]
    UnsupportedDetector(String),
}

/// The available feature detectors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum DetectorKind {
    /// Oriented FAST and rotated BRIEF.
    #[default]
    Orb,
    /// Scale invariant feature transform.
    Sift,
    /// Accelerated KAZE.
    Akaze,
    /// Binary robust invariant scalable keypoints.
    Brisk,
}

impl DetectorKind {
    /// All detectors, in declaration order.
    pub const ALL: [DetectorKind; 4] = [
        DetectorKind::Orb,
        DetectorKind::Sift,
        DetectorKind::Akaze,
        DetectorKind::Brisk,
    ];

    /// Lowercase name of the detector.
    pub fn name(&self) -> &'static str {
        match self {
            DetectorKind::Orb => "orb",
            DetectorKind::Sift => "sift",
            DetectorKind::Akaze => "akaze",
            DetectorKind::Brisk => "brisk",
        }
    }

    /// Build the extractor with its default parameters.
    pub fn extractor(&self) -> Box<dyn FeatureExtractor> {
        match self {
            DetectorKind::Orb => Box::new(OrbDetector::default()),
            DetectorKind::Sift => Box::new(SiftDetector::default()),
            DetectorKind::Akaze => Box::new(AkazeDetector::default()),
            DetectorKind::Brisk => Box::new(BriskDetector::default()),
        }
    }

    /// Family of the descriptors this detector produces.
    pub fn descriptor_kind(&self) -> DescriptorKind {
        match self {
            DetectorKind::Orb | DetectorKind::Brisk => DescriptorKind::Binary,
            DetectorKind::Sift | DetectorKind::Akaze => DescriptorKind::Float,
        }
    }

    /// Matching strategy suited to the descriptor family.
    ///
    /// Float descriptors use the ratio test, binary descriptors the cross
    /// checked top fraction.
    pub fn match_strategy(&self) -> MatchStrategy {
        match self.descriptor_kind() {
            DescriptorKind::Float => MatchStrategy::RatioTest { ratio: RATIO_TEST },
            DescriptorKind::Binary => MatchStrategy::TopFraction { keep: TOP_FRACTION },
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DetectorKind {
    type Err = DetectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        DetectorKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| DetectorError::UnsupportedDetector(s.to_string()))
    }
}
