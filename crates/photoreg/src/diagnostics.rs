use std::fmt;

use photoreg_geometry::HomographyError;

/// Whether a homography was estimated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// A homography was fitted on the correspondences.
    Success,
    /// The identity was returned instead.
    Fallback,
}

/// Why a registration fell back to the identity.
#[derive(Clone, Debug, PartialEq)]
pub enum FallbackReason {
    /// Fewer correspondences than the configured minimum.
    InsufficientMatches {
        /// Number of correspondences found.
        found: usize,
        /// Configured minimum.
        required: usize,
    },
    /// Robust fitting found no consistent model.
    EstimationFailed(HomographyError),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::InsufficientMatches { found, required } => {
                write!(f, "insufficient matches: {found} < {required}")
            }
            FallbackReason::EstimationFailed(err) => write!(f, "estimation failed: {err}"),
        }
    }
}

/// Counts and outcome of a registration.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostics {
    /// Success or fallback.
    pub status: Status,
    /// Set on fallback.
    pub reason: Option<FallbackReason>,
    /// Keypoints found in the source region.
    pub source_keypoints: usize,
    /// Keypoints found in the destination region.
    pub destination_keypoints: usize,
    /// Correspondences kept by the matcher.
    pub match_count: usize,
    /// Correspondences consistent with the homography.
    pub inlier_count: usize,
}

impl Diagnostics {
    /// Whether a homography was estimated.
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "keypoints {}/{}, matches {}, inliers {}",
            self.source_keypoints, self.destination_keypoints, self.match_count, self.inlier_count
        )?;
        match &self.reason {
            Some(reason) => write!(f, ", fallback ({reason})"),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let diagnostics = Diagnostics {
            status: Status::Fallback,
            reason: Some(FallbackReason::InsufficientMatches {
                found: 3,
                required: 10,
            }),
            source_keypoints: 12,
            destination_keypoints: 9,
            match_count: 3,
            inlier_count: 0,
        };
        assert!(!diagnostics.is_success());
        assert_eq!(
            diagnostics.to_string(),
            "keypoints 12/9, matches 3, inliers 0, fallback (insufficient matches: 3 < 10)"
        );
    }
}
