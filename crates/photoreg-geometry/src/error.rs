/// An error type for homography estimation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum HomographyError {
    /// The two point sets differ in length.
    #[error("Mismatched point set lengths: from ({0}) != to ({1})")]
    MismatchedLengths(usize, usize),

    /// Not enough correspondences to fit a homography.
    #[error("Homography requires at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences {
        /// Minimum number of correspondences.
        required: usize,
        /// Number of correspondences provided.
        actual: usize,
    },

    /// The points are collinear or coincident.
    #[error("Degenerate point configuration")]
    DegenerateConfiguration,

    /// The estimated matrix is singular or not finite.
    #[error("Estimated homography is singular")]
    SingularHomography,

    /// No model gathered enough inliers.
    #[error("No consensus: best model has {inliers} inliers, at least {required} required")]
    NoConsensus {
        /// Inliers of the best model.
        inliers: usize,
        /// Minimum number of inliers.
        required: usize,
    },
}
