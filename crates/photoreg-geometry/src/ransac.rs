//! RANSAC homography fitting.

use log::debug;
use rand::{rngs::StdRng, SeedableRng};

use crate::error::HomographyError;
use crate::homography::{homography_dlt, MIN_CORRESPONDENCES};
use crate::linalg::{self, Mat3, IDENTITY};

/// Maximum reprojection error in pixels of an inlier.
pub const REPROJECTION_THRESHOLD_PX: f64 = 5.0;

/// Parameters of [`ransac_homography`].
#[derive(Debug, Clone, PartialEq)]
pub struct RansacParams {
    /// Maximum reprojection error in pixels of an inlier.
    pub threshold: f64,
    /// Desired probability that at least one sample is outlier free.
    pub confidence: f64,
    /// Upper bound on the number of sampled models.
    pub max_iterations: usize,
    /// Seed of the sampler, `None` draws one from the operating system.
    pub seed: Option<u64>,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            threshold: REPROJECTION_THRESHOLD_PX,
            confidence: 0.995,
            max_iterations: 2000,
            seed: Some(0),
        }
    }
}

/// The best model found by [`ransac_homography`].
#[derive(Debug, Clone, PartialEq)]
pub struct RansacResult {
    /// Homography mapping `from` onto `to`.
    pub model: Mat3,
    /// Inlier flag of every correspondence.
    pub inliers: Vec<bool>,
    /// Number of `true` entries in `inliers`.
    pub inlier_count: usize,
    /// Sum of squared reprojection errors of the inliers.
    pub score: f64,
    /// Number of sampled models.
    pub iterations: usize,
}

/// Outcome of [`estimate_homography`], the identity when fitting failed.
#[derive(Debug, Clone, PartialEq)]
pub struct HomographyFit {
    /// Homography mapping `from` onto `to`.
    pub homography: Mat3,
    /// Inlier flag of every correspondence, all `false` on failure.
    pub inliers: Vec<bool>,
    /// Number of `true` entries in `inliers`.
    pub inlier_count: usize,
    /// Why fitting failed, if it did.
    pub error: Option<HomographyError>,
}

impl HomographyFit {
    /// Whether a model was found.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Squared reprojection error of `to ~ H * from`, infinite for points mapped to infinity.
fn reprojection_error_sq(h: &Mat3, from: &[f64; 2], to: &[f64; 2]) -> f64 {
    match linalg::transform_point(h, *from) {
        Some(p) => (p[0] - to[0]).powi(2) + (p[1] - to[1]).powi(2),
        None => f64::INFINITY,
    }
}

/// Inlier mask, inlier count and sum of squared inlier errors.
fn classify(h: &Mat3, from: &[[f64; 2]], to: &[[f64; 2]], threshold: f64) -> (Vec<bool>, usize, f64) {
    let threshold_sq = threshold * threshold;
    let mut count = 0;
    let mut score = 0.0;
    let mask = from
        .iter()
        .zip(to)
        .map(|(p, q)| {
            let err = reprojection_error_sq(h, p, q);
            let inlier = err <= threshold_sq;
            if inlier {
                count += 1;
                score += err;
            }
            inlier
        })
        .collect();
    (mask, count, score)
}

/// Whether any three of the sampled points are collinear.
fn has_collinear_triplet(points: &[[f64; 2]]) -> bool {
    let n = points.len();
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                let (dx1, dy1) = (points[j][0] - points[i][0], points[j][1] - points[i][1]);
                let (dx2, dy2) = (points[k][0] - points[i][0], points[k][1] - points[i][1]);
                let cross = (dx2 * dy1 - dy2 * dx1).abs();
                if cross <= f64::EPSILON * 1e3 * (dx1.abs() + dy1.abs() + dx2.abs() + dy2.abs()) {
                    return true;
                }
            }
        }
    }
    false
}

/// Iterations needed to draw an outlier free sample with the given confidence.
fn update_num_iterations(confidence: f64, inlier_ratio: f64, max_iterations: usize) -> usize {
    let confidence = confidence.clamp(0.0, 1.0);
    let num = (1.0 - confidence).max(f64::MIN_POSITIVE).ln();
    let denom = (1.0 - inlier_ratio.powi(MIN_CORRESPONDENCES as i32)).max(f64::MIN_POSITIVE).ln();

    if denom >= 0.0 || -num >= max_iterations as f64 * (-denom) {
        return max_iterations;
    }
    (num / denom).round().max(1.0) as usize
}

/// Fit a homography mapping `from` onto `to` robust to outliers.
///
/// Random minimal samples of 4 correspondences are drawn; samples with three
/// collinear points are skipped. Each model is scored by its number of
/// correspondences within `threshold` pixels of reprojection error, ties
/// broken by the lower sum of squared errors. The number of iterations
/// adapts to the best inlier ratio. The best model is finally refit on all
/// its inliers and the correspondences are classified again.
///
/// # Errors
///
/// Fewer than 4 correspondences, mismatched lengths, or no model with at
/// least 4 inliers.
pub fn ransac_homography(
    from: &[[f64; 2]],
    to: &[[f64; 2]],
    params: &RansacParams,
) -> Result<RansacResult, HomographyError> {
    let n = from.len();
    if n != to.len() {
        return Err(HomographyError::MismatchedLengths(n, to.len()));
    }
    if n < MIN_CORRESPONDENCES {
        return Err(HomographyError::InsufficientCorrespondences {
            required: MIN_CORRESPONDENCES,
            actual: n,
        });
    }

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut best: Option<(Mat3, Vec<bool>, usize, f64)> = None;
    let mut required_iterations = params.max_iterations;
    let mut iterations = 0;

    while iterations < required_iterations {
        iterations += 1;

        let sample = rand::seq::index::sample(&mut rng, n, MIN_CORRESPONDENCES).into_vec();
        let sample_from = sample.iter().map(|&i| from[i]).collect::<Vec<_>>();
        let sample_to = sample.iter().map(|&i| to[i]).collect::<Vec<_>>();
        if has_collinear_triplet(&sample_from) || has_collinear_triplet(&sample_to) {
            continue;
        }

        let Ok(model) = homography_dlt(&sample_from, &sample_to) else {
            continue;
        };

        let (mask, count, score) = classify(&model, from, to, params.threshold);
        let is_better = match &best {
            None => count > 0,
            Some((_, _, best_count, best_score)) => {
                count > *best_count || (count == *best_count && score < *best_score)
            }
        };

        if is_better {
            required_iterations = update_num_iterations(
                params.confidence,
                count as f64 / n as f64,
                params.max_iterations,
            )
            .max(iterations);
            best = Some((model, mask, count, score));
        }
    }

    let Some((mut model, mut inliers, mut inlier_count, mut score)) = best else {
        return Err(HomographyError::NoConsensus {
            inliers: 0,
            required: MIN_CORRESPONDENCES,
        });
    };

    if inlier_count < MIN_CORRESPONDENCES {
        return Err(HomographyError::NoConsensus {
            inliers: inlier_count,
            required: MIN_CORRESPONDENCES,
        });
    }

    // refit on all inliers, keep it unless it loses support
    let select = |points: &[[f64; 2]]| {
        points
            .iter()
            .zip(&inliers)
            .filter(|(_, &m)| m)
            .map(|(p, _)| *p)
            .collect::<Vec<_>>()
    };
    let (inlier_from, inlier_to) = (select(from), select(to));
    if let Ok(refined) = homography_dlt(&inlier_from, &inlier_to) {
        let (mask, count, refined_score) = classify(&refined, from, to, params.threshold);
        if count >= inlier_count {
            model = refined;
            inliers = mask;
            inlier_count = count;
            score = refined_score;
        }
    }

    debug!("ransac: {inlier_count}/{n} inliers after {iterations} iterations");

    Ok(RansacResult {
        model,
        inliers,
        inlier_count,
        score,
        iterations,
    })
}

/// Fit a homography mapping `from` onto `to`, never failing.
///
/// Any error of [`ransac_homography`] yields the identity with an all `false`
/// inlier mask and the error recorded in [`HomographyFit::error`].
pub fn estimate_homography(from: &[[f64; 2]], to: &[[f64; 2]], params: &RansacParams) -> HomographyFit {
    match ransac_homography(from, to, params) {
        Ok(result) => HomographyFit {
            homography: result.model,
            inliers: result.inliers,
            inlier_count: result.inlier_count,
            error: None,
        },
        Err(error) => {
            debug!("homography estimation failed: {error}");
            HomographyFit {
                homography: IDENTITY,
                inliers: vec![false; from.len()],
                inlier_count: 0,
                error: Some(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::transform_point;
    use approx::assert_relative_eq;
    use rand::Rng;

    fn scattered_points(n: usize, seed: u64) -> Vec<[f64; 2]> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| [rng.random_range(0.0..200.0), rng.random_range(0.0..150.0)])
            .collect()
    }

    #[test]
    fn test_update_num_iterations() {
        assert_eq!(update_num_iterations(0.995, 1.0, 2000), 1);
        assert_eq!(update_num_iterations(0.995, 0.0, 2000), 2000);

        let half = update_num_iterations(0.995, 0.5, 2000);
        // log(0.005) / log(1 - 0.5^4) ~ 82
        assert!((80..=84).contains(&half), "{half}");
    }

    #[test]
    fn test_ransac_with_outliers() -> Result<(), HomographyError> {
        let expected = [[0.98, 0.02, -10.0], [-0.01, 1.03, -5.0], [1e-4, 5e-5, 1.0]];
        let from = scattered_points(100, 1);
        let mut to = from
            .iter()
            .filter_map(|p| transform_point(&expected, *p))
            .collect::<Vec<_>>();

        // corrupt every fourth correspondence
        for (i, p) in to.iter_mut().enumerate().filter(|(i, _)| i % 4 == 0) {
            p[0] += 40.0 + i as f64;
            p[1] -= 30.0;
        }

        let result = ransac_homography(&from, &to, &RansacParams::default())?;
        assert_eq!(result.inlier_count, 75);
        assert!(result.inliers.iter().enumerate().all(|(i, &m)| m == (i % 4 != 0)));
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(result.model[i][j], expected[i][j], epsilon = 1e-6);
            }
        }
        Ok(())
    }

    #[test]
    fn test_ransac_is_deterministic_with_seed() -> Result<(), HomographyError> {
        let from = scattered_points(30, 2);
        let to = scattered_points(30, 3);
        let params = RansacParams {
            max_iterations: 200,
            ..Default::default()
        };
        let a = ransac_homography(&from, &to, &params);
        let b = ransac_homography(&from, &to, &params);
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_estimate_homography_fallback() {
        let line = (0..10).map(|i| [i as f64, 2.0 * i as f64]).collect::<Vec<_>>();
        let fit = estimate_homography(&line, &line, &RansacParams::default());
        assert!(!fit.is_success());
        assert_eq!(fit.homography, IDENTITY);
        assert_eq!(fit.inliers, vec![false; 10]);
        assert_eq!(fit.inlier_count, 0);

        let few = [[0.0, 0.0], [1.0, 0.0]];
        let fit = estimate_homography(&few, &few, &RansacParams::default());
        assert_eq!(
            fit.error,
            Some(HomographyError::InsufficientCorrespondences {
                required: 4,
                actual: 2
            })
        );
    }

    #[test]
    fn test_estimate_homography_identity() {
        let points = scattered_points(40, 4);
        let fit = estimate_homography(&points, &points, &RansacParams::default());
        assert!(fit.is_success());
        assert_eq!(fit.inlier_count, 40);
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(fit.homography[i][j], IDENTITY[i][j], epsilon = 1e-9);
            }
        }
    }
}
