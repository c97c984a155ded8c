use crate::error::HomographyError;
use crate::linalg::{self, Mat3};

/// Minimum number of correspondences defining a homography.
pub const MIN_CORRESPONDENCES: usize = 4;

/// Relative spread below which a point set is considered collinear.
const COLLINEAR_TOL: f64 = 1e-10;

/// Whether the points are coincident or lie on a single line.
///
/// The test looks at the smallest eigenvalue of the 2x2 scatter matrix
/// relative to its trace.
pub fn is_collinear(points: &[[f64; 2]]) -> bool {
    let n = points.len() as f64;
    if points.len() < 3 {
        return true;
    }
    let (mx, my) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
    let (mx, my) = (mx / n, my / n);

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for p in points {
        let (dx, dy) = (p[0] - mx, p[1] - my);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    let trace = sxx + syy;
    if trace <= 0.0 {
        return true;
    }
    let det = sxx * syy - sxy * sxy;
    let disc = (trace * trace - 4.0 * det).max(0.0).sqrt();
    let lambda_min = 0.5 * (trace - disc);
    lambda_min <= COLLINEAR_TOL * trace
}

/// Similarity moving the centroid to the origin with mean distance sqrt(2).
fn normalize_points_2d(points: &[[f64; 2]]) -> (Vec<[f64; 2]>, Mat3) {
    let n = points.len() as f64;
    let (mx, my) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
    let (mx, my) = (mx / n, my / n);

    let mean_dist = points
        .iter()
        .map(|p| ((p[0] - mx).powi(2) + (p[1] - my).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let scale = if mean_dist > 0.0 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let normalized = points
        .iter()
        .map(|p| [(p[0] - mx) * scale, (p[1] - my) * scale])
        .collect();
    let t = [
        [scale, 0.0, -scale * mx],
        [0.0, scale, -scale * my],
        [0.0, 0.0, 1.0],
    ];
    (normalized, t)
}

/// Estimate the homography mapping `from` onto `to` with the normalized DLT.
///
/// Both point sets are normalized (Hartley), the 2n x 9 design matrix is
/// built and the solution is the right singular vector of the smallest
/// singular value. The result is denormalized and scaled so that `h[2][2] = 1`.
///
/// # Arguments
///
/// * `from` - The points in the domain of the homography.
/// * `to` - The corresponding points in its range.
///
/// # Errors
///
/// Fewer than 4 correspondences, mismatched lengths, collinear point sets or
/// a singular result.
///
/// Example:
///
/// ```
/// use photoreg_geometry::homography_dlt;
///
/// let from = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
/// let to = [[2.0, 1.0], [3.0, 1.0], [2.0, 2.0], [3.0, 2.0]];
/// let h = homography_dlt(&from, &to).unwrap();
/// assert!((h[0][2] - 2.0).abs() < 1e-9);
/// ```
pub fn homography_dlt(from: &[[f64; 2]], to: &[[f64; 2]]) -> Result<Mat3, HomographyError> {
    if from.len() != to.len() {
        return Err(HomographyError::MismatchedLengths(from.len(), to.len()));
    }
    if from.len() < MIN_CORRESPONDENCES {
        return Err(HomographyError::InsufficientCorrespondences {
            required: MIN_CORRESPONDENCES,
            actual: from.len(),
        });
    }
    if is_collinear(from) || is_collinear(to) {
        return Err(HomographyError::DegenerateConfiguration);
    }

    let (from_n, t_from) = normalize_points_2d(from);
    let (to_n, t_to) = normalize_points_2d(to);

    // construct matrix A, two rows per correspondence
    let n = from_n.len();
    let mut mat_a = faer::Mat::<f64>::zeros(2 * n, 9);
    for (i, (p, q)) in from_n.iter().zip(to_n.iter()).enumerate() {
        let ([x, y], [u, v]) = (*p, *q);
        let r = 2 * i;
        mat_a.write(r, 0, x);
        mat_a.write(r, 1, y);
        mat_a.write(r, 2, 1.0);
        mat_a.write(r, 6, -u * x);
        mat_a.write(r, 7, -u * y);
        mat_a.write(r, 8, -u);

        mat_a.write(r + 1, 3, x);
        mat_a.write(r + 1, 4, y);
        mat_a.write(r + 1, 5, 1.0);
        mat_a.write(r + 1, 6, -v * x);
        mat_a.write(r + 1, 7, -v * y);
        mat_a.write(r + 1, 8, -v);
    }

    // null vector: right singular vector of the smallest singular value
    let svd = mat_a.svd();
    let h = svd.v().col(8);
    let h_norm = [[h[0], h[1], h[2]], [h[3], h[4], h[5]], [h[6], h[7], h[8]]];

    // denormalize: H = T_to^-1 * Hn * T_from
    let t_to_inv = linalg::inverse_mat33(&t_to).ok_or(HomographyError::DegenerateConfiguration)?;
    let mut homo = linalg::mat33_mul(&linalg::mat33_mul(&t_to_inv, &h_norm), &t_from);
    linalg::normalize_mat33_inplace(&mut homo);

    let det = linalg::det_mat33(&homo);
    if !linalg::is_finite_mat33(&homo) || !det.is_finite() || det.abs() < 1e-10 {
        return Err(HomographyError::SingularHomography);
    }

    Ok(homo)
}
