/// A 3x3 row-major matrix.
pub type Mat3 = [[f64; 3]; 3];

/// The 3x3 identity matrix.
pub const IDENTITY: Mat3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Compute the product `a * b`.
pub fn mat33_mul(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}

/// Compute the product `m * v`.
pub fn mat33_mul_vec3(m: &Mat3, v: &[f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Compute the determinant of a 3x3 matrix.
pub fn det_mat33(m: &Mat3) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Compute the inverse of a 3x3 matrix, `None` when it is singular.
pub fn inverse_mat33(m: &Mat3) -> Option<Mat3> {
    let det = det_mat33(m);
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    let inv_det = 1.0 / det;

    Some([
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
        ],
    ])
}

/// Scale the matrix so that its bottom right entry is one.
///
/// Matrices with a vanishing bottom right entry are scaled to unit Frobenius norm instead.
pub fn normalize_mat33_inplace(m: &mut Mat3) {
    let frobenius = m.iter().flatten().map(|v| v * v).sum::<f64>().sqrt();
    let scale = if m[2][2].abs() > 1e-12 * frobenius.max(1.0) {
        m[2][2]
    } else {
        frobenius
    };
    if scale == 0.0 {
        return;
    }
    m.iter_mut().flatten().for_each(|v| *v /= scale);
}

/// Apply a homography to a 2d point, `None` when it maps to infinity.
pub fn transform_point(h: &Mat3, p: [f64; 2]) -> Option<[f64; 2]> {
    let [x, y, w] = mat33_mul_vec3(h, &[p[0], p[1], 1.0]);
    if w.abs() < f64::EPSILON {
        return None;
    }
    Some([x / w, y / w])
}

/// Whether the entries of the matrix are all finite.
pub fn is_finite_mat33(m: &Mat3) -> bool {
    m.iter().flatten().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_inverse_mat33() {
        let m = [[2.0, 0.5, 3.0], [0.1, 1.0, -2.0], [0.001, 0.002, 1.0]];
        let inv = inverse_mat33(&m).unwrap_or(IDENTITY);
        let prod = mat33_mul(&m, &inv);
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(prod[i][j], IDENTITY[i][j], epsilon = 1e-12);
            }
        }
        assert!(inverse_mat33(&[[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 0.0, 1.0]]).is_none());
    }

    #[test]
    fn test_normalize_mat33() {
        let mut m = [[2.0, 0.0, 4.0], [0.0, 2.0, 6.0], [0.0, 0.0, 2.0]];
        normalize_mat33_inplace(&mut m);
        assert_eq!(m, [[1.0, 0.0, 2.0], [0.0, 1.0, 3.0], [0.0, 0.0, 1.0]]);
    }

    #[test]
    fn test_transform_point() {
        let h = [[1.0, 0.0, 3.0], [0.0, 1.0, -2.0], [0.0, 0.0, 1.0]];
        assert_eq!(transform_point(&h, [1.0, 1.0]), Some([4.0, -1.0]));

        let at_infinity = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]];
        assert_eq!(transform_point(&at_infinity, [0.0, 5.0]), None);
    }
}
