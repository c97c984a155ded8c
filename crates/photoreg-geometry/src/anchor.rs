use crate::linalg::{mat33_mul, Mat3};

/// Build the translation `[[1, 0, a], [0, 1, b], [0, 0, 1]]`.
pub fn translation(a: f64, b: f64) -> Mat3 {
    [[1.0, 0.0, a], [0.0, 1.0, b], [0.0, 0.0, 1.0]]
}

/// Express a homography estimated on crops at offset `(x, y)` in full image coordinates.
///
/// Computes `T(x, y) * h_local * T(-x, -y)`, so that
/// `h_full(p + (x, y)) = h_local(p) + (x, y)`. The identity maps to the exact identity.
pub fn re_anchor(h_local: &Mat3, x: f64, y: f64) -> Mat3 {
    mat33_mul(&mat33_mul(&translation(x, y), h_local), &translation(-x, -y))
}

/// Express a full image homography in the coordinates of crops at offset `(x, y)`.
///
/// Inverse of [`re_anchor`].
pub fn to_local(h_full: &Mat3, x: f64, y: f64) -> Mat3 {
    mat33_mul(&mat33_mul(&translation(-x, -y), h_full), &translation(x, y))
}
