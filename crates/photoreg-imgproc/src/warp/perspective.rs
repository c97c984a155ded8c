use crate::{
    interpolation::{interpolate_pixel, InterpolationMode},
    parallel,
};

use photoreg_image::{Image, ImageError};

#[rustfmt::skip]
fn determinant3x3(m: &[f32; 9]) -> f32 {
    m[0] * (m[4] * m[8] - m[5] * m[7]) -
    m[1] * (m[3] * m[8] - m[5] * m[6]) +
    m[2] * (m[3] * m[7] - m[4] * m[6])
}

#[rustfmt::skip]
fn adjugate3x3(m: &[f32; 9]) -> [f32; 9] {
    [
        m[4] * m[8] - m[5] * m[7],  // [0, 0]
        m[2] * m[7] - m[1] * m[8],  // [0, 1]
        m[1] * m[5] - m[2] * m[4],  // [0, 2]
        m[5] * m[6] - m[3] * m[8],  // [1, 0]
        m[0] * m[8] - m[2] * m[6],  // [1, 1]
        m[2] * m[3] - m[0] * m[5],  // [1, 2]
        m[3] * m[7] - m[4] * m[6],  // [2, 0]
        m[1] * m[6] - m[0] * m[7],  // [2, 1]
        m[0] * m[4] - m[1] * m[3],  // [2, 2]
    ]
}

fn inverse_perspective_matrix(m: &[f32; 9]) -> Result<[f32; 9], ImageError> {
    let det = determinant3x3(m);

    if det == 0.0 || !det.is_finite() {
        return Err(ImageError::CannotComputeDeterminant);
    }

    let adj = adjugate3x3(m);
    let inv_det = 1.0 / det;

    let mut inv_m = [0.0; 9];
    inv_m
        .iter_mut()
        .zip(adj.iter())
        .for_each(|(inv, &a)| *inv = a * inv_det);

    Ok(inv_m)
}

/// Apply a row-major 3x3 perspective matrix to a point.
///
/// Points mapped to infinity come back as non-finite coordinates.
pub fn transform_point(x: f32, y: f32, m: &[f32; 9]) -> (f32, f32) {
    let w = m[6] * x + m[7] * y + m[8];
    let xw = (m[0] * x + m[1] * y + m[2]) / w;
    let yw = (m[3] * x + m[4] * y + m[5]) / w;
    (xw, yw)
}

/// Applies a perspective transformation to an image.
///
/// Destination pixels whose preimage falls outside `src` are left untouched.
///
/// * `src` - The input image with shape (height, width, channels).
/// * `dst` - The output image with shape (height, width, channels).
/// * `m` - The 3x3 perspective transformation matrix src -> dst, row-major.
/// * `interpolation` - The interpolation mode to use.
///
/// # Errors
///
/// Returns [`ImageError::CannotComputeDeterminant`] if `m` is singular.
///
/// # Example
///
/// ```
/// use photoreg_image::{Image, ImageSize};
/// use photoreg_imgproc::interpolation::InterpolationMode;
/// use photoreg_imgproc::warp::warp_perspective;
///
/// let src = Image::<f32, 1>::new(
///   ImageSize {
///     width: 4,
///     height: 5,
///   },
///   vec![0.0f32; 4 * 5]
/// ).unwrap();
///
/// let m = [1.0, 0.0, -1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0];
///
/// let mut dst = Image::<f32, 1>::from_size_val(
///   ImageSize {
///     width: 2,
///     height: 3,
///   },
///   0.0
/// ).unwrap();
///
/// warp_perspective(&src, &mut dst, &m, InterpolationMode::Bilinear).unwrap();
///
/// assert_eq!(dst.size().width, 2);
/// assert_eq!(dst.size().height, 3);
/// ```
pub fn warp_perspective<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    m: &[f32; 9],
    interpolation: InterpolationMode,
) -> Result<(), ImageError> {
    let inv_m = inverse_perspective_matrix(m)?;

    // positions in src for every dst pixel
    let (dst_rows, dst_cols) = (dst.rows(), dst.cols());
    let mut map_x = Vec::with_capacity(dst_rows * dst_cols);
    let mut map_y = Vec::with_capacity(dst_rows * dst_cols);
    for y in 0..dst_rows {
        for x in 0..dst_cols {
            let (xs, ys) = transform_point(x as f32, y as f32, &inv_m);
            map_x.push(xs);
            map_y.push(ys);
        }
    }

    let max_x = src.cols() as f32 - 1.0;
    let max_y = src.rows() as f32 - 1.0;

    parallel::par_iter_rows_resample(dst, &map_x, &map_y, |x, y, dst_pixel| {
        if x >= 0.0 && x <= max_x && y >= 0.0 && y <= max_y {
            dst_pixel
                .iter_mut()
                .enumerate()
                .for_each(|(k, pixel)| *pixel = interpolate_pixel(src, x, y, k, interpolation));
        }
    });

    Ok(())
}
