use photoreg_image::Image;

/// Kernel for bilinear interpolation
///
/// Coordinates are clamped to the image domain, so samples just outside the
/// image repeat the border.
///
/// # Arguments
///
/// * `image` - The input image container.
/// * `u` - The x coordinate of the pixel to interpolate.
/// * `v` - The y coordinate of the pixel to interpolate.
/// * `c` - The channel of the pixel to interpolate.
///
/// # Returns
///
/// The interpolated pixel value.
pub fn bilinear_interpolation<const C: usize>(image: &Image<f32, C>, u: f32, v: f32, c: usize) -> f32 {
    let (rows, cols) = (image.rows(), image.cols());

    let u = u.clamp(0.0, (cols - 1) as f32);
    let v = v.clamp(0.0, (rows - 1) as f32);

    let iu0 = u.trunc() as usize;
    let iv0 = v.trunc() as usize;

    let frac_u = u - iu0 as f32;
    let frac_v = v - iv0 as f32;

    let iu1 = if iu0 + 1 < cols { iu0 + 1 } else { iu0 };
    let iv1 = if iv0 + 1 < rows { iv0 + 1 } else { iv0 };

    let data = image.as_slice();
    let p00 = data[(iv0 * cols + iu0) * C + c];
    let p01 = data[(iv0 * cols + iu1) * C + c];
    let p10 = data[(iv1 * cols + iu0) * C + c];
    let p11 = data[(iv1 * cols + iu1) * C + c];

    let top = p00 + (p01 - p00) * frac_u;
    let bottom = p10 + (p11 - p10) * frac_u;
    top + (bottom - top) * frac_v
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use photoreg_image::ImageError;

    #[test]
    fn test_bilinear_midpoint() -> Result<(), ImageError> {
        let image = Image::<f32, 1>::new([2, 2].into(), vec![0.0, 1.0, 2.0, 3.0])?;
        assert_relative_eq!(bilinear_interpolation(&image, 0.5, 0.5, 0), 1.5);
        assert_relative_eq!(bilinear_interpolation(&image, 1.0, 1.0, 0), 3.0);
        assert_relative_eq!(bilinear_interpolation(&image, 5.0, -1.0, 0), 1.0);
        Ok(())
    }
}
