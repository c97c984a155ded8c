use photoreg_image::{Image, ImageError};

use super::{kernels, separable_filter};

/// Blur an image using a gaussian blur filter
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_size` - The size of the kernel (kernel_x, kernel_y). A zero size is derived from sigma.
/// * `sigma` - The sigma of the gaussian kernel. A zero `sigma.1` reuses `sigma.0`.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn gaussian_blur<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_size: (usize, usize),
    sigma: (f32, f32),
) -> Result<(), ImageError> {
    let sigma_x = sigma.0;
    let sigma_y = if sigma.1 > 0.0 { sigma.1 } else { sigma.0 };

    let size_x = match kernel_size.0 {
        0 => kernels::gaussian_kernel_size(sigma_x),
        k => k,
    };
    let size_y = match kernel_size.1 {
        0 => kernels::gaussian_kernel_size(sigma_y),
        k => k,
    };

    let kernel_x = kernels::gaussian_kernel_1d(size_x, sigma_x);
    let kernel_y = kernels::gaussian_kernel_1d(size_y, sigma_y);
    separable_filter(src, dst, &kernel_x, &kernel_y)
}

/// Compute the normalized scharr derivatives of an image.
///
/// A unit slope along x yields `dx == 1`.
pub fn scharr_gradient<const C: usize>(
    src: &Image<f32, C>,
    dx: &mut Image<f32, C>,
    dy: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    let (derivative, smoothing) = kernels::scharr_kernel_1d();
    separable_filter(src, dx, &derivative, &smoothing)?;
    separable_filter(src, dy, &smoothing, &derivative)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use photoreg_image::ImageSize;

    fn ramp_x(width: usize, height: usize) -> Result<Image<f32, 1>, ImageError> {
        let data = (0..height)
            .flat_map(|_| (0..width).map(|x| x as f32))
            .collect();
        Image::new(ImageSize { width, height }, data)
    }

    #[test]
    fn test_gaussian_blur_constant() -> Result<(), ImageError> {
        let img = Image::<f32, 1>::from_size_val([8, 8].into(), 0.5)?;
        let mut dst = Image::<f32, 1>::from_size_val(img.size(), 0.0)?;
        gaussian_blur(&img, &mut dst, (0, 0), (1.6, 0.0))?;
        dst.as_slice()
            .iter()
            .for_each(|&v| assert_relative_eq!(v, 0.5, epsilon = 1e-5));
        Ok(())
    }

    #[test]
    fn test_scharr_unit_slope() -> Result<(), ImageError> {
        let img = ramp_x(7, 5)?;
        let mut dx = Image::from_size_val(img.size(), 0.0)?;
        let mut dy = Image::from_size_val(img.size(), 0.0)?;
        scharr_gradient(&img, &mut dx, &mut dy)?;

        // interior pixels see the exact slope
        let idx = img.size().index(2, 3);
        assert_relative_eq!(dx.as_slice()[idx], 1.0, epsilon = 1e-6);
        assert_relative_eq!(dy.as_slice()[idx], 0.0, epsilon = 1e-6);
        Ok(())
    }
}
