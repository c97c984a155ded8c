use crate::{
    interpolation::{interpolate_pixel, InterpolationMode},
    parallel,
};
use photoreg_image::{Image, ImageError};

/// Resize an image to the size of `dst`.
///
/// Pixel centers are aligned, i.e. destination pixel `x` samples the source at
/// `(x + 0.5) * src.width / dst.width - 0.5`.
///
/// # Arguments
///
/// * `src` - The input image container.
/// * `dst` - The output image container, already allocated with the target size.
/// * `interpolation` - The interpolation method to use.
///
/// # Example
///
/// ```
/// use photoreg_image::{Image, ImageSize};
/// use photoreg_imgproc::interpolation::InterpolationMode;
/// use photoreg_imgproc::resize::resize_native;
///
/// let image = Image::<f32, 1>::from_size_val([4, 4].into(), 1.0).unwrap();
/// let mut resized = Image::<f32, 1>::from_size_val([2, 3].into(), 0.0).unwrap();
///
/// resize_native(&image, &mut resized, InterpolationMode::Bilinear).unwrap();
///
/// assert_eq!(resized.size(), ImageSize { width: 2, height: 3 });
/// assert!(resized.as_slice().iter().all(|&v| v == 1.0));
/// ```
pub fn resize_native<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    interpolation: InterpolationMode,
) -> Result<(), ImageError> {
    if src.width() == 0 || src.height() == 0 {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    if dst.width() == 0 || dst.height() == 0 {
        return Ok(());
    }

    let scale_x = src.width() as f32 / dst.width() as f32;
    let scale_y = src.height() as f32 / dst.height() as f32;

    let (dst_cols, dst_rows) = (dst.cols(), dst.rows());
    let mut map_x = Vec::with_capacity(dst_cols * dst_rows);
    let mut map_y = Vec::with_capacity(dst_cols * dst_rows);
    for y in 0..dst_rows {
        for x in 0..dst_cols {
            map_x.push((x as f32 + 0.5) * scale_x - 0.5);
            map_y.push((y as f32 + 0.5) * scale_y - 0.5);
        }
    }

    parallel::par_iter_rows_resample(dst, &map_x, &map_y, |x, y, dst_pixel| {
        dst_pixel
            .iter_mut()
            .enumerate()
            .for_each(|(k, pixel)| *pixel = interpolate_pixel(src, x, y, k, interpolation));
    });

    Ok(())
}
