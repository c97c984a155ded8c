use photoreg_image::{Image, ImageError, Rect};
use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

/// Crop an image to a specified region.
///
/// # Arguments
///
/// * `src` - The source image to crop.
/// * `dst` - The destination image to store the cropped image.
/// * `x` - The x-coordinate of the top-left corner of the region to crop.
/// * `y` - The y-coordinate of the top-left corner of the region to crop.
///
/// # Errors
///
/// Returns an error if the region `(x, y, dst.width, dst.height)` does not fit in `src`.
///
/// # Examples
///
/// ```rust
/// use photoreg_image::{Image, ImageSize};
/// use photoreg_imgproc::crop::crop_image;
///
/// let image = Image::<_, 1>::new(ImageSize { width: 4, height: 4 }, vec![
///     0u8, 1, 2, 3,
///     4u8, 5, 6, 7,
///     8u8, 9, 10, 11,
///     12u8, 13, 14, 15
/// ]).unwrap();
///
/// let mut cropped = Image::<_, 1>::from_size_val(ImageSize { width: 2, height: 2 }, 0u8).unwrap();
///
/// crop_image(&image, &mut cropped, 1, 1).unwrap();
///
/// assert_eq!(cropped.as_slice(), &[5u8, 6, 9, 10]);
/// ```
pub fn crop_image<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    x: usize,
    y: usize,
) -> Result<(), ImageError>
where
    T: Copy + Send + Sync,
{
    Rect::new(x, y, dst.width(), dst.height()).validate(src.size())?;

    let dst_cols = dst.cols();
    let src_cols = src.cols();

    dst.as_slice_mut()
        .par_chunks_exact_mut(dst_cols * C)
        .enumerate()
        .for_each(|(i, dst_row)| {
            // top left corner of the row in the source
            let offset = (y + i) * src_cols * C + x * C;
            let src_slice = &src.as_slice()[offset..offset + dst_cols * C];
            dst_row.copy_from_slice(src_slice);
        });

    Ok(())
}

/// Crop a rectangle out of an image into a newly allocated image.
///
/// # Errors
///
/// Returns an error if the rectangle is empty or exceeds the image bounds.
pub fn crop_rect<T, const C: usize>(src: &Image<T, C>, rect: &Rect) -> Result<Image<T, C>, ImageError>
where
    T: Copy + Default + Send + Sync,
{
    rect.validate(src.size())?;
    let mut dst = Image::from_size_val(rect.size(), T::default())?;
    crop_image(src, &mut dst, rect.x, rect.y)?;
    Ok(dst)
}
