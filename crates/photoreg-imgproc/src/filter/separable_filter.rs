use photoreg_image::{Image, ImageError};
use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

/// Apply a separable filter to an image.
///
/// The horizontal kernel is applied first, then the vertical one. Pixels outside
/// the image are replicated from the nearest border pixel.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_x` - The horizontal kernel.
/// * `kernel_y` - The vertical kernel.
///
/// # Example
///
/// ```
/// use photoreg_image::Image;
/// use photoreg_imgproc::filter::separable_filter;
///
/// let src = Image::<f32, 1>::new([3, 1].into(), vec![0.0, 3.0, 0.0]).unwrap();
/// let mut dst = Image::<f32, 1>::from_size_val(src.size(), 0.0).unwrap();
///
/// separable_filter(&src, &mut dst, &[1.0 / 3.0; 3], &[1.0]).unwrap();
///
/// assert_eq!(dst.as_slice(), &[1.0, 1.0, 1.0]);
/// ```
pub fn separable_filter<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_x: &[f32],
    kernel_y: &[f32],
) -> Result<(), ImageError> {
    if kernel_x.is_empty() || kernel_y.is_empty() {
        return Err(ImageError::InvalidKernelLength(
            kernel_x.len(),
            kernel_y.len(),
        ));
    }

    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let (rows, cols) = (src.rows(), src.cols());
    if rows == 0 || cols == 0 {
        return Ok(());
    }

    let half_x = (kernel_x.len() / 2) as isize;
    let half_y = (kernel_y.len() / 2) as isize;
    let src_data = src.as_slice();

    // horizontal pass
    let mut temp = vec![0.0f32; src_data.len()];
    temp.par_chunks_exact_mut(cols * C)
        .enumerate()
        .for_each(|(r, temp_row)| {
            let src_row = &src_data[r * cols * C..(r + 1) * cols * C];
            for c in 0..cols {
                let mut acc = [0.0f32; C];
                for (k, &w) in kernel_x.iter().enumerate() {
                    let cc = (c as isize + k as isize - half_x).clamp(0, cols as isize - 1) as usize;
                    for (ch, a) in acc.iter_mut().enumerate() {
                        *a += src_row[cc * C + ch] * w;
                    }
                }
                temp_row[c * C..(c + 1) * C].copy_from_slice(&acc);
            }
        });

    // vertical pass
    dst.as_slice_mut()
        .par_chunks_exact_mut(cols * C)
        .enumerate()
        .for_each(|(r, dst_row)| {
            dst_row.iter_mut().for_each(|v| *v = 0.0);
            for (k, &w) in kernel_y.iter().enumerate() {
                let rr = (r as isize + k as isize - half_y).clamp(0, rows as isize - 1) as usize;
                let temp_row = &temp[rr * cols * C..(rr + 1) * cols * C];
                dst_row
                    .iter_mut()
                    .zip(temp_row.iter())
                    .for_each(|(d, &t)| *d += t * w);
            }
        });

    Ok(())
}
