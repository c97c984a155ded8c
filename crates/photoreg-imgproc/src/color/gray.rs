use crate::parallel;
use photoreg_image::{Image, ImageError};

/// Define the RGB weights for the grayscale conversion.
const RW: f64 = 0.299;
const GW: f64 = 0.587;
const BW: f64 = 0.114;

/// Convert an RGB image to grayscale using the formula:
///
/// Y = 0.299 * R + 0.587 * G + 0.114 * B
///
/// # Arguments
///
/// * `src` - The input RGB image.
/// * `dst` - The output grayscale image.
///
/// Precondition: the input and output images must have the same size.
///
/// # Example
///
/// ```
/// use photoreg_image::{Image, ImageSize};
/// use photoreg_imgproc::color::gray_from_rgb;
///
/// let image = Image::<f32, 3>::new(
///     ImageSize {
///         width: 4,
///         height: 5,
///     },
///     vec![0f32; 4 * 5 * 3],
/// )
/// .unwrap();
///
/// let mut gray = Image::<f32, 1>::from_size_val(image.size(), 0.0).unwrap();
///
/// gray_from_rgb(&image, &mut gray).unwrap();
/// assert_eq!(gray.num_channels(), 1);
/// assert_eq!(gray.size().width, 4);
/// assert_eq!(gray.size().height, 5);
/// ```
pub fn gray_from_rgb<T>(src: &Image<T, 3>, dst: &mut Image<T, 1>) -> Result<(), ImageError>
where
    T: Send + Sync + num_traits::Float,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let rw = T::from(RW).ok_or(ImageError::CastError)?;
    let gw = T::from(GW).ok_or(ImageError::CastError)?;
    let bw = T::from(BW).ok_or(ImageError::CastError)?;

    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        dst_pixel[0] = rw * src_pixel[0] + gw * src_pixel[1] + bw * src_pixel[2];
    });

    Ok(())
}

/// Convert an 8-bit gray or RGB image into a normalized `f32` gray image in `[0, 1]`.
///
/// # Errors
///
/// Returns [`ImageError::UnsupportedChannels`] for anything other than 1 or 3 channels.
///
/// # Example
///
/// ```
/// use photoreg_image::Image;
/// use photoreg_imgproc::color::gray_f32_from_u8;
///
/// let rgb = Image::<u8, 3>::new([1, 1].into(), vec![255, 255, 255]).unwrap();
/// let gray = gray_f32_from_u8(&rgb).unwrap();
/// assert!((gray.as_slice()[0] - 1.0).abs() < 1e-6);
/// ```
pub fn gray_f32_from_u8<const C: usize>(src: &Image<u8, C>) -> Result<Image<f32, 1>, ImageError> {
    let mut dst = Image::from_size_val(src.size(), 0.0f32)?;

    match C {
        1 => {
            parallel::par_iter_rows(src, &mut dst, |src_pixel, dst_pixel| {
                dst_pixel[0] = src_pixel[0] as f32 / 255.0;
            });
        }
        3 => {
            let (rw, gw, bw) = (RW as f32, GW as f32, BW as f32);
            parallel::par_iter_rows(src, &mut dst, |src_pixel, dst_pixel| {
                let r = src_pixel[0] as f32;
                let g = src_pixel[1] as f32;
                let b = src_pixel[2] as f32;
                dst_pixel[0] = (rw * r + gw * g + bw * b) / 255.0;
            });
        }
        c => return Err(ImageError::UnsupportedChannels(c)),
    }

    Ok(dst)
}
