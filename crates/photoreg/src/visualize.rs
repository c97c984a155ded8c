use photoreg_image::{Image, ImageSize};
use photoreg_imgproc::draw::{draw_filled_circle, draw_line};

use crate::error::RegistrationError;
use crate::pipeline::Registration;

const INLIER_COLOR: [u8; 3] = [0, 255, 0];
const OUTLIER_COLOR: [u8; 3] = [255, 0, 0];

/// Copy an image into the rgb canvas at column offset `x0`, replicating gray levels.
fn blit<const C: usize>(canvas: &mut Image<u8, 3>, image: &Image<u8, C>, x0: usize) {
    let canvas_cols = canvas.cols();
    let cols = image.cols();
    let src = image.as_slice();
    let dst = canvas.as_slice_mut();

    for y in 0..image.rows() {
        for x in 0..cols {
            let s = (y * cols + x) * C;
            let d = (y * canvas_cols + x0 + x) * 3;
            for c in 0..3 {
                dst[d + c] = src[s + c.min(C - 1)];
            }
        }
    }
}

/// Draw the correspondences of a registration side by side.
///
/// The source is drawn on the left and the destination on the right. Inlier
/// matches are joined by green lines and outliers by red lines.
///
/// # Errors
///
/// Channel counts other than 1 or 3.
pub fn draw_matches<const C: usize>(
    source: &Image<u8, C>,
    destination: &Image<u8, C>,
    registration: &Registration<C>,
) -> Result<Image<u8, 3>, RegistrationError> {
    if C != 1 && C != 3 {
        return Err(RegistrationError::UnsupportedChannels(C));
    }

    let size = ImageSize {
        width: source.width() + destination.width(),
        height: source.height().max(destination.height()),
    };
    let mut canvas = Image::<u8, 3>::from_size_val(size, 0)?;
    blit(&mut canvas, source, 0);
    blit(&mut canvas, destination, source.width());

    let offset = source.width() as f32;
    for (m, &inlier) in registration.matches.iter().zip(&registration.inliers) {
        let (Some(src_kp), Some(dst_kp)) = (
            registration.source_keypoints.get(m.query_idx),
            registration.destination_keypoints.get(m.train_idx),
        ) else {
            continue;
        };

        let p0 = (src_kp.x.round() as i64, src_kp.y.round() as i64);
        let p1 = ((dst_kp.x + offset).round() as i64, dst_kp.y.round() as i64);
        let color = if inlier { INLIER_COLOR } else { OUTLIER_COLOR };

        draw_line(&mut canvas, p0, p1, color, 1);
        draw_filled_circle(&mut canvas, p0, 2, color);
        draw_filled_circle(&mut canvas, p1, 2, color);
    }

    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Diagnostics, Status};
    use photoreg_geometry::IDENTITY;
    use photoreg_image::Rect;
    use photoreg_imgproc::features::{Keypoint, Match};

    fn keypoint(x: f32, y: f32) -> Keypoint {
        Keypoint {
            x,
            y,
            size: 1.0,
            angle: 0.0,
            response: 1.0,
            octave: 0,
        }
    }

    #[test]
    fn test_draw_matches() -> Result<(), RegistrationError> {
        let source = Image::<u8, 1>::from_size_val([20, 10].into(), 50)?;
        let destination = Image::<u8, 1>::from_size_val([20, 12].into(), 100)?;

        let registration = Registration::<1> {
            homography: IDENTITY,
            local_homography: IDENTITY,
            roi: Rect::full(source.size()),
            source_keypoints: vec![keypoint(5.0, 5.0), keypoint(10.0, 2.0)],
            destination_keypoints: vec![keypoint(5.0, 5.0), keypoint(10.0, 8.0)],
            matches: vec![
                Match {
                    query_idx: 0,
                    train_idx: 0,
                    distance: 0.0,
                },
                Match {
                    query_idx: 1,
                    train_idx: 1,
                    distance: 3.0,
                },
            ],
            inliers: vec![true, false],
            diagnostics: Diagnostics {
                status: Status::Success,
                reason: None,
                source_keypoints: 2,
                destination_keypoints: 2,
                match_count: 2,
                inlier_count: 1,
            },
            preview: None,
        };

        let canvas = draw_matches(&source, &destination, &registration)?;
        assert_eq!(canvas.size(), ImageSize { width: 40, height: 12 });

        let pixel = |x: usize, y: usize| {
            let idx = (y * 40 + x) * 3;
            [
                canvas.as_slice()[idx],
                canvas.as_slice()[idx + 1],
                canvas.as_slice()[idx + 2],
            ]
        };

        // background copies, gray replicated to rgb
        assert_eq!(pixel(0, 0), [50, 50, 50]);
        assert_eq!(pixel(39, 11), [100, 100, 100]);
        // the inlier runs horizontally along row 5, the outlier starts at (10, 2)
        assert_eq!(pixel(15, 5), INLIER_COLOR);
        assert_eq!(pixel(10, 2), OUTLIER_COLOR);
        // below the source there is no image
        assert_eq!(pixel(0, 11), [0, 0, 0]);
        Ok(())
    }
}
