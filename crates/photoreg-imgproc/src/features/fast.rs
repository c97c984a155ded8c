use photoreg_image::Image;
use rayon::prelude::*;

/// Offsets (dx, dy) of the 16 pixel Bresenham circle of radius 3, clockwise from the top.
const CIRCLE: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// A FAST corner with its score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FastCorner {
    /// Column of the corner.
    pub x: usize,
    /// Row of the corner.
    pub y: usize,
    /// Sum of absolute differences over the best contiguous arc, minus the threshold.
    pub score: f32,
}

/// Corner score of the pixel at `idx`, zero when it is not a corner.
#[inline]
fn fast_corner_score(
    src: &[f32],
    idx: usize,
    offsets: &[isize; 16],
    threshold: f32,
    arc_length: usize,
) -> f32 {
    let center = src[idx];
    let lower = center - threshold;
    let upper = center + threshold;

    let pixel = |k: usize| src[(idx as isize + offsets[k]) as usize];

    // high speed test on the four compass points
    let compass = [pixel(0), pixel(4), pixel(8), pixel(12)];
    let n_bright = compass.iter().filter(|&&p| p > upper).count();
    let n_dark = compass.iter().filter(|&&p| p < lower).count();
    let min_compass = if arc_length >= 12 { 3 } else { 2 };
    if n_bright < min_compass && n_dark < min_compass {
        return 0.0;
    }

    let mut pixels = [0.0f32; 16];
    let mut bright = 0u16;
    let mut dark = 0u16;
    for (k, p) in pixels.iter_mut().enumerate() {
        *p = pixel(k);
        if *p > upper {
            bright |= 1 << k;
        } else if *p < lower {
            dark |= 1 << k;
        }
    }

    let window = ((1u32 << arc_length) - 1) as u16;
    let mut best = 0.0f32;
    for shift in 0..16 {
        let mask = window.rotate_left(shift);
        if bright & mask == mask || dark & mask == mask {
            let score = (0..arc_length)
                .map(|k| (pixels[(shift as usize + k) % 16] - center).abs() - threshold)
                .sum::<f32>();
            best = best.max(score);
        }
    }

    best
}

/// Compute the FAST corner score of every pixel.
///
/// # Arguments
///
/// * `src` - The gray image with values in `[0, 1]`.
/// * `threshold` - Minimum intensity difference to the center pixel.
/// * `arc_length` - Number of contiguous circle pixels that must all be brighter or darker.
///
/// # Returns
///
/// A row-major score map with the size of `src`; non corners and the 3 pixel border are zero.
pub fn fast_score_map(src: &Image<f32, 1>, threshold: f32, arc_length: usize) -> Vec<f32> {
    let (cols, rows) = (src.cols(), src.rows());
    let mut scores = vec![0.0f32; cols * rows];
    if cols < 7 || rows < 7 || arc_length == 0 || arc_length > 16 {
        return scores;
    }

    let offsets = CIRCLE.map(|(dx, dy)| dy as isize * cols as isize + dx as isize);
    let data = src.as_slice();

    scores
        .par_chunks_exact_mut(cols)
        .enumerate()
        .skip(3)
        .take(rows - 6)
        .for_each(|(y, row)| {
            for (x, score) in row.iter_mut().enumerate().take(cols - 3).skip(3) {
                *score = fast_corner_score(data, y * cols + x, &offsets, threshold, arc_length);
            }
        });

    scores
}

/// FAST corner detector with optional 3x3 non-maximum suppression.
///
/// # Arguments
///
/// * `src` - The gray image with values in `[0, 1]`.
/// * `threshold` - Minimum intensity difference to the center pixel.
/// * `arc_length` - Number of contiguous circle pixels that must all be brighter or darker.
/// * `nms` - Keep only the strongest corner of each 3x3 neighbourhood.
///
/// # Returns
///
/// The detected corners in row-major order.
pub fn fast_corners(
    src: &Image<f32, 1>,
    threshold: f32,
    arc_length: usize,
    nms: bool,
) -> Vec<FastCorner> {
    let cols = src.cols();
    let scores = fast_score_map(src, threshold, arc_length);

    if !nms {
        return scores
            .iter()
            .enumerate()
            .filter(|(_, &s)| s > 0.0)
            .map(|(idx, &score)| FastCorner {
                x: idx % cols,
                y: idx / cols,
                score,
            })
            .collect();
    }

    score_map_maxima(&scores, cols)
}

/// Positive entries of a FAST score map that dominate their 3x3 neighbourhood.
///
/// The score map must be zero on its 1 pixel border, as produced by [`fast_score_map`].
pub(crate) fn score_map_maxima(scores: &[f32], cols: usize) -> Vec<FastCorner> {
    scores
        .iter()
        .enumerate()
        .filter(|(_, &s)| s > 0.0)
        .map(|(idx, &score)| FastCorner {
            x: idx % cols,
            y: idx / cols,
            score,
        })
        .filter(|c| {
            // ties are broken towards the earlier pixel in row-major order
            (-1i32..=1).all(|dy| {
                (-1i32..=1).all(|dx| {
                    if dx == 0 && dy == 0 {
                        return true;
                    }
                    let nidx = ((c.y as i32 + dy) as usize) * cols + (c.x as i32 + dx) as usize;
                    let other = scores[nidx];
                    let earlier = dy < 0 || (dy == 0 && dx < 0);
                    if earlier {
                        c.score > other
                    } else {
                        c.score >= other
                    }
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use photoreg_image::ImageError;

    fn from_u8(size: usize, data: Vec<u8>) -> Result<Image<f32, 1>, ImageError> {
        Image::new(
            [size, size].into(),
            data.into_iter().map(|v| v as f32 / 255.0).collect(),
        )
    }

    #[test]
    fn test_fast_corners_blob() -> Result<(), ImageError> {
        #[rustfmt::skip]
        let img = from_u8(7, vec![
            50,  50,  50,  50,  50,  50,  50,
            50,  50,  50,  50,  50,  50,  50,
            50,  50,  50, 200,  50,  50,  50,
            50,  50, 200, 200, 200,  50,  50,
            50,  50,  50, 200,  50,  50,  50,
            50,  50,  50,  50,  50,  50,  50,
            50,  50,  50,  50,  50,  50,  50,
        ])?;
        let corners = fast_corners(&img, 100.0 / 255.0, 9, false);
        assert_eq!(corners.len(), 1);
        assert_eq!((corners[0].x, corners[0].y), (3, 3));
        assert!(corners[0].score > 0.0);
        Ok(())
    }

    #[test]
    fn test_fast_corners_edge_is_not_corner() -> Result<(), ImageError> {
        #[rustfmt::skip]
        let img = from_u8(7, vec![
            200, 200, 200,  50,  50,  50,  50,
            200, 200, 200,  50,  50,  50,  50,
            200, 200, 200,  50,  50,  50,  50,
            200, 200, 200,  50,  50,  50,  50,
            200, 200, 200,  50,  50,  50,  50,
            200, 200, 200,  50,  50,  50,  50,
            200, 200, 200,  50,  50,  50,  50,
        ])?;
        assert!(fast_corners(&img, 100.0 / 255.0, 9, true).is_empty());
        Ok(())
    }

    #[test]
    fn test_fast_corners_nms_square() -> Result<(), ImageError> {
        // a bright square on a dark background: one response per square corner
        let size = 21;
        let mut data = vec![0.0f32; size * size];
        for y in 7..14 {
            for x in 7..14 {
                data[y * size + x] = 1.0;
            }
        }
        let img = Image::<f32, 1>::new([size, size].into(), data)?;

        let corners = fast_corners(&img, 0.3, 9, true);
        assert_eq!(corners.len(), 4);
        for (cx, cy) in [(7, 7), (13, 7), (7, 13), (13, 13)] {
            let near = corners
                .iter()
                .filter(|c| c.x.abs_diff(cx) <= 2 && c.y.abs_diff(cy) <= 2)
                .count();
            assert_eq!(near, 1);
        }
        Ok(())
    }

    #[test]
    fn test_fast_flat_image() -> Result<(), ImageError> {
        let img = Image::<f32, 1>::from_size_val([32, 32].into(), 0.5)?;
        assert!(fast_corners(&img, 0.05, 9, true).is_empty());
        Ok(())
    }
}
