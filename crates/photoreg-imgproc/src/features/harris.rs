use photoreg_image::Image;

/// Harris corner response of the `block_size` window centered at `(x, y)`.
///
/// Gradients are 3x3 sobel derivatives. The response is
/// `det(M) - k * trace(M)^2` where `M` is the structure tensor summed over the
/// window. Windows touching the image border yield zero.
///
/// # Arguments
///
/// * `src` - The gray image.
/// * `x` - Column of the window center.
/// * `y` - Row of the window center.
/// * `block_size` - Side of the square window, odd.
/// * `k` - Harris sensitivity, typically 0.04.
pub fn harris_response_at(src: &Image<f32, 1>, x: usize, y: usize, block_size: usize, k: f32) -> f32 {
    let (cols, rows) = (src.cols(), src.rows());
    let r = block_size / 2 + 1;
    if x < r || y < r || x + r >= cols || y + r >= rows {
        return 0.0;
    }

    let data = src.as_slice();
    let px = |xx: usize, yy: usize| data[yy * cols + xx];

    let (mut a, mut b, mut c) = (0.0f32, 0.0f32, 0.0f32);
    let half = block_size / 2;
    for yy in y - half..=y + half {
        for xx in x - half..=x + half {
            let dx = (px(xx + 1, yy - 1) + 2.0 * px(xx + 1, yy) + px(xx + 1, yy + 1))
                - (px(xx - 1, yy - 1) + 2.0 * px(xx - 1, yy) + px(xx - 1, yy + 1));
            let dy = (px(xx - 1, yy + 1) + 2.0 * px(xx, yy + 1) + px(xx + 1, yy + 1))
                - (px(xx - 1, yy - 1) + 2.0 * px(xx, yy - 1) + px(xx + 1, yy - 1));
            a += dx * dx;
            b += dy * dy;
            c += dx * dy;
        }
    }

    // keep the response independent of the window area
    let scale = 1.0 / (4.0 * block_size as f32 * block_size as f32);
    let (a, b, c) = (a * scale, b * scale, c * scale);

    a * b - c * c - k * (a + b) * (a + b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use photoreg_image::ImageError;

    #[test]
    fn test_harris_corner_edge_flat() -> Result<(), ImageError> {
        let size = 21;
        let mut data = vec![0.0f32; size * size];
        for y in 10..size {
            for x in 10..size {
                data[y * size + x] = 1.0;
            }
        }
        let img = Image::<f32, 1>::new([size, size].into(), data)?;

        let corner = harris_response_at(&img, 10, 10, 7, 0.04);
        let edge = harris_response_at(&img, 15, 10, 7, 0.04);
        let flat = harris_response_at(&img, 4, 4, 7, 0.04);
        let border = harris_response_at(&img, 1, 1, 7, 0.04);

        assert!(corner > 0.0);
        assert!(edge < 0.0);
        assert_eq!(flat, 0.0);
        assert_eq!(border, 0.0);
        Ok(())
    }
}
