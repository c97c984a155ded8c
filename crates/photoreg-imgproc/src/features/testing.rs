use photoreg_image::{Image, ImageError, ImageSize};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Piecewise constant texture of `block` sized squares with random gray levels.
pub(crate) fn blocky_texture(
    width: usize,
    height: usize,
    block: usize,
    seed: u64,
) -> Result<Image<f32, 1>, ImageError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let blocks_x = width.div_ceil(block);
    let blocks_y = height.div_ceil(block);
    let levels: Vec<f32> = (0..blocks_x * blocks_y)
        .map(|_| rng.random_range(0.0..1.0))
        .collect();

    let data = (0..width * height)
        .map(|i| {
            let (x, y) = (i % width, i / width);
            levels[(y / block) * blocks_x + x / block]
        })
        .collect();

    Image::new(ImageSize { width, height }, data)
}
