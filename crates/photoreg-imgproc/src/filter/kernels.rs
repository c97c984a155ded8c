/// Create a gaussian blur kernel.
///
/// # Arguments
///
/// * `kernel_size` - The size of the kernel.
/// * `sigma` - The sigma of the gaussian kernel.
///
/// # Returns
///
/// A normalized vector of the kernel.
pub fn gaussian_kernel_1d(kernel_size: usize, sigma: f32) -> Vec<f32> {
    let mut kernel = Vec::with_capacity(kernel_size);

    let mean = (kernel_size.saturating_sub(1)) as f32 / 2.0;
    let sigma_sq = sigma * sigma;

    for i in 0..kernel_size {
        let x = i as f32 - mean;
        kernel.push((-(x * x) / (2.0 * sigma_sq)).exp());
    }

    let norm = kernel.iter().sum::<f32>();
    kernel.iter_mut().for_each(|k| *k /= norm);
    kernel
}

/// Odd kernel size covering +-4 sigma, used when a blur is requested with a zero kernel size.
pub fn gaussian_kernel_size(sigma: f32) -> usize {
    let size = (sigma * 8.0 + 1.0).round().max(3.0) as usize;
    size | 1
}

/// Create the normalized 3x3 scharr kernel as a (derivative, smoothing) pair.
pub fn scharr_kernel_1d() -> (Vec<f32>, Vec<f32>) {
    (vec![-0.5, 0.0, 0.5], vec![3.0 / 16.0, 10.0 / 16.0, 3.0 / 16.0])
}
