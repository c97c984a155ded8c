use std::f32::consts::PI;

use log::debug;
use photoreg_image::{Image, ImageError, ImageSize};
use rayon::prelude::*;

use super::{DescriptorKind, Descriptors, FeatureExtractor, Features, Keypoint};
use crate::{filter::gaussian_blur, interpolation::InterpolationMode, resize::resize_native};

/// Length of a SIFT descriptor.
pub const SIFT_DESCRIPTOR_SIZE: usize = DESCR_WIDTH * DESCR_WIDTH * DESCR_HIST_BINS;

/// Assumed blur of the input image.
const INIT_SIGMA: f32 = 0.5;
/// Width of the border where no extremum is searched.
const IMG_BORDER: usize = 5;
const MAX_INTERP_STEPS: usize = 5;

const ORI_HIST_BINS: usize = 36;
const ORI_SIG_FCTR: f32 = 1.5;
const ORI_RADIUS: f32 = 3.0 * ORI_SIG_FCTR;
const ORI_PEAK_RATIO: f32 = 0.8;

const DESCR_WIDTH: usize = 4;
const DESCR_HIST_BINS: usize = 8;
const DESCR_SCL_FCTR: f32 = 3.0;
const DESCR_MAG_THR: f32 = 0.2;

/// Scale invariant feature transform extractor.
#[derive(Clone, Debug)]
pub struct SiftDetector {
    /// Number of layers per octave where extrema are searched.
    pub n_octave_layers: usize,
    /// Minimum absolute DoG response, relative to a `[0, 1]` image.
    pub contrast_threshold: f32,
    /// Maximum ratio of principal curvatures.
    pub edge_threshold: f32,
    /// Blur of the first layer of every octave.
    pub sigma: f32,
    /// Keep only the strongest keypoints, zero keeps all.
    pub max_features: usize,
    /// Start the scale space from the image upsampled by two.
    pub upscale_first_octave: bool,
}

impl Default for SiftDetector {
    fn default() -> Self {
        Self {
            n_octave_layers: 3,
            contrast_threshold: 0.04,
            edge_threshold: 10.0,
            sigma: 1.6,
            max_features: 0,
            upscale_first_octave: true,
        }
    }
}

struct Octave {
    gaussians: Vec<Image<f32, 1>>,
    dogs: Vec<Image<f32, 1>>,
}

/// A refined extremum in octave coordinates.
#[derive(Clone, Copy, Debug)]
struct Extremum {
    octave: usize,
    layer: usize,
    x: usize,
    y: usize,
    offset: [f32; 3],
    response: f32,
}

impl Extremum {
    /// Scale of the extremum in octave pixels.
    fn octave_scale(&self, sigma: f32, n_layers: usize) -> f32 {
        sigma * 2f32.powf((self.layer as f32 + self.offset[2]) / n_layers as f32)
    }
}

impl SiftDetector {
    /// Create a detector with the default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    fn layer_sigmas(&self) -> Vec<f32> {
        let n = self.n_octave_layers;
        let k = 2f32.powf(1.0 / n as f32);
        let mut sigmas = vec![self.sigma; n + 3];
        for (i, s) in sigmas.iter_mut().enumerate().skip(1) {
            let sig_prev = self.sigma * k.powi(i as i32 - 1);
            let sig_total = sig_prev * k;
            *s = (sig_total * sig_total - sig_prev * sig_prev).sqrt();
        }
        sigmas
    }

    /// The blurred first image of the scale space.
    fn base_image(&self, src: &Image<f32, 1>) -> Result<Image<f32, 1>, ImageError> {
        let (input, init_sigma) = if self.upscale_first_octave {
            let size = ImageSize {
                width: 2 * src.width(),
                height: 2 * src.height(),
            };
            let mut upscaled = Image::from_size_val(size, 0.0)?;
            resize_native(src, &mut upscaled, InterpolationMode::Bilinear)?;
            (upscaled, 2.0 * INIT_SIGMA)
        } else {
            (src.clone(), INIT_SIGMA)
        };

        let sigma_diff = (self.sigma * self.sigma - init_sigma * init_sigma)
            .max(0.01)
            .sqrt();
        let mut base = Image::from_size_val(input.size(), 0.0)?;
        gaussian_blur(&input, &mut base, (0, 0), (sigma_diff, sigma_diff))?;
        Ok(base)
    }

    /// Map a point of the first octave back to input image coordinates.
    fn to_input_coords(&self, v: f32) -> f32 {
        if self.upscale_first_octave {
            // inverse of the half pixel centered bilinear upsampling
            0.5 * v - 0.25
        } else {
            v
        }
    }

    fn build_scale_space(&self, src: &Image<f32, 1>) -> Result<Vec<Octave>, ImageError> {
        let min_octave_side = 2 * IMG_BORDER + 3;
        if src.width().min(src.height()) == 0 {
            return Ok(Vec::new());
        }

        let base = self.base_image(src)?;
        let min_side = base.width().min(base.height());
        if min_side < min_octave_side {
            return Ok(Vec::new());
        }

        let n_octaves = ((min_side as f32).log2().floor() as usize).saturating_sub(2).max(1);
        let sigmas = self.layer_sigmas();

        let mut octaves: Vec<Octave> = Vec::with_capacity(n_octaves);
        for o in 0..n_octaves {
            let first = match octaves.last() {
                None => base.clone(),
                Some(previous) => downsample_by_two(&previous.gaussians[self.n_octave_layers])?,
            };
            if first.width().min(first.height()) < min_octave_side {
                break;
            }

            let mut gaussians = Vec::with_capacity(self.n_octave_layers + 3);
            gaussians.push(first);
            for &sigma in sigmas.iter().skip(1) {
                let Some(previous) = gaussians.last() else {
                    break;
                };
                let mut blurred = Image::from_size_val(previous.size(), 0.0)?;
                gaussian_blur(previous, &mut blurred, (0, 0), (sigma, sigma))?;
                gaussians.push(blurred);
            }

            let dogs = gaussians
                .windows(2)
                .map(|pair| {
                    let data = pair[1]
                        .as_slice()
                        .iter()
                        .zip(pair[0].as_slice())
                        .map(|(&b, &a)| b - a)
                        .collect();
                    Image::new(pair[0].size(), data)
                })
                .collect::<Result<Vec<_>, _>>()?;

            debug!("sift: octave {o} size {}", gaussians[0].size());
            octaves.push(Octave { gaussians, dogs });
        }

        Ok(octaves)
    }

    fn find_extrema(&self, octaves: &[Octave], o: usize, layer: usize) -> Vec<Extremum> {
        let octave = &octaves[o];
        let (prev, curr, next) = (
            &octave.dogs[layer - 1],
            &octave.dogs[layer],
            &octave.dogs[layer + 1],
        );
        let (cols, rows) = (curr.cols(), curr.rows());
        let threshold = 0.5 * self.contrast_threshold / self.n_octave_layers as f32;

        let mut extrema = Vec::new();
        for y in IMG_BORDER..rows - IMG_BORDER {
            for x in IMG_BORDER..cols - IMG_BORDER {
                let val = curr.as_slice()[y * cols + x];
                if val.abs() <= threshold {
                    continue;
                }

                let is_extremum = [prev, curr, next].iter().all(|img| {
                    (y - 1..=y + 1).all(|yy| {
                        (x - 1..=x + 1).all(|xx| {
                            let other = img.as_slice()[yy * cols + xx];
                            if val > 0.0 {
                                val >= other
                            } else {
                                val <= other
                            }
                        })
                    })
                });

                if is_extremum {
                    if let Some(extremum) = self.refine_extremum(octave, o, layer, x, y) {
                        extrema.push(extremum);
                    }
                }
            }
        }

        extrema
    }

    /// Fit a 3d quadratic around the discrete extremum and reject weak or edge-like ones.
    fn refine_extremum(
        &self,
        octave: &Octave,
        o: usize,
        layer: usize,
        x: usize,
        y: usize,
    ) -> Option<Extremum> {
        let n_layers = self.n_octave_layers;
        let (cols, rows) = (octave.dogs[0].cols(), octave.dogs[0].rows());
        let (mut x, mut y, mut layer) = (x as i64, y as i64, layer as i64);

        let mut offset = [0.0f32; 3];
        let mut converged = false;
        for _ in 0..MAX_INTERP_STEPS {
            let (grad, hessian) = dog_derivatives(octave, layer as usize, x as usize, y as usize);
            let [a, b, c] = solve3(&hessian, &grad)?;
            offset = [-a, -b, -c];

            if offset.iter().all(|v| v.abs() < 0.5) {
                converged = true;
                break;
            }
            if offset.iter().any(|v| v.abs() > (cols.max(rows)) as f32) {
                return None;
            }

            x += offset[0].round() as i64;
            y += offset[1].round() as i64;
            layer += offset[2].round() as i64;

            if layer < 1
                || layer > n_layers as i64
                || x < IMG_BORDER as i64
                || x >= (cols - IMG_BORDER) as i64
                || y < IMG_BORDER as i64
                || y >= (rows - IMG_BORDER) as i64
            {
                return None;
            }
        }

        if !converged {
            return None;
        }

        let (layer, x, y) = (layer as usize, x as usize, y as usize);
        let (grad, hessian) = dog_derivatives(octave, layer, x, y);
        let value = octave.dogs[layer].as_slice()[y * cols + x];
        let contrast = value + 0.5 * (grad[0] * offset[0] + grad[1] * offset[1] + grad[2] * offset[2]);
        if contrast.abs() * (n_layers as f32) < self.contrast_threshold {
            return None;
        }

        // principal curvature ratio on the 2x2 spatial hessian
        let (dxx, dyy, dxy) = (hessian[0][0], hessian[1][1], hessian[0][1]);
        let trace = dxx + dyy;
        let det = dxx * dyy - dxy * dxy;
        let edge = self.edge_threshold;
        if det <= 0.0 || trace * trace * edge >= (edge + 1.0) * (edge + 1.0) * det {
            return None;
        }

        Some(Extremum {
            octave: o,
            layer,
            x,
            y,
            offset,
            response: contrast.abs(),
        })
    }

    fn describe_extremum(&self, octaves: &[Octave], e: &Extremum) -> Vec<(Keypoint, Vec<f32>)> {
        let gauss = &octaves[e.octave].gaussians[e.layer];
        let scl_octv = e.octave_scale(self.sigma, self.n_octave_layers);
        let octave_factor = (1usize << e.octave) as f32;
        let size_factor = if self.upscale_first_octave {
            0.5 * octave_factor
        } else {
            octave_factor
        };

        let hist = orientation_histogram(
            gauss,
            e.x,
            e.y,
            (ORI_RADIUS * scl_octv).round() as i64,
            ORI_SIG_FCTR * scl_octv,
        );
        let omax = hist.iter().copied().fold(0.0f32, f32::max);
        if omax <= 0.0 {
            return Vec::new();
        }

        let n = ORI_HIST_BINS;
        let mut out = Vec::new();
        for j in 0..n {
            let left = hist[(j + n - 1) % n];
            let right = hist[(j + 1) % n];
            if hist[j] > left && hist[j] > right && hist[j] >= ORI_PEAK_RATIO * omax {
                let bin = j as f32 + 0.5 * (left - right) / (left - 2.0 * hist[j] + right);
                let bin = bin.rem_euclid(n as f32);
                let angle = 2.0 * PI * bin / n as f32;

                let keypoint = Keypoint {
                    x: self.to_input_coords((e.x as f32 + e.offset[0]) * octave_factor),
                    y: self.to_input_coords((e.y as f32 + e.offset[1]) * octave_factor),
                    size: 2.0 * scl_octv * size_factor,
                    angle,
                    response: e.response,
                    octave: e.octave,
                };
                let descriptor = sift_descriptor(gauss, e.x, e.y, angle, scl_octv);
                out.push((keypoint, descriptor));
            }
        }

        out
    }
}

impl FeatureExtractor for SiftDetector {
    fn detect_and_compute(&self, image: &Image<f32, 1>) -> Result<Features, ImageError> {
        let octaves = self.build_scale_space(image)?;

        let tasks = (0..octaves.len())
            .flat_map(|o| (1..=self.n_octave_layers).map(move |layer| (o, layer)))
            .collect::<Vec<_>>();

        let mut described = tasks
            .par_iter()
            .flat_map_iter(|&(o, layer)| {
                self.find_extrema(&octaves, o, layer)
                    .into_iter()
                    .flat_map(|e| self.describe_extremum(&octaves, &e))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        // stable, so equal responses keep their scale space order
        described.sort_by(|a, b| b.0.response.total_cmp(&a.0.response));
        if self.max_features > 0 {
            described.truncate(self.max_features);
        }

        debug!(
            "sift: {} keypoints over {} octaves",
            described.len(),
            octaves.len()
        );

        let (keypoints, descriptors): (Vec<_>, Vec<_>) = described.into_iter().unzip();
        Ok(Features {
            keypoints,
            descriptors: Descriptors::Float(descriptors),
        })
    }

    fn descriptor_kind(&self) -> DescriptorKind {
        DescriptorKind::Float
    }
}

/// Keep every other pixel.
fn downsample_by_two(src: &Image<f32, 1>) -> Result<Image<f32, 1>, ImageError> {
    let size = ImageSize {
        width: src.width() / 2,
        height: src.height() / 2,
    };
    let cols = src.cols();
    let data = (0..size.height)
        .flat_map(|y| (0..size.width).map(move |x| (2 * y) * cols + 2 * x))
        .map(|idx| src.as_slice()[idx])
        .collect();
    Image::new(size, data)
}

/// Gradient and hessian of the DoG at `(x, y, layer)` with central differences.
fn dog_derivatives(octave: &Octave, layer: usize, x: usize, y: usize) -> ([f32; 3], [[f32; 3]; 3]) {
    let cols = octave.dogs[layer].cols();
    let at = |l: usize, xx: usize, yy: usize| octave.dogs[l].as_slice()[yy * cols + xx];

    let v = at(layer, x, y);
    let dx = (at(layer, x + 1, y) - at(layer, x - 1, y)) * 0.5;
    let dy = (at(layer, x, y + 1) - at(layer, x, y - 1)) * 0.5;
    let ds = (at(layer + 1, x, y) - at(layer - 1, x, y)) * 0.5;

    let dxx = at(layer, x + 1, y) + at(layer, x - 1, y) - 2.0 * v;
    let dyy = at(layer, x, y + 1) + at(layer, x, y - 1) - 2.0 * v;
    let dss = at(layer + 1, x, y) + at(layer - 1, x, y) - 2.0 * v;
    let dxy = (at(layer, x + 1, y + 1) - at(layer, x - 1, y + 1) - at(layer, x + 1, y - 1)
        + at(layer, x - 1, y - 1))
        * 0.25;
    let dxs = (at(layer + 1, x + 1, y) - at(layer + 1, x - 1, y) - at(layer - 1, x + 1, y)
        + at(layer - 1, x - 1, y))
        * 0.25;
    let dys = (at(layer + 1, x, y + 1) - at(layer + 1, x, y - 1) - at(layer - 1, x, y + 1)
        + at(layer - 1, x, y - 1))
        * 0.25;

    #[rustfmt::skip]
    let hessian = [
        [dxx, dxy, dxs],
        [dxy, dyy, dys],
        [dxs, dys, dss],
    ];
    ([dx, dy, ds], hessian)
}

/// Solve `m * x = b` with Cramer's rule.
fn solve3(m: &[[f32; 3]; 3], b: &[f32; 3]) -> Option<[f32; 3]> {
    let det = |m: &[[f32; 3]; 3]| {
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    };

    let d = det(m);
    if d.abs() < f32::EPSILON * 1e-3 || !d.is_finite() {
        return None;
    }

    let mut x = [0.0f32; 3];
    for (col, xi) in x.iter_mut().enumerate() {
        let mut mc = *m;
        for row in 0..3 {
            mc[row][col] = b[row];
        }
        *xi = det(&mc) / d;
    }
    Some(x)
}

/// Smoothed histogram of gradient orientations weighted by magnitude.
fn orientation_histogram(src: &Image<f32, 1>, x: usize, y: usize, radius: i64, sigma: f32) -> Vec<f32> {
    let (cols, rows) = (src.cols() as i64, src.rows() as i64);
    let data = src.as_slice();
    let n = ORI_HIST_BINS;
    let exp_scale = -1.0 / (2.0 * sigma * sigma);

    let mut raw = vec![0.0f32; n];
    for i in -radius..=radius {
        let yy = y as i64 + i;
        if yy <= 0 || yy >= rows - 1 {
            continue;
        }
        for j in -radius..=radius {
            let xx = x as i64 + j;
            if xx <= 0 || xx >= cols - 1 {
                continue;
            }
            let idx = (yy * cols + xx) as usize;
            let dx = data[idx + 1] - data[idx - 1];
            let dy = data[idx + cols as usize] - data[idx - cols as usize];
            let weight = (((i * i + j * j) as f32) * exp_scale).exp();
            let angle = dy.atan2(dx);
            let bin = ((n as f32 * angle / (2.0 * PI)).round() as i64).rem_euclid(n as i64) as usize;
            raw[bin] += weight * (dx * dx + dy * dy).sqrt();
        }
    }

    // circular [1 4 6 4 1] smoothing
    (0..n)
        .map(|k| {
            let at = |d: i64| raw[(k as i64 + d).rem_euclid(n as i64) as usize];
            (at(-2) + at(2)) * (1.0 / 16.0) + (at(-1) + at(1)) * (4.0 / 16.0) + at(0) * (6.0 / 16.0)
        })
        .collect()
}

/// 4x4 spatial cells of 8 orientation bins, trilinearly interpolated.
fn sift_descriptor(src: &Image<f32, 1>, x: usize, y: usize, angle: f32, scl_octv: f32) -> Vec<f32> {
    let (cols, rows) = (src.cols() as i64, src.rows() as i64);
    let data = src.as_slice();
    let d = DESCR_WIDTH;
    let n = DESCR_HIST_BINS;

    let hist_width = DESCR_SCL_FCTR * scl_octv;
    let diagonal = ((cols * cols + rows * rows) as f32).sqrt();
    let radius = (hist_width * std::f32::consts::SQRT_2 * (d as f32 + 1.0) * 0.5)
        .round()
        .min(diagonal) as i64;

    let (sin_t, cos_t) = angle.sin_cos();
    let (sin_t, cos_t) = (sin_t / hist_width, cos_t / hist_width);
    let bins_per_rad = n as f32 / (2.0 * PI);
    let exp_scale = -1.0 / (d as f32 * d as f32 * 0.5);

    let mut hist = vec![0.0f32; d * d * n];
    let mut add = |r: i64, c: i64, o: i64, v: f32| {
        if r >= 0 && r < d as i64 && c >= 0 && c < d as i64 {
            let o = o.rem_euclid(n as i64) as usize;
            hist[(r as usize * d + c as usize) * n + o] += v;
        }
    };

    for i in -radius..=radius {
        for j in -radius..=radius {
            // sample offset expressed in the keypoint frame, in cell units
            let c_rot = j as f32 * cos_t + i as f32 * sin_t;
            let r_rot = -(j as f32) * sin_t + i as f32 * cos_t;
            let rbin = r_rot + d as f32 / 2.0 - 0.5;
            let cbin = c_rot + d as f32 / 2.0 - 0.5;

            let (yy, xx) = (y as i64 + i, x as i64 + j);
            if rbin <= -1.0
                || rbin >= d as f32
                || cbin <= -1.0
                || cbin >= d as f32
                || yy <= 0
                || yy >= rows - 1
                || xx <= 0
                || xx >= cols - 1
            {
                continue;
            }

            let idx = (yy * cols + xx) as usize;
            let dx = data[idx + 1] - data[idx - 1];
            let dy = data[idx + cols as usize] - data[idx - cols as usize];

            let magnitude = (dx * dx + dy * dy).sqrt()
                * ((c_rot * c_rot + r_rot * r_rot) * exp_scale).exp();
            let obin = (dy.atan2(dx) - angle).rem_euclid(2.0 * PI) * bins_per_rad;

            let (r0, c0, o0) = (rbin.floor(), cbin.floor(), obin.floor());
            let (fr, fc, fo) = (rbin - r0, cbin - c0, obin - o0);
            let (r0, c0, o0) = (r0 as i64, c0 as i64, o0 as i64);

            for (dr, wr) in [(0, 1.0 - fr), (1, fr)] {
                for (dc, wc) in [(0, 1.0 - fc), (1, fc)] {
                    for (dn, wo) in [(0, 1.0 - fo), (1, fo)] {
                        add(r0 + dr, c0 + dc, o0 + dn, magnitude * wr * wc * wo);
                    }
                }
            }
        }
    }

    // normalize, clip large gradients, renormalize
    let norm = hist.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        let threshold = DESCR_MAG_THR * norm;
        hist.iter_mut().for_each(|v| *v = v.min(threshold));
        let norm = hist.iter().map(|v| v * v).sum::<f32>().sqrt().max(f32::EPSILON);
        hist.iter_mut().for_each(|v| *v /= norm);
    }

    hist
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::testing::blocky_texture;
    use approx::assert_relative_eq;

    fn gaussian_blob(size: usize, sigma: f32) -> Result<Image<f32, 1>, ImageError> {
        let c = (size / 2) as f32;
        let data = (0..size * size)
            .map(|i| {
                let (x, y) = ((i % size) as f32 - c, (i / size) as f32 - c);
                (-(x * x + y * y) / (2.0 * sigma * sigma)).exp()
            })
            .collect();
        Image::new([size, size].into(), data)
    }

    #[test]
    fn test_layer_sigmas() {
        let sift = SiftDetector::default();
        let sigmas = sift.layer_sigmas();
        assert_eq!(sigmas.len(), 6);

        // blurring incrementally reaches sigma * 2 at layer n_octave_layers
        let total = sigmas
            .iter()
            .take(4)
            .map(|s| s * s)
            .sum::<f32>()
            .sqrt();
        assert_relative_eq!(total, 3.2, epsilon = 1e-4);
    }

    #[test]
    fn test_solve3() {
        let m = [[2.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 1.0]];
        let x = solve3(&m, &[2.0, 2.0, -3.0]).unwrap_or_default();
        assert_eq!(x, [1.0, 0.5, -3.0]);
        assert!(solve3(&[[0.0; 3]; 3], &[1.0, 1.0, 1.0]).is_none());
    }

    #[test]
    fn test_sift_blob_center() -> Result<(), ImageError> {
        let img = gaussian_blob(64, 4.0)?;
        let features = SiftDetector::default().detect_and_compute(&img)?;

        assert!(!features.is_empty());
        let found = features
            .keypoints
            .iter()
            .any(|kp| (kp.x - 32.0).abs() <= 2.0 && (kp.y - 32.0).abs() <= 2.0);
        assert!(found, "no keypoint near the blob center");
        Ok(())
    }

    #[test]
    fn test_sift_flat_image_is_empty() -> Result<(), ImageError> {
        let img = Image::<f32, 1>::from_size_val([64, 64].into(), 0.7)?;
        let features = SiftDetector::default().detect_and_compute(&img)?;
        assert!(features.is_empty());
        assert_eq!(features.descriptors.kind(), DescriptorKind::Float);
        Ok(())
    }

    #[test]
    fn test_sift_upscaled_first_octave_on_small_images() -> Result<(), ImageError> {
        let img = blocky_texture(48, 40, 4, 3)?;

        let upscaled = SiftDetector::default().detect_and_compute(&img)?;
        let native = SiftDetector {
            upscale_first_octave: false,
            ..Default::default()
        }
        .detect_and_compute(&img)?;

        assert!(!upscaled.is_empty());
        assert!(upscaled.len() >= native.len());
        assert!(upscaled
            .keypoints
            .iter()
            .all(|kp| kp.x >= -0.5 && kp.y >= -0.5 && kp.x < 48.0 && kp.y < 40.0));
        Ok(())
    }

    #[test]
    fn test_sift_descriptors_are_normalized() -> Result<(), ImageError> {
        let img = blocky_texture(96, 96, 8, 11)?;
        let sift = SiftDetector {
            max_features: 50,
            ..Default::default()
        };
        let features = sift.detect_and_compute(&img)?;
        assert!(!features.is_empty());
        assert!(features.len() <= 50);

        let Descriptors::Float(descriptors) = &features.descriptors else {
            panic!("sift must produce float descriptors");
        };
        for d in descriptors {
            assert_eq!(d.len(), SIFT_DESCRIPTOR_SIZE);
            let norm = d.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert_relative_eq!(norm, 1.0, epsilon = 1e-4);
        }
        Ok(())
    }
}
