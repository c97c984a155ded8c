use std::f32::consts::PI;

use log::debug;
use photoreg_image::{Image, ImageError, ImageSize};
use rayon::prelude::*;

use super::{DescriptorKind, Descriptors, FeatureExtractor, Features, Keypoint};
use crate::filter::{gaussian_blur, scharr_gradient};
use crate::interpolation::{bilinear_interpolation, InterpolationMode};
use crate::resize::resize_native;

/// Length of an M-SURF descriptor.
pub const AKAZE_DESCRIPTOR_SIZE: usize = 64;

/// Fallback contrast when the image has no gradient at all.
const DEFAULT_CONTRAST: f32 = 0.03;
const CONTRAST_BINS: usize = 300;
const MAX_EXPLICIT_TAU: f32 = 0.25;
const MIN_LEVEL_SIDE: usize = 24;
const LEVEL_BORDER: usize = 5;

/// Accelerated KAZE extractor.
///
/// Keypoints are maxima of the scale normalized Hessian determinant over a
/// nonlinear scale space built with Perona-Malik diffusion. Each keypoint
/// gets a SURF style dominant orientation and a 64 dimensional M-SURF
/// descriptor.
#[derive(Clone, Debug)]
pub struct AkazeDetector {
    /// Number of octaves of the scale space.
    pub n_octaves: usize,
    /// Number of sublevels per octave.
    pub n_sublevels: usize,
    /// Scale of the first level.
    pub base_sigma: f32,
    /// Minimum Hessian determinant response, relative to a `[0, 1]` image.
    pub threshold: f32,
    /// Percentile of the gradient histogram used as diffusion contrast.
    pub contrast_percentile: f32,
}

impl Default for AkazeDetector {
    fn default() -> Self {
        Self {
            n_octaves: 4,
            n_sublevels: 4,
            base_sigma: 1.6,
            threshold: 0.001,
            contrast_percentile: 0.7,
        }
    }
}

struct Level {
    lx: Image<f32, 1>,
    ly: Image<f32, 1>,
    response: Image<f32, 1>,
    esigma: f32,
    octave: usize,
}

impl Level {
    fn ratio(&self) -> f32 {
        (1usize << self.octave) as f32
    }

    /// Scale in pixels of this level.
    fn sigma(&self) -> f32 {
        self.esigma / self.ratio()
    }
}

impl AkazeDetector {
    /// Create a detector with the default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    fn build_scale_space(&self, src: &Image<f32, 1>) -> Result<Vec<Level>, ImageError> {
        if src.width().min(src.height()) < MIN_LEVEL_SIDE {
            return Ok(Vec::new());
        }

        let mut contrast = contrast_factor(src, self.contrast_percentile)?;

        let mut lt = Image::from_size_val(src.size(), 0.0)?;
        gaussian_blur(src, &mut lt, (0, 0), (self.base_sigma, self.base_sigma))?;

        let mut levels: Vec<Level> = Vec::new();
        let mut prev_time = 0.5 * self.base_sigma * self.base_sigma;

        'octaves: for o in 0..self.n_octaves.max(1) {
            for s in 0..self.n_sublevels.max(1) {
                let esigma =
                    self.base_sigma * 2f32.powf(o as f32 + s as f32 / self.n_sublevels as f32);
                let etime = 0.5 * esigma * esigma;

                if o > 0 && s == 0 {
                    let size = ImageSize {
                        width: lt.width() / 2,
                        height: lt.height() / 2,
                    };
                    if size.width.min(size.height) < MIN_LEVEL_SIDE {
                        break 'octaves;
                    }
                    let mut half = Image::from_size_val(size, 0.0)?;
                    resize_native(&lt, &mut half, InterpolationMode::Bilinear)?;
                    lt = half;
                    contrast *= 0.75;
                }

                if !levels.is_empty() {
                    // diffusion time in pixels of the current octave
                    let ratio = (1usize << o) as f32;
                    let dt = (etime - prev_time) / (ratio * ratio);
                    lt = nonlinear_diffusion(&lt, contrast, dt)?;
                }
                prev_time = etime;

                levels.push(hessian_level(&lt, esigma, o)?);
            }
        }

        debug!("akaze: {} levels, contrast {contrast:.4}", levels.len());
        Ok(levels)
    }

    fn find_extrema(&self, levels: &[Level], i: usize) -> Vec<Keypoint> {
        let level = &levels[i];
        let (cols, rows) = (level.response.cols(), level.response.rows());
        let border = LEVEL_BORDER.max(level.sigma().round() as usize);
        if cols <= 2 * border || rows <= 2 * border {
            return Vec::new();
        }

        let same_octave = |j: usize| levels.get(j).filter(|l| l.octave == level.octave);
        let neighbours = [i.checked_sub(1).and_then(same_octave), same_octave(i + 1)];

        let det = level.response.as_slice();
        let mut keypoints = Vec::new();
        for y in border..rows - border {
            for x in border..cols - border {
                let val = det[y * cols + x];
                if val <= self.threshold {
                    continue;
                }

                let is_max_in = |img: &Image<f32, 1>, skip_center: bool| {
                    let d = img.as_slice();
                    (y - 1..=y + 1).all(|yy| {
                        (x - 1..=x + 1).all(|xx| {
                            (skip_center && xx == x && yy == y) || val >= d[yy * cols + xx]
                        })
                    })
                };

                if !is_max_in(&level.response, true) {
                    continue;
                }
                if !neighbours
                    .iter()
                    .flatten()
                    .all(|other| is_max_in(&other.response, false))
                {
                    continue;
                }

                let Some((ox, oy)) = subpixel_offset(det, cols, x, y) else {
                    continue;
                };

                let ratio = level.ratio();
                keypoints.push(Keypoint {
                    x: (x as f32 + ox) * ratio,
                    y: (y as f32 + oy) * ratio,
                    size: 2.0 * level.esigma,
                    angle: 0.0,
                    response: val,
                    octave: level.octave,
                });
            }
        }

        for kp in keypoints.iter_mut() {
            kp.angle = dominant_orientation(level, kp);
        }
        keypoints
    }
}

impl FeatureExtractor for AkazeDetector {
    fn detect_and_compute(&self, image: &Image<f32, 1>) -> Result<Features, ImageError> {
        let levels = self.build_scale_space(image)?;

        let mut candidates = (0..levels.len())
            .into_par_iter()
            .flat_map_iter(|i| {
                self.find_extrema(&levels, i)
                    .into_iter()
                    .map(move |kp| (kp, i))
            })
            .collect::<Vec<_>>();

        candidates.sort_by(|a, b| b.0.response.total_cmp(&a.0.response));
        let candidates = suppress_overlapping(candidates);

        let (keypoints, descriptors): (Vec<_>, Vec<_>) = candidates
            .into_par_iter()
            .map(|(kp, i)| {
                let descriptor = msurf_descriptor(&levels[i], &kp);
                (kp, descriptor)
            })
            .unzip();

        debug!("akaze: {} keypoints", keypoints.len());

        Ok(Features {
            keypoints,
            descriptors: Descriptors::Float(descriptors),
        })
    }

    fn descriptor_kind(&self) -> DescriptorKind {
        DescriptorKind::Float
    }
}

/// Percentile of the gradient magnitude histogram of the lightly smoothed image.
fn contrast_factor(src: &Image<f32, 1>, percentile: f32) -> Result<f32, ImageError> {
    let mut smoothed = Image::from_size_val(src.size(), 0.0)?;
    gaussian_blur(src, &mut smoothed, (0, 0), (1.0, 1.0))?;

    let mut dx = Image::from_size_val(src.size(), 0.0)?;
    let mut dy = Image::from_size_val(src.size(), 0.0)?;
    scharr_gradient(&smoothed, &mut dx, &mut dy)?;

    let (cols, rows) = (src.cols(), src.rows());
    let magnitudes = (1..rows - 1)
        .flat_map(|y| (1..cols - 1).map(move |x| y * cols + x))
        .map(|idx| {
            let (gx, gy) = (dx.as_slice()[idx], dy.as_slice()[idx]);
            (gx * gx + gy * gy).sqrt()
        })
        .collect::<Vec<_>>();

    let max = magnitudes.iter().copied().fold(0.0f32, f32::max);
    if max <= 0.0 {
        return Ok(DEFAULT_CONTRAST);
    }

    let mut hist = vec![0usize; CONTRAST_BINS];
    let mut total = 0usize;
    for &m in magnitudes.iter().filter(|&&m| m > 0.0) {
        let bin = ((m / max) * CONTRAST_BINS as f32) as usize;
        hist[bin.min(CONTRAST_BINS - 1)] += 1;
        total += 1;
    }

    let target = (total as f32 * percentile) as usize;
    let mut acc = 0usize;
    let mut bin = 0usize;
    while bin < CONTRAST_BINS && acc < target {
        acc += hist[bin];
        bin += 1;
    }

    let contrast = max * bin as f32 / CONTRAST_BINS as f32;
    Ok(if contrast > 0.0 {
        contrast
    } else {
        DEFAULT_CONTRAST
    })
}

/// Perona-Malik g2 conductivity of the gradient of `src`.
fn conductivity(src: &Image<f32, 1>, contrast: f32) -> Result<Image<f32, 1>, ImageError> {
    let mut smoothed = Image::from_size_val(src.size(), 0.0)?;
    gaussian_blur(src, &mut smoothed, (0, 0), (1.0, 1.0))?;

    let mut dx = Image::from_size_val(src.size(), 0.0)?;
    let mut dy = Image::from_size_val(src.size(), 0.0)?;
    scharr_gradient(&smoothed, &mut dx, &mut dy)?;

    let inv_k2 = 1.0 / (contrast * contrast);
    let data = dx
        .as_slice()
        .iter()
        .zip(dy.as_slice())
        .map(|(&gx, &gy)| 1.0 / (1.0 + (gx * gx + gy * gy) * inv_k2))
        .collect();
    Image::new(src.size(), data)
}

/// Evolve `src` by `dt` with explicit stable diffusion steps.
fn nonlinear_diffusion(src: &Image<f32, 1>, contrast: f32, dt: f32) -> Result<Image<f32, 1>, ImageError> {
    if dt <= 0.0 {
        return Ok(src.clone());
    }

    let g = conductivity(src, contrast)?;
    let n_steps = (dt / MAX_EXPLICIT_TAU).ceil().max(1.0) as usize;
    let tau = dt / n_steps as f32;

    let mut current = src.clone();
    for _ in 0..n_steps {
        current = diffusion_step(&current, &g, tau)?;
    }
    Ok(current)
}

fn diffusion_step(src: &Image<f32, 1>, g: &Image<f32, 1>, tau: f32) -> Result<Image<f32, 1>, ImageError> {
    let (cols, rows) = (src.cols(), src.rows());
    let (ld, gd) = (src.as_slice(), g.as_slice());

    let mut dst = Image::from_size_val(src.size(), 0.0)?;
    dst.as_slice_mut()
        .par_chunks_exact_mut(cols)
        .enumerate()
        .for_each(|(y, row)| {
            let up = y.saturating_sub(1);
            let down = (y + 1).min(rows - 1);
            for (x, out) in row.iter_mut().enumerate() {
                let left = x.saturating_sub(1);
                let right = (x + 1).min(cols - 1);
                let idx = y * cols + x;
                let (c, gc) = (ld[idx], gd[idx]);
                let flux = |n: usize| 0.5 * (gc + gd[n]) * (ld[n] - c);
                *out = c + tau
                    * (flux(y * cols + left)
                        + flux(y * cols + right)
                        + flux(up * cols + x)
                        + flux(down * cols + x));
            }
        });

    Ok(dst)
}

/// First derivatives and the scale normalized Hessian determinant of a level.
fn hessian_level(lt: &Image<f32, 1>, esigma: f32, octave: usize) -> Result<Level, ImageError> {
    let size = lt.size();
    let mut lx = Image::from_size_val(size, 0.0)?;
    let mut ly = Image::from_size_val(size, 0.0)?;
    scharr_gradient(lt, &mut lx, &mut ly)?;

    let mut lxx = Image::from_size_val(size, 0.0)?;
    let mut lxy = Image::from_size_val(size, 0.0)?;
    scharr_gradient(&lx, &mut lxx, &mut lxy)?;

    let mut lyx = Image::from_size_val(size, 0.0)?;
    let mut lyy = Image::from_size_val(size, 0.0)?;
    scharr_gradient(&ly, &mut lyx, &mut lyy)?;

    let sigma = esigma / (1usize << octave) as f32;
    let norm = sigma.powi(4);
    let data = lxx
        .as_slice()
        .iter()
        .zip(lyy.as_slice())
        .zip(lxy.as_slice())
        .map(|((&xx, &yy), &xy)| (xx * yy - xy * xy) * norm)
        .collect();

    Ok(Level {
        lx,
        ly,
        response: Image::new(size, data)?,
        esigma,
        octave,
    })
}

/// Offset of the peak of the quadratic fitted on the 3x3 neighbourhood.
fn subpixel_offset(det: &[f32], cols: usize, x: usize, y: usize) -> Option<(f32, f32)> {
    let at = |xx: usize, yy: usize| det[yy * cols + xx];
    let c = at(x, y);
    let dx = 0.5 * (at(x + 1, y) - at(x - 1, y));
    let dy = 0.5 * (at(x, y + 1) - at(x, y - 1));
    let dxx = at(x + 1, y) + at(x - 1, y) - 2.0 * c;
    let dyy = at(x, y + 1) + at(x, y - 1) - 2.0 * c;
    let dxy = 0.25 * (at(x + 1, y + 1) + at(x - 1, y - 1) - at(x - 1, y + 1) - at(x + 1, y - 1));

    let d = dxx * dyy - dxy * dxy;
    if d.abs() < f32::EPSILON {
        return Some((0.0, 0.0));
    }
    let ox = -(dyy * dx - dxy * dy) / d;
    let oy = -(dxx * dy - dxy * dx) / d;

    if ox.abs() > 1.0 || oy.abs() > 1.0 {
        return None;
    }
    Some((ox, oy))
}

/// Drop keypoints overlapping a stronger one, candidates sorted by decreasing response.
fn suppress_overlapping(candidates: Vec<(Keypoint, usize)>) -> Vec<(Keypoint, usize)> {
    let mut kept: Vec<(Keypoint, usize)> = Vec::with_capacity(candidates.len());
    for (kp, i) in candidates {
        let overlaps = kept.iter().any(|(other, _)| {
            let radius = 0.5 * kp.size.max(other.size);
            let (dx, dy) = (kp.x - other.x, kp.y - other.y);
            dx * dx + dy * dy < radius * radius
        });
        if !overlaps {
            kept.push((kp, i));
        }
    }
    kept
}

/// SURF orientation: strongest sum of gradient responses in a sliding pi/3 window.
fn dominant_orientation(level: &Level, kp: &Keypoint) -> f32 {
    let s = level.sigma();
    let ratio = level.ratio();
    let (cx, cy) = (kp.x / ratio, kp.y / ratio);
    let (cols, rows) = (level.lx.cols() as i64, level.lx.rows() as i64);

    let mut responses = Vec::with_capacity(109);
    for i in -6i64..=6 {
        for j in -6i64..=6 {
            if i * i + j * j >= 36 {
                continue;
            }
            let xx = (cx + i as f32 * s).round() as i64;
            let yy = (cy + j as f32 * s).round() as i64;
            if xx < 0 || yy < 0 || xx >= cols || yy >= rows {
                continue;
            }
            let idx = (yy * cols + xx) as usize;
            let weight = (-((i * i + j * j) as f32) / (2.0 * 2.5 * 2.5)).exp();
            let rx = weight * level.lx.as_slice()[idx];
            let ry = weight * level.ly.as_slice()[idx];
            responses.push((ry.atan2(rx).rem_euclid(2.0 * PI), rx, ry));
        }
    }

    let window = PI / 3.0;
    let mut best = (0.0f32, 0.0f32, 0.0f32);
    let mut start = 0.0f32;
    while start < 2.0 * PI {
        let end = start + window;
        let (sx, sy) = responses
            .iter()
            .filter(|(angle, _, _)| {
                (*angle >= start && *angle < end) || (end > 2.0 * PI && *angle < end - 2.0 * PI)
            })
            .fold((0.0f32, 0.0f32), |(sx, sy), (_, rx, ry)| (sx + rx, sy + ry));
        let magnitude = sx * sx + sy * sy;
        if magnitude > best.0 {
            best = (magnitude, sx, sy);
        }
        start += 0.15;
    }

    if best.0 > 0.0 {
        best.2.atan2(best.1).rem_euclid(2.0 * PI)
    } else {
        0.0
    }
}

/// 4x4 subregions of 5x5 samples accumulating `(dx, dy, |dx|, |dy|)` in the keypoint frame.
fn msurf_descriptor(level: &Level, kp: &Keypoint) -> Vec<f32> {
    let s = level.sigma();
    let ratio = level.ratio();
    let (cx, cy) = (kp.x / ratio, kp.y / ratio);
    let (sin_t, cos_t) = kp.angle.sin_cos();
    let weight_scale = -1.0 / (2.0 * (3.3 * s) * (3.3 * s));

    let mut descriptor = Vec::with_capacity(AKAZE_DESCRIPTOR_SIZE);
    for i in 0..4 {
        for j in 0..4 {
            let mut acc = [0.0f32; 4];
            for k in 0..5 {
                for l in 0..5 {
                    let u = ((i * 5 + k) as f32 - 10.0 + 0.5) * s;
                    let v = ((j * 5 + l) as f32 - 10.0 + 0.5) * s;
                    let px = cx + u * cos_t - v * sin_t;
                    let py = cy + u * sin_t + v * cos_t;

                    let gx = bilinear_interpolation(&level.lx, px, py, 0);
                    let gy = bilinear_interpolation(&level.ly, px, py, 0);
                    let weight = ((u * u + v * v) * weight_scale).exp();

                    let du = weight * (gx * cos_t + gy * sin_t);
                    let dv = weight * (-gx * sin_t + gy * cos_t);
                    acc[0] += du;
                    acc[1] += dv;
                    acc[2] += du.abs();
                    acc[3] += dv.abs();
                }
            }
            descriptor.extend_from_slice(&acc);
        }
    }

    let norm = descriptor.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        descriptor.iter_mut().for_each(|v| *v /= norm);
    }
    descriptor
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
    fn test_contrast_factor_flat_fallback() -> Result<(), ImageError> {
        let img = Image::<f32, 1>::from_size_val([32, 32].into(), 0.5)?;
        assert_eq!(contrast_factor(&img, 0.7)?, DEFAULT_CONTRAST);

        let textured = blocky_texture(64, 64, 8, 5)?;
        let k = contrast_factor(&textured, 0.7)?;
        assert!(k > 0.0 && k.is_finite());
        Ok(())
    }

    #[test]
    fn test_diffusion_preserves_mean() -> Result<(), ImageError> {
        let img = blocky_texture(32, 32, 4, 9)?;
        let evolved = nonlinear_diffusion(&img, 0.05, 2.0)?;

        let mean = |im: &Image<f32, 1>| im.as_slice().iter().sum::<f32>() / im.as_slice().len() as f32;
        assert_relative_eq!(mean(&img), mean(&evolved), epsilon = 1e-3);
        Ok(())
    }

    #[test]
    fn test_akaze_blob_center() -> Result<(), ImageError> {
        let img = gaussian_blob(96, 5.0)?;
        let features = AkazeDetector::default().detect_and_compute(&img)?;

        assert!(!features.is_empty());
        let strongest = &features.keypoints[0];
        assert!((strongest.x - 48.0).abs() <= 2.0, "x = {}", strongest.x);
        assert!((strongest.y - 48.0).abs() <= 2.0, "y = {}", strongest.y);
        Ok(())
    }

    #[test]
    fn test_akaze_flat_image_is_empty() -> Result<(), ImageError> {
        let img = Image::<f32, 1>::from_size_val([64, 64].into(), 0.2)?;
        let features = AkazeDetector::default().detect_and_compute(&img)?;
        assert!(features.is_empty());
        assert_eq!(features.descriptors.kind(), DescriptorKind::Float);
        Ok(())
    }

    #[test]
    fn test_akaze_descriptors() -> Result<(), ImageError> {
        let img = blocky_texture(96, 96, 8, 3)?;
        let akaze = AkazeDetector::default();
        let features = akaze.detect_and_compute(&img)?;
        assert!(!features.is_empty());

        let Descriptors::Float(descriptors) = &features.descriptors else {
            panic!("akaze must produce float descriptors");
        };
        assert_eq!(descriptors.len(), features.len());
        for d in descriptors {
            assert_eq!(d.len(), AKAZE_DESCRIPTOR_SIZE);
            let norm = d.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert_relative_eq!(norm, 1.0, epsilon = 1e-4);
        }

        // deterministic
        assert_eq!(features, akaze.detect_and_compute(&img)?);
        Ok(())
    }
}
