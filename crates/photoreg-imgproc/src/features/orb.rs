use log::debug;
use photoreg_image::{Image, ImageError, ImageSize};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;

use super::{
    fast_corners, harris_response_at, DescriptorKind, Descriptors, FeatureExtractor, Features,
    Keypoint,
};
use crate::{filter::gaussian_blur, interpolation::InterpolationMode, resize::resize_native};

/// Number of bytes of an ORB descriptor.
pub const ORB_DESCRIPTOR_BYTES: usize = 32;

/// Half side of the square the BRIEF test points are drawn from.
const BRIEF_PATTERN_RADIUS: i32 = 13;
const BRIEF_PATTERN_SEED: u64 = 0x0b1e_f00d;

/// Oriented FAST and rotated BRIEF extractor.
#[derive(Clone, Debug)]
pub struct OrbDetector {
    /// Maximum number of keypoints over all pyramid levels.
    pub n_features: usize,
    /// Downscaling factor between consecutive pyramid levels.
    pub scale_factor: f32,
    /// Number of pyramid levels.
    pub n_levels: usize,
    /// FAST threshold tried first on every level.
    pub fast_threshold: f32,
    /// FAST threshold used when a level yields fewer than 10 corners.
    pub min_fast_threshold: f32,
    /// Width of the border where no keypoint is detected.
    pub edge_threshold: usize,
    /// Side of the patch used for orientation, in level pixels.
    pub patch_size: usize,
    /// Harris sensitivity used to rank the corners.
    pub harris_k: f32,
}

impl Default for OrbDetector {
    fn default() -> Self {
        Self {
            n_features: 5000,
            scale_factor: 1.2,
            n_levels: 8,
            fast_threshold: 20.0 / 255.0,
            min_fast_threshold: 7.0 / 255.0,
            edge_threshold: 19,
            patch_size: 31,
            harris_k: 0.04,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct OrbCandidate {
    x: usize,
    y: usize,
    response: f32,
    angle: f32,
}

impl OrbDetector {
    /// Create a detector with the default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Split the feature budget over the levels as a geometric series.
    pub fn features_per_level(&self) -> Vec<usize> {
        let n_levels = self.n_levels.max(1);
        let factor = 1.0 / self.scale_factor;
        let mut features_per_level = vec![0usize; n_levels];

        let mut n_desired =
            self.n_features as f32 * (1.0 - factor) / (1.0 - factor.powi(n_levels as i32));

        let mut sum = 0usize;
        for item in features_per_level.iter_mut().take(n_levels - 1) {
            let n = n_desired.round().max(0.0) as usize;
            *item = n;
            sum += n;
            n_desired *= factor;
        }
        features_per_level[n_levels - 1] = self.n_features.saturating_sub(sum);

        features_per_level
    }

    fn build_pyramid(&self, src: &Image<f32, 1>) -> Result<Vec<Image<f32, 1>>, ImageError> {
        let min_side = 2 * self.edge_threshold + 1;
        let mut pyramid = vec![src.clone()];

        for level in 1..self.n_levels {
            let scale = self.scale_factor.powi(level as i32);
            let size = ImageSize {
                width: (src.width() as f32 / scale).round() as usize,
                height: (src.height() as f32 / scale).round() as usize,
            };
            if size.width < min_side || size.height < min_side {
                break;
            }

            let Some(previous) = pyramid.last() else {
                break;
            };

            // anti-aliasing before the bilinear downscale
            let mut smoothed = Image::from_size_val(previous.size(), 0.0)?;
            gaussian_blur(previous, &mut smoothed, (0, 0), (2.0 * self.scale_factor / 6.0, 0.0))?;

            let mut resized = Image::from_size_val(size, 0.0)?;
            resize_native(&smoothed, &mut resized, InterpolationMode::Bilinear)?;
            pyramid.push(resized);
        }

        Ok(pyramid)
    }

    fn detect_level(&self, level_image: &Image<f32, 1>, n_desired: usize) -> Vec<OrbCandidate> {
        let (cols, rows) = (level_image.cols(), level_image.rows());
        let edge = self.edge_threshold;
        if n_desired == 0 || cols <= 2 * edge || rows <= 2 * edge {
            return Vec::new();
        }

        let mut corners = fast_corners(level_image, self.fast_threshold, 9, true);
        if corners.len() < 10 {
            let low = fast_corners(level_image, self.min_fast_threshold, 9, true);
            for corner in low {
                let dominated = corners
                    .iter()
                    .any(|c| c.x.abs_diff(corner.x) <= 3 && c.y.abs_diff(corner.y) <= 3);
                if !dominated {
                    corners.push(corner);
                }
            }
        }

        let mut candidates = corners
            .into_iter()
            .filter(|c| c.x >= edge && c.x < cols - edge && c.y >= edge && c.y < rows - edge)
            .map(|c| OrbCandidate {
                x: c.x,
                y: c.y,
                response: harris_response_at(level_image, c.x, c.y, 7, self.harris_k),
                angle: 0.0,
            })
            .collect::<Vec<_>>();

        candidates.sort_by(|a, b| b.response.total_cmp(&a.response));
        candidates.truncate(n_desired);

        let half_patch = (self.patch_size / 2) as i32;
        for candidate in candidates.iter_mut() {
            candidate.angle = intensity_centroid_angle(level_image, candidate.x, candidate.y, half_patch);
        }

        candidates
    }

    /// Detect and describe the keypoints of one pyramid level.
    fn process_level(
        &self,
        level: usize,
        level_image: &Image<f32, 1>,
        n_desired: usize,
        pattern: &[[(i32, i32); 2]],
    ) -> Result<(Vec<Keypoint>, Vec<Vec<u8>>), ImageError> {
        let candidates = self.detect_level(level_image, n_desired);
        if candidates.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let mut blurred = Image::from_size_val(level_image.size(), 0.0)?;
        gaussian_blur(level_image, &mut blurred, (7, 7), (2.0, 2.0))?;

        let scale = self.scale_factor.powi(level as i32);
        let keypoints = candidates
            .iter()
            .map(|c| Keypoint {
                x: c.x as f32 * scale,
                y: c.y as f32 * scale,
                size: self.patch_size as f32 * scale,
                angle: c.angle,
                response: c.response,
                octave: level,
            })
            .collect();

        let descriptors = candidates
            .iter()
            .map(|c| steered_brief(&blurred, c.x, c.y, c.angle, pattern))
            .collect();

        Ok((keypoints, descriptors))
    }
}

impl FeatureExtractor for OrbDetector {
    fn detect_and_compute(&self, image: &Image<f32, 1>) -> Result<Features, ImageError> {
        let pyramid = self.build_pyramid(image)?;
        let features_per_level = self.features_per_level();
        let pattern = brief_pattern();

        let levels = pyramid
            .par_iter()
            .enumerate()
            .map(|(level, level_image)| {
                self.process_level(level, level_image, features_per_level[level], &pattern)
            })
            .collect::<Result<Vec<_>, ImageError>>()?;

        let mut keypoints = Vec::new();
        let mut descriptors = Vec::new();
        for (level_keypoints, level_descriptors) in levels {
            keypoints.extend(level_keypoints);
            descriptors.extend(level_descriptors);
        }

        debug!(
            "orb: {} keypoints over {} pyramid levels",
            keypoints.len(),
            pyramid.len()
        );

        Ok(Features {
            keypoints,
            descriptors: Descriptors::Binary(descriptors),
        })
    }

    fn descriptor_kind(&self) -> DescriptorKind {
        DescriptorKind::Binary
    }
}

/// Orientation of the intensity centroid of the disc of radius `half_patch`.
fn intensity_centroid_angle(src: &Image<f32, 1>, x0: usize, y0: usize, half_patch: i32) -> f32 {
    let (cols, rows) = (src.cols() as i32, src.rows() as i32);
    let data = src.as_slice();
    let radius2 = half_patch * half_patch;

    let mut m01 = 0.0f32;
    let mut m10 = 0.0f32;
    for dy in -half_patch..=half_patch {
        for dx in -half_patch..=half_patch {
            if dx * dx + dy * dy > radius2 {
                continue;
            }
            let (x, y) = (x0 as i32 + dx, y0 as i32 + dy);
            if x < 0 || x >= cols || y < 0 || y >= rows {
                continue;
            }
            let value = data[(y * cols + x) as usize];
            m10 += value * dx as f32;
            m01 += value * dy as f32;
        }
    }

    m01.atan2(m10)
}

/// The 256 BRIEF point pairs, sampled once from a fixed seed so that every
/// extractor instance produces comparable descriptors.
fn brief_pattern() -> Vec<[(i32, i32); 2]> {
    let mut rng = StdRng::seed_from_u64(BRIEF_PATTERN_SEED);
    let r = BRIEF_PATTERN_RADIUS;
    (0..ORB_DESCRIPTOR_BYTES * 8)
        .map(|_| {
            [
                (rng.random_range(-r..=r), rng.random_range(-r..=r)),
                (rng.random_range(-r..=r), rng.random_range(-r..=r)),
            ]
        })
        .collect()
}

/// Binary intensity tests of the pattern rotated by `angle`, packed 8 per byte.
fn steered_brief(
    src: &Image<f32, 1>,
    x: usize,
    y: usize,
    angle: f32,
    pattern: &[[(i32, i32); 2]],
) -> Vec<u8> {
    let (cols, rows) = (src.cols() as i32, src.rows() as i32);
    let data = src.as_slice();
    let (sin_a, cos_a) = angle.sin_cos();

    let sample = |(px, py): (i32, i32)| -> Option<f32> {
        let (px, py) = (px as f32, py as f32);
        let sx = x as i32 + (cos_a * px - sin_a * py).round() as i32;
        let sy = y as i32 + (sin_a * px + cos_a * py).round() as i32;
        if sx < 0 || sx >= cols || sy < 0 || sy >= rows {
            return None;
        }
        Some(data[(sy * cols + sx) as usize])
    };

    let mut descriptor = vec![0u8; ORB_DESCRIPTOR_BYTES];
    for (j, [p0, p1]) in pattern.iter().enumerate() {
        if let (Some(v0), Some(v1)) = (sample(*p0), sample(*p1)) {
            if v0 < v1 {
                descriptor[j / 8] |= 1 << (j % 8);
            }
        }
    }

    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::testing::blocky_texture;

    fn make_gradient(size: usize, along_x: bool) -> Result<Image<f32, 1>, ImageError> {
        let denom = (size - 1) as f32;
        let data = (0..size * size)
            .map(|i| {
                let (x, y) = (i % size, i / size);
                if along_x {
                    x as f32 / denom
                } else {
                    y as f32 / denom
                }
            })
            .collect();
        Image::new([size, size].into(), data)
    }

    #[test]
    fn test_features_per_level_budget() {
        let orb = OrbDetector::default();
        let per_level = orb.features_per_level();
        assert_eq!(per_level.len(), 8);
        assert_eq!(per_level.iter().sum::<usize>(), 5000);
        assert!(per_level.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_intensity_centroid_angle() -> Result<(), ImageError> {
        let size = 31;
        let ori_x = intensity_centroid_angle(&make_gradient(size, true)?, 15, 15, 15);
        assert!(ori_x.abs() < 0.1, "expected ~0 rad, got {ori_x}");

        let ori_y = intensity_centroid_angle(&make_gradient(size, false)?, 15, 15, 15);
        assert!((ori_y - std::f32::consts::FRAC_PI_2).abs() < 0.1);
        Ok(())
    }

    #[test]
    fn test_brief_pattern_is_stable() {
        let a = brief_pattern();
        let b = brief_pattern();
        assert_eq!(a.len(), 256);
        assert_eq!(a, b);
        assert!(a
            .iter()
            .flatten()
            .all(|(x, y)| x.abs() <= BRIEF_PATTERN_RADIUS && y.abs() <= BRIEF_PATTERN_RADIUS));
    }

    #[test]
    fn test_orb_flat_image_is_empty() -> Result<(), ImageError> {
        let img = Image::<f32, 1>::from_size_val([96, 96].into(), 0.3)?;
        let features = OrbDetector::default().detect_and_compute(&img)?;
        assert!(features.is_empty());
        assert_eq!(features.descriptors.kind(), DescriptorKind::Binary);
        Ok(())
    }

    #[test]
    fn test_orb_textured_image() -> Result<(), ImageError> {
        let img = blocky_texture(128, 96, 7, 3)?;
        let orb = OrbDetector {
            n_features: 300,
            ..Default::default()
        };
        let features = orb.detect_and_compute(&img)?;

        assert!(!features.is_empty());
        assert!(features.len() <= 300);
        assert_eq!(features.descriptors.len(), features.len());

        let Descriptors::Binary(descriptors) = &features.descriptors else {
            panic!("orb must produce binary descriptors");
        };
        assert!(descriptors.iter().all(|d| d.len() == ORB_DESCRIPTOR_BYTES));
        assert!(features
            .keypoints
            .iter()
            .all(|kp| kp.x >= 0.0 && kp.x < 128.0 && kp.y >= 0.0 && kp.y < 96.0));

        // deterministic output
        assert_eq!(orb.detect_and_compute(&img)?, features);
        Ok(())
    }
}
