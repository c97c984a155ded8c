use std::f32::consts::PI;

use log::debug;
use photoreg_image::{Image, ImageError, ImageSize};
use rayon::prelude::*;

use super::fast::score_map_maxima;
use super::{fast_score_map, DescriptorKind, Descriptors, FeatureExtractor, Features, Keypoint};
use crate::{interpolation::InterpolationMode, resize::resize_native};

/// Number of bytes of a BRISK descriptor.
pub const BRISK_DESCRIPTOR_BYTES: usize = 64;
const DESCRIPTOR_BITS: usize = BRISK_DESCRIPTOR_BYTES * 8;

/// Keypoint size at scale one.
const BASIC_SIZE: f32 = 12.0;
const RING_RADII: [f32; 5] = [0.0, 2.9, 4.9, 7.4, 10.8];
const RING_POINTS: [usize; 5] = [1, 10, 14, 15, 20];
/// Pairs closer than this take part in the bit tests.
const SHORT_PAIR_MAX: f32 = 9.75;
/// Pairs further than this estimate the orientation.
const LONG_PAIR_MIN: f32 = 13.67;
const MIN_LAYER_SIDE: usize = 16;

/// Binary robust invariant scalable keypoints extractor.
#[derive(Clone, Debug)]
pub struct BriskDetector {
    /// FAST threshold on a `[0, 1]` image.
    pub threshold: f32,
    /// Number of octaves, each with an intra-octave layer at 1.5 times its scale.
    pub n_octaves: usize,
    /// Scale of the sampling pattern.
    pub pattern_scale: f32,
}

impl Default for BriskDetector {
    fn default() -> Self {
        Self {
            threshold: 30.0 / 255.0,
            n_octaves: 3,
            pattern_scale: 1.0,
        }
    }
}

struct ScoreLayer {
    scale: f32,
    cols: usize,
    rows: usize,
    scores: Vec<f32>,
}

impl ScoreLayer {
    /// Largest score in the 3x3 window around the position of a full resolution point.
    fn max_score_near(&self, x: f32, y: f32) -> f32 {
        let cx = ((x + 0.5) / self.scale - 0.5).round() as i64;
        let cy = ((y + 0.5) / self.scale - 0.5).round() as i64;
        let mut best = 0.0f32;
        for yy in (cy - 1).max(0)..=(cy + 1).min(self.rows as i64 - 1) {
            for xx in (cx - 1).max(0)..=(cx + 1).min(self.cols as i64 - 1) {
                best = best.max(self.scores[yy as usize * self.cols + xx as usize]);
            }
        }
        best
    }
}

#[derive(Clone, Copy, Debug)]
struct PatternPoint {
    x: f32,
    y: f32,
    sigma: f32,
}

/// Concentric ring sampling pattern at unit scale.
struct BriskPattern {
    points: Vec<PatternPoint>,
    short_pairs: Vec<(usize, usize)>,
    long_pairs: Vec<(usize, usize)>,
    max_extent: f32,
}

impl BriskPattern {
    fn new(pattern_scale: f32) -> Self {
        let mut points = Vec::with_capacity(RING_POINTS.iter().sum());
        for (ring, (&radius, &n)) in RING_RADII.iter().zip(RING_POINTS.iter()).enumerate() {
            // half the spacing between the ring points, the center borrows the first ring
            let (r_ref, n_ref) = if ring == 0 {
                (RING_RADII[1], RING_POINTS[1])
            } else {
                (radius, n)
            };
            let sigma = 0.5 * PI * r_ref / n_ref as f32 * pattern_scale;
            let phase = if ring % 2 == 1 { PI / n as f32 } else { 0.0 };
            for k in 0..n {
                let theta = 2.0 * PI * k as f32 / n as f32 + phase;
                points.push(PatternPoint {
                    x: radius * pattern_scale * theta.cos(),
                    y: radius * pattern_scale * theta.sin(),
                    sigma,
                });
            }
        }

        let mut short_pairs = Vec::new();
        let mut long_pairs = Vec::new();
        for i in 1..points.len() {
            for j in 0..i {
                let (dx, dy) = (points[j].x - points[i].x, points[j].y - points[i].y);
                let d = (dx * dx + dy * dy).sqrt();
                if d < SHORT_PAIR_MAX * pattern_scale {
                    short_pairs.push((i, j));
                } else if d > LONG_PAIR_MIN * pattern_scale {
                    long_pairs.push((i, j));
                }
            }
        }
        short_pairs.truncate(DESCRIPTOR_BITS);

        let max_extent = points
            .iter()
            .map(|p| (p.x * p.x + p.y * p.y).sqrt() + p.sigma)
            .fold(0.0f32, f32::max);

        Self {
            points,
            short_pairs,
            long_pairs,
            max_extent,
        }
    }
}

/// Summed area table for constant time box means.
struct IntegralImage {
    stride: usize,
    data: Vec<f64>,
}

impl IntegralImage {
    fn new(src: &Image<f32, 1>) -> Self {
        let (cols, rows) = (src.cols(), src.rows());
        let stride = cols + 1;
        let mut data = vec![0.0f64; stride * (rows + 1)];
        for y in 0..rows {
            let mut row_sum = 0.0f64;
            for x in 0..cols {
                row_sum += src.as_slice()[y * cols + x] as f64;
                data[(y + 1) * stride + x + 1] = data[y * stride + x + 1] + row_sum;
            }
        }
        Self { stride, data }
    }

    /// Mean over the inclusive box `[x0, x1] x [y0, y1]`.
    fn box_mean(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> f32 {
        let s = self.stride;
        let sum = self.data[(y1 + 1) * s + x1 + 1] - self.data[y0 * s + x1 + 1]
            - self.data[(y1 + 1) * s + x0]
            + self.data[y0 * s + x0];
        let area = ((x1 - x0 + 1) * (y1 - y0 + 1)) as f64;
        (sum / area) as f32
    }
}

impl BriskDetector {
    /// Create a detector with the default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scales of the octave and intra-octave layers.
    fn layer_scales(&self) -> Vec<f32> {
        (0..self.n_octaves.max(1))
            .flat_map(|o| {
                let s = (1usize << o) as f32;
                [s, 1.5 * s]
            })
            .collect()
    }

    fn score_layers(&self, src: &Image<f32, 1>) -> Result<Vec<ScoreLayer>, ImageError> {
        let scales = self
            .layer_scales()
            .into_iter()
            .take_while(|&s| {
                (src.width() as f32 / s).round() as usize >= MIN_LAYER_SIDE
                    && (src.height() as f32 / s).round() as usize >= MIN_LAYER_SIDE
            })
            .collect::<Vec<_>>();

        scales
            .into_par_iter()
            .map(|scale| {
                let layer = if scale == 1.0 {
                    src.clone()
                } else {
                    let size = ImageSize {
                        width: (src.width() as f32 / scale).round() as usize,
                        height: (src.height() as f32 / scale).round() as usize,
                    };
                    let mut dst = Image::from_size_val(size, 0.0)?;
                    resize_native(src, &mut dst, InterpolationMode::Bilinear)?;
                    dst
                };
                Ok(ScoreLayer {
                    scale,
                    cols: layer.cols(),
                    rows: layer.rows(),
                    scores: fast_score_map(&layer, self.threshold, 9),
                })
            })
            .collect()
    }

    /// FAST maxima that also dominate the neighbouring layers, refined in position and scale.
    fn detect_layer(&self, layers: &[ScoreLayer], i: usize) -> Vec<Keypoint> {
        let layer = &layers[i];
        let below = i.checked_sub(1).and_then(|j| layers.get(j));
        let above = layers.get(i + 1);

        score_map_maxima(&layer.scores, layer.cols)
            .into_iter()
            .filter_map(|corner| {
                let (ox, oy) = quadratic_peak(&layer.scores, layer.cols, corner.x, corner.y);
                let x = (corner.x as f32 + ox + 0.5) * layer.scale - 0.5;
                let y = (corner.y as f32 + oy + 0.5) * layer.scale - 0.5;

                let score_below = below.map(|l| l.max_score_near(x, y));
                let score_above = above.map(|l| l.max_score_near(x, y));
                if score_below.is_some_and(|s| s > corner.score)
                    || score_above.is_some_and(|s| s > corner.score)
                {
                    return None;
                }

                let scale = match (below, score_below, above, score_above) {
                    (Some(lb), Some(p), Some(la), Some(n)) => {
                        let c = corner.score;
                        let denom = p - 2.0 * c + n;
                        let delta = if denom.abs() > f32::EPSILON {
                            (0.5 * (p - n) / denom).clamp(-0.5, 0.5)
                        } else {
                            0.0
                        };
                        if delta >= 0.0 {
                            layer.scale * (la.scale / layer.scale).powf(delta)
                        } else {
                            layer.scale * (layer.scale / lb.scale).powf(delta)
                        }
                    }
                    _ => layer.scale,
                };

                Some(Keypoint {
                    x,
                    y,
                    size: BASIC_SIZE * scale,
                    angle: 0.0,
                    response: corner.score,
                    octave: i,
                })
            })
            .collect()
    }
}

impl FeatureExtractor for BriskDetector {
    fn detect_and_compute(&self, image: &Image<f32, 1>) -> Result<Features, ImageError> {
        let layers = self.score_layers(image)?;

        let candidates = (0..layers.len())
            .into_par_iter()
            .flat_map_iter(|i| self.detect_layer(&layers, i))
            .collect::<Vec<_>>();

        let pattern = BriskPattern::new(self.pattern_scale);
        let integral = IntegralImage::new(image);
        let (cols, rows) = (image.cols() as f32, image.rows() as f32);

        let (keypoints, descriptors): (Vec<_>, Vec<_>) = candidates
            .into_par_iter()
            .filter(|kp| {
                // the whole scaled pattern must fall inside the image
                let extent = pattern.max_extent * kp.size / BASIC_SIZE + 1.0;
                kp.x - extent >= 0.0
                    && kp.y - extent >= 0.0
                    && kp.x + extent < cols
                    && kp.y + extent < rows
            })
            .map(|mut kp| {
                let descriptor = describe(&pattern, &integral, image.size(), &mut kp);
                (kp, descriptor)
            })
            .unzip();

        debug!(
            "brisk: {} keypoints over {} layers",
            keypoints.len(),
            layers.len()
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

/// Offset of the peak of the quadratic fitted on the 3x3 score neighbourhood.
fn quadratic_peak(scores: &[f32], cols: usize, x: usize, y: usize) -> (f32, f32) {
    let at = |xx: usize, yy: usize| scores[yy * cols + xx];
    let c = at(x, y);
    let dxx = at(x + 1, y) + at(x - 1, y) - 2.0 * c;
    let dyy = at(x, y + 1) + at(x, y - 1) - 2.0 * c;
    let ox = if dxx < 0.0 {
        (-0.5 * (at(x + 1, y) - at(x - 1, y)) / dxx).clamp(-0.5, 0.5)
    } else {
        0.0
    };
    let oy = if dyy < 0.0 {
        (-0.5 * (at(x, y + 1) - at(x, y - 1)) / dyy).clamp(-0.5, 0.5)
    } else {
        0.0
    };
    (ox, oy)
}

/// Box smoothed intensity of a pattern point around `(cx, cy)`.
fn sample(
    integral: &IntegralImage,
    size: ImageSize,
    cx: f32,
    cy: f32,
    point: &PatternPoint,
    scale: f32,
    (sin_t, cos_t): (f32, f32),
) -> f32 {
    let px = cx + scale * (point.x * cos_t - point.y * sin_t);
    let py = cy + scale * (point.x * sin_t + point.y * cos_t);
    let half = (point.sigma * scale).round().max(0.0) as i64;

    let (x, y) = (px.round() as i64, py.round() as i64);
    let clamp_x = |v: i64| v.clamp(0, size.width as i64 - 1) as usize;
    let clamp_y = |v: i64| v.clamp(0, size.height as i64 - 1) as usize;
    integral.box_mean(
        clamp_x(x - half),
        clamp_y(y - half),
        clamp_x(x + half),
        clamp_y(y + half),
    )
}

/// Estimate the orientation from the long pairs, then pack the short pair tests.
fn describe(
    pattern: &BriskPattern,
    integral: &IntegralImage,
    size: ImageSize,
    kp: &mut Keypoint,
) -> Vec<u8> {
    let scale = kp.size / BASIC_SIZE;

    let intensities = |sin_cos: (f32, f32)| {
        pattern
            .points
            .iter()
            .map(|p| sample(integral, size, kp.x, kp.y, p, scale, sin_cos))
            .collect::<Vec<_>>()
    };

    let upright = intensities((0.0, 1.0));
    let (gx, gy) = pattern
        .long_pairs
        .iter()
        .fold((0.0f32, 0.0f32), |(gx, gy), &(i, j)| {
            let (pi, pj) = (&pattern.points[i], &pattern.points[j]);
            let (dx, dy) = (pj.x - pi.x, pj.y - pi.y);
            let w = (upright[j] - upright[i]) / (dx * dx + dy * dy);
            (gx + w * dx, gy + w * dy)
        });
    let angle = gy.atan2(gx).rem_euclid(2.0 * PI);
    kp.angle = angle;

    let rotated = intensities(angle.sin_cos());
    let mut descriptor = vec![0u8; BRISK_DESCRIPTOR_BYTES];
    for (bit, &(i, j)) in pattern.short_pairs.iter().enumerate() {
        if rotated[i] > rotated[j] {
            descriptor[bit / 8] |= 1 << (bit % 8);
        }
    }
    descriptor
}
