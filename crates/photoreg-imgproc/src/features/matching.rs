use rayon::prelude::*;

use super::{DescriptorKind, Descriptors};

/// Lowe ratio used for float descriptors.
pub const RATIO_TEST: f32 = 0.7;

/// Share of the best mutual matches kept for binary descriptors.
pub const TOP_FRACTION: f32 = 0.8;

/// A correspondence between a source and a destination descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Match {
    /// Index into the source features.
    pub query_idx: usize,
    /// Index into the destination features.
    pub train_idx: usize,
    /// Hamming or Euclidean distance between the two descriptors.
    pub distance: f32,
}

/// How correspondences are selected.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatchStrategy {
    /// Accept the nearest neighbour when it is clearly closer than the second one.
    RatioTest {
        /// Maximum ratio between the best and second best distance.
        ratio: f32,
    },
    /// Keep the best share of the mutual nearest neighbours.
    TopFraction {
        /// Share of the sorted matches to keep, in `[0, 1]`.
        keep: f32,
    },
}

/// Errors of the descriptor matcher.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MatchError {
    /// The two descriptor sets are not of the same family.
    #[error("Cannot match {0:?} descriptors against {1:?} descriptors")]
    DescriptorMismatch(DescriptorKind, DescriptorKind),
}

/// Number of differing bits between two bit-packed descriptors.
pub fn hamming_distance(a: &[u8], b: &[u8]) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Euclidean distance between two float descriptors.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

fn sort_by_distance(matches: &mut [Match]) {
    matches.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.query_idx.cmp(&b.query_idx))
    });
}

/// Match float descriptors with the nearest neighbour ratio test.
///
/// For every source descriptor the two nearest destination descriptors are
/// found by brute force; the best one is accepted iff
/// `best < ratio * second_best`.
///
/// # Arguments
///
/// * `src` - The source descriptors.
/// * `dst` - The destination descriptors.
/// * `ratio` - The ratio threshold, typically [`RATIO_TEST`].
///
/// # Returns
///
/// The accepted matches sorted by increasing distance. Empty when `dst` has
/// fewer than two descriptors.
pub fn match_ratio_test(src: &[Vec<f32>], dst: &[Vec<f32>], ratio: f32) -> Vec<Match> {
    if src.is_empty() || dst.len() < 2 {
        return Vec::new();
    }

    let mut matches = src
        .par_iter()
        .enumerate()
        .filter_map(|(query_idx, q)| {
            let mut best = (usize::MAX, f32::INFINITY);
            let mut second = f32::INFINITY;
            for (train_idx, t) in dst.iter().enumerate() {
                let d = l2_distance(q, t);
                if d < best.1 {
                    second = best.1;
                    best = (train_idx, d);
                } else if d < second {
                    second = d;
                }
            }
            (best.1 < ratio * second).then_some(Match {
                query_idx,
                train_idx: best.0,
                distance: best.1,
            })
        })
        .collect::<Vec<_>>();

    sort_by_distance(&mut matches);
    matches
}

/// Index and distance of the nearest binary descriptor, ties keep the lowest index.
fn nearest_binary(q: &[u8], candidates: &[Vec<u8>]) -> Option<(usize, u32)> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (i, hamming_distance(q, c)))
        .min_by_key(|&(i, d)| (d, i))
}

/// Match binary descriptors with cross checking and keep the best share.
///
/// A pair is kept only when each descriptor is the nearest neighbour of the
/// other. The mutual matches are sorted by increasing Hamming distance and
/// the first `floor(keep * n)` are returned.
pub fn match_mutual_top_fraction(src: &[Vec<u8>], dst: &[Vec<u8>], keep: f32) -> Vec<Match> {
    if src.is_empty() || dst.is_empty() {
        return Vec::new();
    }

    let backward = dst
        .par_iter()
        .map(|t| nearest_binary(t, src).map(|(i, _)| i))
        .collect::<Vec<_>>();

    let mut matches = src
        .par_iter()
        .enumerate()
        .filter_map(|(query_idx, q)| {
            let (train_idx, distance) = nearest_binary(q, dst)?;
            (backward[train_idx] == Some(query_idx)).then_some(Match {
                query_idx,
                train_idx,
                distance: distance as f32,
            })
        })
        .collect::<Vec<_>>();

    sort_by_distance(&mut matches);
    let n_keep = (keep.clamp(0.0, 1.0) as f64 * matches.len() as f64).floor() as usize;
    matches.truncate(n_keep);
    matches
}

/// Match two descriptor sets of the same family with the given strategy.
///
/// Either set being empty yields no matches. Float descriptors paired with
/// [`MatchStrategy::TopFraction`] use the L2 distance with the same cross
/// checking; binary descriptors paired with [`MatchStrategy::RatioTest`] use
/// the Hamming distance with the same ratio test.
///
/// # Errors
///
/// [`MatchError::DescriptorMismatch`] when a binary set is matched against a
/// float set.
pub fn match_features(
    src: &Descriptors,
    dst: &Descriptors,
    strategy: MatchStrategy,
) -> Result<Vec<Match>, MatchError> {
    match (src, dst, strategy) {
        (Descriptors::Float(s), Descriptors::Float(d), MatchStrategy::RatioTest { ratio }) => {
            Ok(match_ratio_test(s, d, ratio))
        }
        (Descriptors::Binary(s), Descriptors::Binary(d), MatchStrategy::TopFraction { keep }) => {
            Ok(match_mutual_top_fraction(s, d, keep))
        }
        (Descriptors::Binary(s), Descriptors::Binary(d), MatchStrategy::RatioTest { ratio }) => {
            Ok(match_ratio_test_hamming(s, d, ratio))
        }
        (Descriptors::Float(s), Descriptors::Float(d), MatchStrategy::TopFraction { keep }) => {
            Ok(match_mutual_top_fraction_l2(s, d, keep))
        }
        (s, d, _) => Err(MatchError::DescriptorMismatch(s.kind(), d.kind())),
    }
}

/// Ratio test on Hamming distances, `best < ratio * second` on the bit counts.
fn match_ratio_test_hamming(src: &[Vec<u8>], dst: &[Vec<u8>], ratio: f32) -> Vec<Match> {
    if src.is_empty() || dst.len() < 2 {
        return Vec::new();
    }

    let mut matches = src
        .par_iter()
        .enumerate()
        .filter_map(|(query_idx, q)| {
            let mut best = (usize::MAX, u32::MAX);
            let mut second = u32::MAX;
            for (train_idx, t) in dst.iter().enumerate() {
                let d = hamming_distance(q, t);
                if d < best.1 {
                    second = best.1;
                    best = (train_idx, d);
                } else if d < second {
                    second = d;
                }
            }
            ((best.1 as f32) < ratio * second as f32).then_some(Match {
                query_idx,
                train_idx: best.0,
                distance: best.1 as f32,
            })
        })
        .collect::<Vec<_>>();

    sort_by_distance(&mut matches);
    matches
}

fn match_mutual_top_fraction_l2(src: &[Vec<f32>], dst: &[Vec<f32>], keep: f32) -> Vec<Match> {
    if src.is_empty() || dst.is_empty() {
        return Vec::new();
    }

    let nearest = |q: &[f32], candidates: &[Vec<f32>]| {
        candidates
            .iter()
            .enumerate()
            .map(|(i, c)| (i, l2_distance(q, c)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
    };

    let backward = dst
        .par_iter()
        .map(|t| nearest(t, src).map(|(i, _)| i))
        .collect::<Vec<_>>();

    let mut matches = src
        .par_iter()
        .enumerate()
        .filter_map(|(query_idx, q)| {
            let (train_idx, distance) = nearest(q, dst)?;
            (backward[train_idx] == Some(query_idx)).then_some(Match {
                query_idx,
                train_idx,
                distance,
            })
        })
        .collect::<Vec<_>>();

    sort_by_distance(&mut matches);
    let n_keep = (keep.clamp(0.0, 1.0) as f64 * matches.len() as f64).floor() as usize;
    matches.truncate(n_keep);
    matches
}
