use photoreg_geometry::{RansacParams, REPROJECTION_THRESHOLD_PX};
use photoreg_imgproc::features::DetectorKind;

/// Default minimum number of correspondences needed to fit a homography.
pub const MIN_MATCHES: usize = 10;

/// Parameters of [`crate::register`].
///
/// The ratio test threshold, the kept share of binary matches and the RANSAC
/// reprojection threshold are fixed, see
/// [`photoreg_imgproc::features::RATIO_TEST`],
/// [`photoreg_imgproc::features::TOP_FRACTION`] and
/// [`photoreg_geometry::REPROJECTION_THRESHOLD_PX`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct RegistrationConfig {
    /// Feature detector run on both images.
    pub detector: DetectorKind,
    /// Fewer correspondences than this fall back to the identity.
    pub min_matches: usize,
    /// Whether to render the blended preview.
    pub render_preview: bool,
    /// Weight of the source image in the preview, in `[0, 1]`.
    pub blend_alpha: f32,
    /// Upper bound on the number of RANSAC iterations.
    pub ransac_max_iterations: usize,
    /// Seed of the RANSAC sampler, `None` for a random seed.
    pub ransac_seed: Option<u64>,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            detector: DetectorKind::default(),
            min_matches: MIN_MATCHES,
            render_preview: false,
            blend_alpha: 0.5,
            ransac_max_iterations: 2000,
            ransac_seed: Some(0),
        }
    }
}

impl RegistrationConfig {
    /// Create a configuration using the given detector and default values otherwise.
    pub fn with_detector(detector: DetectorKind) -> Self {
        Self {
            detector,
            ..Default::default()
        }
    }

    /// RANSAC parameters with the fixed reprojection threshold.
    pub fn ransac_params(&self) -> RansacParams {
        RansacParams {
            threshold: REPROJECTION_THRESHOLD_PX,
            max_iterations: self.ransac_max_iterations,
            seed: self.ransac_seed,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistrationConfig::default();
        assert_eq!(config.detector, DetectorKind::Orb);
        assert_eq!(config.min_matches, 10);
        assert!(!config.render_preview);
        assert_eq!(config.blend_alpha, 0.5);

        let params = config.ransac_params();
        assert_eq!(params.threshold, 5.0);
        assert_eq!(params.max_iterations, 2000);
        assert_eq!(params.seed, Some(0));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_from_json() -> Result<(), serde_json::Error> {
        let config: RegistrationConfig =
            serde_json::from_str(r#"{ "detector": "sift", "min_matches": 20 }"#)?;
        assert_eq!(config.detector, DetectorKind::Sift);
        assert_eq!(config.min_matches, 20);
        assert_eq!(config.blend_alpha, 0.5);
        Ok(())
    }
}
