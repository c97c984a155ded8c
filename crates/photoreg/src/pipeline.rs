use log::{debug, info};

use photoreg_geometry::{estimate_homography, re_anchor, Mat3, IDENTITY};
use photoreg_image::{Image, ImageError, ImageSize, Rect};
use photoreg_imgproc::{
    color::gray_f32_from_u8,
    crop::crop_rect,
    enhance::add_weighted,
    features::{match_features, Features, Keypoint, Match},
    interpolation::InterpolationMode,
    warp::warp_perspective,
};

use crate::config::RegistrationConfig;
use crate::diagnostics::{Diagnostics, FallbackReason, Status};
use crate::error::RegistrationError;

/// Result of [`register`].
#[derive(Clone, Debug)]
pub struct Registration<const C: usize> {
    /// Homography mapping full destination coordinates onto full source coordinates.
    ///
    /// Exactly the identity on fallback.
    pub homography: Mat3,
    /// The same homography in the coordinates of the region of interest.
    pub local_homography: Mat3,
    /// The region of interest the features were extracted from.
    pub roi: Rect,
    /// Source keypoints in full image coordinates.
    pub source_keypoints: Vec<Keypoint>,
    /// Destination keypoints in full image coordinates.
    pub destination_keypoints: Vec<Keypoint>,
    /// Correspondences, `query_idx` into the source and `train_idx` into the destination keypoints.
    pub matches: Vec<Match>,
    /// Inlier flag of every match, all `false` on fallback.
    pub inliers: Vec<bool>,
    /// Counts and outcome.
    pub diagnostics: Diagnostics,
    /// Source blended with the warped destination, when requested.
    pub preview: Option<Image<u8, C>>,
}

impl<const C: usize> Registration<C> {
    /// Whether a homography was estimated.
    pub fn is_success(&self) -> bool {
        self.diagnostics.is_success()
    }
}

fn validate_roi(roi: &Rect, size: ImageSize, image: &'static str) -> Result<(), RegistrationError> {
    roi.validate(size).map_err(|err| match err {
        ImageError::EmptyRect(..) => RegistrationError::EmptyRoi(*roi),
        _ => RegistrationError::RoiOutOfBounds {
            roi: *roi,
            image,
            size,
        },
    })
}

/// Crop the region of interest, convert it to gray and extract features.
fn extract<const C: usize>(
    image: &Image<u8, C>,
    roi: &Rect,
    config: &RegistrationConfig,
) -> Result<Features, RegistrationError> {
    let crop = crop_rect(image, roi)?;
    let gray = gray_f32_from_u8(&crop)?;
    let mut features = config.detector.extractor().detect_and_compute(&gray)?;

    // move keypoints to full image coordinates
    for kp in features.keypoints.iter_mut() {
        kp.x += roi.x as f32;
        kp.y += roi.y as f32;
    }
    Ok(features)
}

/// Register `destination` onto `source` using the features inside `roi`.
///
/// The region of interest is cropped from both images, features are
/// extracted with the configured detector and matched, and a homography is
/// fitted with RANSAC. The homography maps destination coordinates onto
/// source coordinates in the full, uncropped images.
///
/// When fewer than `config.min_matches` correspondences are found or no
/// consistent homography exists, the identity is returned and
/// [`Diagnostics::status`] is [`Status::Fallback`]. This is not an error.
///
/// # Arguments
///
/// * `source` - The reference image.
/// * `destination` - The image to align onto the reference.
/// * `roi` - The region of interest, in coordinates of both images.
/// * `config` - The registration parameters.
///
/// # Errors
///
/// Channel counts other than 1 or 3, an empty region of interest, or one
/// exceeding either image, and a blend weight outside `[0, 1]`.
pub fn register<const C: usize>(
    source: &Image<u8, C>,
    destination: &Image<u8, C>,
    roi: Rect,
    config: &RegistrationConfig,
) -> Result<Registration<C>, RegistrationError> {
    if C != 1 && C != 3 {
        return Err(RegistrationError::UnsupportedChannels(C));
    }
    if !(0.0..=1.0).contains(&config.blend_alpha) {
        return Err(RegistrationError::InvalidBlendAlpha(config.blend_alpha));
    }
    validate_roi(&roi, source.size(), "source")?;
    validate_roi(&roi, destination.size(), "destination")?;

    let (source_features, destination_features) = rayon::join(
        || extract(source, &roi, config),
        || extract(destination, &roi, config),
    );
    let (source_features, destination_features) = (source_features?, destination_features?);
    debug!(
        "{}: {} source and {} destination keypoints",
        config.detector,
        source_features.len(),
        destination_features.len()
    );

    let matches = match_features(
        &source_features.descriptors,
        &destination_features.descriptors,
        config.detector.match_strategy(),
    )?;
    debug!("{} matches", matches.len());

    let mut diagnostics = Diagnostics {
        status: Status::Fallback,
        reason: None,
        source_keypoints: source_features.len(),
        destination_keypoints: destination_features.len(),
        match_count: matches.len(),
        inlier_count: 0,
    };

    let (local_homography, inliers) = if matches.len() < config.min_matches {
        diagnostics.reason = Some(FallbackReason::InsufficientMatches {
            found: matches.len(),
            required: config.min_matches,
        });
        (IDENTITY, vec![false; matches.len()])
    } else {
        // destination points map onto source points, both relative to the roi
        let (ox, oy) = (roi.x as f64, roi.y as f64);
        let point = |kp: &Keypoint| [kp.x as f64 - ox, kp.y as f64 - oy];
        let from = matches
            .iter()
            .map(|m| point(&destination_features.keypoints[m.train_idx]))
            .collect::<Vec<_>>();
        let to = matches
            .iter()
            .map(|m| point(&source_features.keypoints[m.query_idx]))
            .collect::<Vec<_>>();

        let fit = estimate_homography(&from, &to, &config.ransac_params());
        match fit.error {
            Some(err) => {
                diagnostics.reason = Some(FallbackReason::EstimationFailed(err));
                (IDENTITY, fit.inliers)
            }
            None => {
                diagnostics.status = Status::Success;
                diagnostics.inlier_count = fit.inlier_count;
                (fit.homography, fit.inliers)
            }
        }
    };

    let homography = match diagnostics.status {
        Status::Success => re_anchor(&local_homography, roi.x as f64, roi.y as f64),
        Status::Fallback => IDENTITY,
    };

    match &diagnostics.reason {
        Some(reason) => info!("registration fell back to the identity: {reason}"),
        None => debug!("registration succeeded: {diagnostics}"),
    }

    let preview = if config.render_preview {
        Some(render_preview(
            source,
            destination,
            &homography,
            config.blend_alpha,
        )?)
    } else {
        None
    };

    Ok(Registration {
        homography,
        local_homography,
        roi,
        source_keypoints: source_features.keypoints,
        destination_keypoints: destination_features.keypoints,
        matches,
        inliers,
        diagnostics,
        preview,
    })
}

/// Warp `destination` into the frame of `source` and blend the two.
///
/// The output has the size of `source` and holds
/// `alpha * source + (1 - alpha) * warped`, where `warped` is black outside
/// the warped destination.
///
/// # Arguments
///
/// * `source` - The reference image.
/// * `destination` - The image to warp.
/// * `homography` - Maps destination coordinates onto source coordinates.
/// * `alpha` - Weight of the source image.
pub fn render_preview<const C: usize>(
    source: &Image<u8, C>,
    destination: &Image<u8, C>,
    homography: &Mat3,
    alpha: f32,
) -> Result<Image<u8, C>, RegistrationError> {
    let source_f32 = source.cast_and_scale::<f32>(1.0)?;
    let destination_f32 = destination.cast_and_scale::<f32>(1.0)?;

    let m = [
        homography[0][0] as f32,
        homography[0][1] as f32,
        homography[0][2] as f32,
        homography[1][0] as f32,
        homography[1][1] as f32,
        homography[1][2] as f32,
        homography[2][0] as f32,
        homography[2][1] as f32,
        homography[2][2] as f32,
    ];

    let mut warped = Image::<f32, C>::from_size_val(source.size(), 0.0)?;
    warp_perspective(&destination_f32, &mut warped, &m, InterpolationMode::Bilinear)?;

    let mut blended = Image::<f32, C>::from_size_val(source.size(), 0.0)?;
    add_weighted(&source_f32, alpha, &warped, 1.0 - alpha, 0.0, &mut blended)?;

    let data = blended
        .as_slice()
        .iter()
        .map(|v| v.round().clamp(0.0, 255.0) as u8)
        .collect();
    Ok(Image::new(source.size(), data)?)
}
