use approx::assert_relative_eq;
use rand::{rngs::StdRng, Rng, SeedableRng};

use photoreg::geometry::{linalg::transform_point, IDENTITY};
use photoreg::image::{Image, ImageSize, Rect};
use photoreg::imgproc::features::DetectorKind;
use photoreg::{register, FallbackReason, RegistrationConfig, RegistrationError, Status};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Gray levels of a texture of random 8x8 blocks.
fn texture(width: usize, height: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let block = 8;
    let blocks_x = width.div_ceil(block);
    let levels: Vec<u8> = (0..blocks_x * height.div_ceil(block))
        .map(|_| rng.random::<u8>())
        .collect();
    (0..width * height)
        .map(|i| levels[((i / width) / block) * blocks_x + (i % width) / block])
        .collect()
}

/// Window of a larger texture starting at `(x0, y0)`.
fn window(big: &[u8], big_width: usize, x0: usize, y0: usize, size: ImageSize) -> Image<u8, 1> {
    let data = (0..size.height)
        .flat_map(|y| (0..size.width).map(move |x| big[(y + y0) * big_width + x + x0]))
        .collect();
    Image::new(size, data).unwrap()
}

/// A source and a destination with `destination(x, y) = source(x - 10, y - 5)`.
fn shifted_pair(side: usize) -> (Image<u8, 1>, Image<u8, 1>) {
    let big_side = side + 20;
    let big = texture(big_side, big_side, 17);
    let size = ImageSize {
        width: side,
        height: side,
    };
    let source = window(&big, big_side, 10, 5, size);
    let destination = window(&big, big_side, 0, 0, size);
    (source, destination)
}

fn to_rgb(image: &Image<u8, 1>) -> Image<u8, 3> {
    let data = image.as_slice().iter().flat_map(|&v| [v, v, v]).collect();
    Image::new(image.size(), data).unwrap()
}

#[test]
fn test_zero_features_falls_back_to_identity() -> Result<(), RegistrationError> {
    init_logger();
    let flat = Image::<u8, 1>::from_size_val([100, 100].into(), 128)?;

    for detector in DetectorKind::ALL {
        let config = RegistrationConfig::with_detector(detector);
        let registration = register(&flat, &flat, Rect::full(flat.size()), &config)?;

        assert_eq!(registration.homography, IDENTITY);
        assert_eq!(registration.diagnostics.status, Status::Fallback);
        assert_eq!(registration.diagnostics.source_keypoints, 0);
        assert_eq!(
            registration.diagnostics.reason,
            Some(FallbackReason::InsufficientMatches {
                found: 0,
                required: 10
            })
        );
    }
    Ok(())
}

#[test]
fn test_textured_against_flat_falls_back() -> Result<(), RegistrationError> {
    init_logger();
    let (source, _) = shifted_pair(100);
    let flat = Image::<u8, 1>::from_size_val(source.size(), 30)?;

    let registration = register(
        &source,
        &flat,
        Rect::full(source.size()),
        &RegistrationConfig::default(),
    )?;
    assert!(registration.diagnostics.source_keypoints > 0);
    assert_eq!(registration.diagnostics.match_count, 0);
    assert_eq!(registration.homography, IDENTITY);
    Ok(())
}

#[test]
fn test_too_few_matches_falls_back() -> Result<(), RegistrationError> {
    init_logger();
    let (source, destination) = shifted_pair(100);
    let config = RegistrationConfig {
        min_matches: 100_000,
        ..Default::default()
    };

    let registration = register(&source, &destination, Rect::full(source.size()), &config)?;
    let found = registration.diagnostics.match_count;
    assert!(found < 100_000);
    assert_eq!(registration.homography, IDENTITY);
    assert_eq!(
        registration.diagnostics.reason,
        Some(FallbackReason::InsufficientMatches {
            found,
            required: 100_000
        })
    );
    assert!(registration.inliers.iter().all(|&m| !m));
    Ok(())
}

#[test]
fn test_self_registration_is_identity() -> Result<(), RegistrationError> {
    init_logger();
    let image = to_rgb(&window(&texture(128, 128, 5), 128, 0, 0, [128, 128].into()));

    for detector in DetectorKind::ALL {
        let config = RegistrationConfig::with_detector(detector);
        let registration = register(&image, &image, Rect::full(image.size()), &config)?;

        assert!(registration.is_success(), "{detector}: {}", registration.diagnostics);
        assert_eq!(
            registration.diagnostics.inlier_count,
            registration.diagnostics.match_count
        );
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(registration.homography[i][j], IDENTITY[i][j], epsilon = 1e-3);
            }
        }
    }
    Ok(())
}

#[test]
fn test_shift_recovers_translation() -> Result<(), RegistrationError> {
    init_logger();
    let (source, destination) = shifted_pair(100);

    let registration = register(
        &source,
        &destination,
        Rect::full(source.size()),
        &RegistrationConfig::default(),
    )?;

    assert!(registration.is_success(), "{}", registration.diagnostics);
    assert!(registration.diagnostics.inlier_count >= 4);

    let h = registration.homography;
    assert!((h[0][2] / h[2][2] + 10.0).abs() < 1.0, "{h:?}");
    assert!((h[1][2] / h[2][2] + 5.0).abs() < 1.0, "{h:?}");

    let center = transform_point(&h, [50.0, 50.0]).unwrap_or_default();
    assert!((center[0] - 40.0).abs() < 1.0 && (center[1] - 45.0).abs() < 1.0);
    Ok(())
}

#[test]
fn test_roi_registration_is_re_anchored() -> Result<(), RegistrationError> {
    init_logger();
    let (source, destination) = shifted_pair(160);
    let roi = Rect::new(20, 20, 120, 120);

    let registration = register(&source, &destination, roi, &RegistrationConfig::default())?;
    assert!(registration.is_success(), "{}", registration.diagnostics);

    // keypoints are reported in full image coordinates
    assert!(registration
        .source_keypoints
        .iter()
        .all(|kp| kp.x >= 20.0 && kp.y >= 20.0 && kp.x < 140.0 && kp.y < 140.0));

    // the point (60, 70) of the destination shows the source point (50, 65)
    let p = transform_point(&registration.homography, [60.0, 70.0]).unwrap_or_default();
    assert!((p[0] - 50.0).abs() < 1.0, "{p:?}");
    assert!((p[1] - 65.0).abs() < 1.0, "{p:?}");
    Ok(())
}

#[test]
fn test_full_image_roi_is_valid() -> Result<(), RegistrationError> {
    init_logger();
    let image = Image::<u8, 3>::from_size_val([64, 48].into(), 10)?;
    let registration = register(
        &image,
        &image,
        Rect::new(0, 0, 64, 48),
        &RegistrationConfig::default(),
    );
    assert!(registration.is_ok());
    Ok(())
}

#[test]
fn test_contract_violations() -> Result<(), RegistrationError> {
    init_logger();
    let source = Image::<u8, 1>::from_size_val([64, 48].into(), 0)?;
    let destination = Image::<u8, 1>::from_size_val([60, 48].into(), 0)?;
    let config = RegistrationConfig::default();

    let roi = Rect::new(0, 0, 64, 48);
    assert_eq!(
        register(&source, &destination, roi, &config).err(),
        Some(RegistrationError::RoiOutOfBounds {
            roi,
            image: "destination",
            size: destination.size(),
        })
    );

    let roi = Rect::new(10, 10, 0, 5);
    assert_eq!(
        register(&source, &source, roi, &config).err(),
        Some(RegistrationError::EmptyRoi(roi))
    );

    let two_channels = Image::<u8, 2>::from_size_val([8, 8].into(), 0)?;
    assert_eq!(
        register(&two_channels, &two_channels, Rect::new(0, 0, 8, 8), &config).err(),
        Some(RegistrationError::UnsupportedChannels(2))
    );

    let config = RegistrationConfig {
        blend_alpha: 1.5,
        ..Default::default()
    };
    assert_eq!(
        register(&source, &source, Rect::new(0, 0, 8, 8), &config).err(),
        Some(RegistrationError::InvalidBlendAlpha(1.5))
    );
    Ok(())
}

#[test]
fn test_preview_aligns_destination() -> Result<(), RegistrationError> {
    init_logger();
    let (source, destination) = shifted_pair(100);
    let config = RegistrationConfig {
        render_preview: true,
        ..Default::default()
    };

    let registration = register(&source, &destination, Rect::full(source.size()), &config)?;
    let Some(preview) = registration.preview else {
        panic!("preview requested");
    };
    assert_eq!(preview.size(), source.size());

    // inside the overlap the blend of two aligned images is the source itself
    let mut total = 0.0f64;
    let mut count = 0usize;
    for y in 10..80 {
        for x in 10..80 {
            let idx = y * 100 + x;
            total += (preview.as_slice()[idx] as f64 - source.as_slice()[idx] as f64).abs();
            count += 1;
        }
    }
    assert!(total / (count as f64) < 8.0);
    Ok(())
}

#[test]
fn test_registration_is_deterministic() -> Result<(), RegistrationError> {
    init_logger();
    let (source, destination) = shifted_pair(100);
    let config = RegistrationConfig::default();
    let roi = Rect::full(source.size());

    let a = register(&source, &destination, roi, &config)?;
    let b = register(&source, &destination, roi, &config)?;
    assert_eq!(a.homography, b.homography);
    assert_eq!(a.matches, b.matches);
    assert_eq!(a.diagnostics, b.diagnostics);
    Ok(())
}
