use argh::FromArgs;
use std::path::{Path, PathBuf};

use photoreg::image::{Image, ImageSize, Rect};
use photoreg::imgproc::features::DetectorKind;
use photoreg::{draw_matches, register, RegistrationConfig};

fn parse_roi(value: &str) -> Result<Rect, String> {
    let parts = value
        .split(',')
        .map(|v| v.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid roi `{value}`: {e}"))?;
    match parts.as_slice() {
        [x, y, w, h] => Ok(Rect::new(*x, *y, *w, *h)),
        _ => Err(format!("expected x,y,w,h, got `{value}`")),
    }
}

fn parse_detector(value: &str) -> Result<DetectorKind, String> {
    value.parse().map_err(|e| format!("{e}"))
}

/// Register a destination photograph onto a source photograph.
#[derive(FromArgs)]
struct Args {
    /// path to the reference image
    #[argh(positional)]
    source: PathBuf,

    /// path to the image to align
    #[argh(positional)]
    destination: PathBuf,

    /// region of interest as x,y,w,h, defaults to the whole source image
    #[argh(option, from_str_fn(parse_roi))]
    roi: Option<Rect>,

    /// feature detector: orb, sift, akaze or brisk
    #[argh(option, from_str_fn(parse_detector))]
    detector: Option<DetectorKind>,

    /// minimum number of matches before estimating a homography
    #[argh(option)]
    min_matches: Option<usize>,

    /// path to a json registration config
    #[argh(option)]
    config: Option<PathBuf>,

    /// path to write the blended preview to
    #[argh(option)]
    output: Option<PathBuf>,

    /// path to write the side by side matches to
    #[argh(option)]
    matches: Option<PathBuf>,
}

fn read_rgb(path: &Path) -> Result<Image<u8, 3>, Box<dyn std::error::Error>> {
    let img = image::open(path)?.to_rgb8();
    let size = ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    };
    Ok(Image::new(size, img.into_raw())?)
}

fn write_rgb(path: &Path, img: &Image<u8, 3>) -> Result<(), Box<dyn std::error::Error>> {
    let buffer = image::RgbImage::from_raw(
        img.width() as u32,
        img.height() as u32,
        img.as_slice().to_vec(),
    )
    .ok_or("image buffer does not match its size")?;
    buffer.save(path)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut config = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => RegistrationConfig::default(),
    };
    if let Some(detector) = args.detector {
        config.detector = detector;
    }
    if let Some(min_matches) = args.min_matches {
        config.min_matches = min_matches;
    }
    config.render_preview |= args.output.is_some();

    let source = read_rgb(&args.source)?;
    let destination = read_rgb(&args.destination)?;
    let roi = args.roi.unwrap_or_else(|| Rect::full(source.size()));
    log::info!("registering with {} inside {roi}", config.detector);

    let registration = register(&source, &destination, roi, &config)?;
    println!("{}", registration.diagnostics);
    println!("homography: {:?}", registration.homography);

    if let (Some(path), Some(preview)) = (&args.output, &registration.preview) {
        write_rgb(path, preview)?;
        println!("preview written to {}", path.display());
    }

    if let Some(path) = &args.matches {
        let canvas = draw_matches(&source, &destination, &registration)?;
        write_rgb(path, &canvas)?;
        println!("matches written to {}", path.display());
    }

    Ok(())
}
