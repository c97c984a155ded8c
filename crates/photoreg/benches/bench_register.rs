use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use photoreg::image::{Image, ImageSize, Rect};
use photoreg::imgproc::features::DetectorKind;
use photoreg::{register, render_preview, RegistrationConfig};

/// Two windows of a random block texture, shifted by (12, 7) pixels.
fn shifted_pair(size: ImageSize) -> (Image<u8, 3>, Image<u8, 3>) {
    let (w, h) = (size.width + 12, size.height + 7);
    let mut rng = StdRng::seed_from_u64(42);
    let blocks_x = w.div_ceil(8);
    let levels = (0..blocks_x * h.div_ceil(8))
        .map(|_| rng.random::<u8>())
        .collect::<Vec<_>>();

    let window = |x0: usize, y0: usize| {
        let data = (0..size.height)
            .flat_map(|y| (0..size.width).map(move |x| (x + x0, y + y0)))
            .flat_map(|(x, y)| [levels[(y / 8) * blocks_x + x / 8]; 3])
            .collect();
        Image::new(size, data).unwrap()
    };
    (window(12, 7), window(0, 0))
}

fn bench_register(c: &mut Criterion) {
    let mut group = c.benchmark_group("Register");
    group.sample_size(10);

    let size = ImageSize {
        width: 320,
        height: 240,
    };
    let (source, destination) = shifted_pair(size);
    let roi = Rect::full(size);

    for detector in DetectorKind::ALL {
        let config = RegistrationConfig::with_detector(detector);
        group.bench_with_input(
            BenchmarkId::new("register", detector),
            &config,
            |b, config| b.iter(|| black_box(register(&source, &destination, roi, config))),
        );
    }

    let homography = [[1.0, 0.0, -12.0], [0.0, 1.0, -7.0], [0.0, 0.0, 1.0]];
    group.bench_function("render_preview", |b| {
        b.iter(|| black_box(render_preview(&source, &destination, &homography, 0.5)))
    });

    group.finish();
}

criterion_group!(benches, bench_register);
criterion_main!(benches);
