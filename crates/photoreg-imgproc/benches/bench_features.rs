use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use photoreg_image::{Image, ImageSize};
use photoreg_imgproc::features::{fast_corners, match_features, DetectorKind};

fn textured_image(size: ImageSize, block: usize) -> Image<f32, 1> {
    let mut rng = StdRng::seed_from_u64(42);
    let blocks_x = size.width.div_ceil(block);
    let levels: Vec<f32> = (0..blocks_x * size.height.div_ceil(block))
        .map(|_| rng.random_range(0.0..1.0))
        .collect();
    let data = (0..size.area())
        .map(|i| {
            let (x, y) = (i % size.width, i / size.width);
            levels[(y / block) * blocks_x + x / block]
        })
        .collect();
    Image::new(size, data).unwrap()
}

fn bench_fast_corners(c: &mut Criterion) {
    let mut group = c.benchmark_group("FastCorners");

    for (width, height) in [(320, 240), (640, 480)].iter() {
        let image = textured_image([*width, *height].into(), 12);
        let parameter_string = format!("{width}x{height}");

        group.bench_with_input(
            BenchmarkId::new("fast_nms", &parameter_string),
            &image,
            |b, i| b.iter(|| black_box(fast_corners(i, 20.0 / 255.0, 9, true))),
        );
    }

    group.finish();
}

fn bench_detect_and_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("DetectAndMatch");
    group.sample_size(10);

    let image = textured_image([320, 240].into(), 12);

    for kind in DetectorKind::ALL {
        let extractor = kind.extractor();

        group.bench_with_input(BenchmarkId::new("detect", kind), &image, |b, i| {
            b.iter(|| black_box(extractor.detect_and_compute(i)).unwrap())
        });

        let features = extractor.detect_and_compute(&image).unwrap();
        group.bench_with_input(BenchmarkId::new("match", kind), &features, |b, f| {
            b.iter(|| {
                black_box(match_features(
                    &f.descriptors,
                    &f.descriptors,
                    kind.match_strategy(),
                ))
                .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fast_corners, bench_detect_and_match);
criterion_main!(benches);
