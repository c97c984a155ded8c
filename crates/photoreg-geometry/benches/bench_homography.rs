use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use photoreg_geometry::{homography_dlt, ransac_homography, RansacParams};

fn correspondences(n: usize, outlier_every: usize) -> (Vec<[f64; 2]>, Vec<[f64; 2]>) {
    let mut rng = StdRng::seed_from_u64(7);
    let from = (0..n)
        .map(|_| [rng.random_range(0.0..640.0), rng.random_range(0.0..480.0)])
        .collect::<Vec<_>>();
    let to = from
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if i % outlier_every == 0 {
                [rng.random_range(0.0..640.0), rng.random_range(0.0..480.0)]
            } else {
                [p[0] * 1.01 - 10.0, p[1] * 0.99 + 5.0]
            }
        })
        .collect();
    (from, to)
}

fn bench_homography(c: &mut Criterion) {
    let mut group = c.benchmark_group("Homography");

    let (from, to) = correspondences(500, 3);

    group.bench_function("dlt_500", |b| {
        b.iter(|| black_box(homography_dlt(&from, &to)))
    });

    group.bench_function("ransac_500", |b| {
        b.iter(|| black_box(ransac_homography(&from, &to, &RansacParams::default())))
    });

    group.finish();
}

criterion_group!(benches, bench_homography);
criterion_main!(benches);
