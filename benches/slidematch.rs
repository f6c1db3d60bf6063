use criterion::{criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use slidematch::background::NormalizedBackground;
use slidematch::{MatchConfig, Matcher, Shape};
use std::hint::black_box;

fn make_edges(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let v = if ((x * 13) ^ (y * 7) ^ (x * y)) % 23 == 0 {
            255
        } else {
            0
        };
        Rgb([v, v, v])
    })
}

fn make_ring(side: u32) -> Shape {
    let img = RgbImage::from_fn(side, side, |x, y| {
        let on = x < 2 || y < 2 || x >= side - 2 || y >= side - 2;
        let v = if on { 255 } else { 0 };
        Rgb([v, v, v])
    });
    Shape::new(img).unwrap()
}

fn bench_locate(c: &mut Criterion) {
    let mut edges = make_edges(296, 200);
    let shape = make_ring(44);
    image::imageops::replace(&mut edges, shape.image(), 180, 70);
    let display = RgbImage::new(296, 200);
    let background = NormalizedBackground::from_parts(edges, display).unwrap();

    let scalar = Matcher::new().with_config(MatchConfig {
        parallel: false,
        ..MatchConfig::default()
    });
    c.bench_function("locate_scalar_296x200_t44", |b| {
        b.iter(|| {
            let result = scalar
                .locate(black_box(&shape), black_box(&background))
                .unwrap();
            black_box(result);
        })
    });

    let parallel = Matcher::new().with_config(MatchConfig {
        parallel: true,
        ..MatchConfig::default()
    });
    c.bench_function("locate_parallel_296x200_t44", |b| {
        b.iter(|| {
            let result = parallel
                .locate(black_box(&shape), black_box(&background))
                .unwrap();
            black_box(result);
        })
    });
}

criterion_group!(benches, bench_locate);
criterion_main!(benches);
