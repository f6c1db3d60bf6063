//! Matcher and evaluator behavior on synthetic edge maps.

use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use slidematch::background::NormalizedBackground;
use slidematch::{
    Evaluator, MatchConfig, Matcher, OffsetCorrection, Shape, ShapeCache, SolveError,
};
use std::path::PathBuf;

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "slidematch-matcher-{}-{name}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

/// Puzzle-piece-like outline: a ring with a knob on the right side.
fn piece(side: u32) -> Shape {
    let knob = side / 4;
    let width = side + knob;
    let img = RgbImage::from_fn(width, side, |x, y| {
        let ring = x < side
            && (x < 2 || y < 2 || x >= side - 2 || y >= side - 2);
        let in_knob_rows = y >= side / 2 - knob / 2 && y < side / 2 + knob / 2;
        let knob_edge = x >= side - 2
            && in_knob_rows
            && (x >= width - 2
                || y < side / 2 - knob / 2 + 2
                || y >= side / 2 + knob / 2 - 2);
        if ring || knob_edge {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    });
    Shape::new(img).unwrap()
}

fn noise_shape(rng: &mut StdRng, width: u32, height: u32) -> Shape {
    let img = RgbImage::from_fn(width, height, |_, _| {
        let v = if rng.random_bool(0.2) { 255 } else { 0 };
        Rgb([v, v, v])
    });
    Shape::new(img).unwrap()
}

/// Sparse random edges with `shape` pasted at `(x, y)`.
fn scene(rng: &mut StdRng, shape: &Shape, x: u32, y: u32) -> NormalizedBackground {
    let mut edges = RgbImage::from_fn(296, 200, |_, _| {
        let v = if rng.random_bool(0.03) { 255 } else { 0 };
        Rgb([v, v, v])
    });
    image::imageops::replace(&mut edges, shape.image(), i64::from(x), i64::from(y));
    let display = RgbImage::from_pixel(296, 200, Rgb([90, 120, 150]));
    NormalizedBackground::from_parts(edges, display).unwrap()
}

#[test]
fn locate_recovers_pasted_offset() {
    let mut rng = StdRng::seed_from_u64(7);
    let shape = piece(40);
    let correction = OffsetCorrection::default();
    for &(x, y) in &[(0u32, 0u32), (131, 47), (246, 150)] {
        let bg = scene(&mut rng, &shape, x, y);
        let result = Matcher::new().locate(&shape, &bg).unwrap();
        assert_eq!((result.placement.x, result.placement.y), (x, y));
        assert!(result.confidence > 0.9, "confidence {}", result.confidence);
        let expected = f64::from(x) + correction.shift(shape.width());
        assert!((result.offset_x - expected).abs() < 1e-9);
        assert!((result.offset_x - f64::from(x)).abs() <= correction.cap);
    }
}

#[test]
fn correction_can_be_disabled() {
    let mut rng = StdRng::seed_from_u64(11);
    let shape = piece(30);
    let bg = scene(&mut rng, &shape, 77, 20);
    let matcher = Matcher::new().with_config(MatchConfig {
        offset_correction: None,
        ..MatchConfig::default()
    });
    let result = matcher.locate(&shape, &bg).unwrap();
    assert_eq!(result.offset_x, 77.0);
    assert_eq!(result.shift, 0.0);
}

#[test]
fn oversized_template_is_a_dimension_error() {
    let shape = piece(48);
    let bg = NormalizedBackground::from_parts(RgbImage::new(100, 40), RgbImage::new(100, 40))
        .unwrap();
    let err = Matcher::new().locate(&shape, &bg).unwrap_err();
    assert!(matches!(err, SolveError::Dimension { .. }));
    assert_eq!(err.stage(), "match");
}

#[test]
fn annotation_leaves_canvas_untouched() {
    let mut rng = StdRng::seed_from_u64(3);
    let shape = piece(24);
    let bg = scene(&mut rng, &shape, 60, 30);
    let dir = scratch("annotate");
    std::fs::create_dir_all(&dir).unwrap();
    let out = dir.join("marked.png");

    let canvas = bg.display().clone();
    let matcher = Matcher::new();
    let result = matcher.locate_annotated(&shape, &bg, &canvas, &out).unwrap();
    assert_eq!(&canvas, bg.display());

    let marked = image::open(&out).unwrap().to_rgb8();
    assert_eq!(marked.dimensions(), canvas.dimensions());
    assert_eq!(*marked.get_pixel(60, 30), Rgb([255, 0, 0]));
    assert_eq!(*marked.get_pixel(5, 5), Rgb([90, 120, 150]));
    assert_eq!(result.placement.x, 60);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn winner_is_stable_as_unrelated_shapes_are_added() {
    let mut rng = StdRng::seed_from_u64(2024);
    let truth = piece(36);
    let bg = scene(&mut rng, &truth, 170, 90);
    let dir = scratch("monotonic");
    let cache = ShapeCache::open(dir.join("gaps")).unwrap();
    let out = dir.join("result.png");
    let evaluator = Evaluator::default();

    let truth_id = cache.put(&truth).unwrap();
    for round in 0..4 {
        let eval = evaluator.evaluate(&cache, &bg, &out).unwrap().unwrap();
        assert_eq!(eval.entry, truth_id, "round {round}");
        assert_eq!(eval.result.placement.x, 170);
        for _ in 0..2 {
            let w = rng.random_range(12..60);
            let h = rng.random_range(12..60);
            cache.put(&noise_shape(&mut rng, w, h)).unwrap();
        }
    }
    assert_eq!(cache.len(), 9);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn placement_ties_keep_the_first_in_row_major_order() {
    let shape = piece(20);
    let mut edges = RgbImage::new(120, 40);
    image::imageops::replace(&mut edges, shape.image(), 10, 5);
    image::imageops::replace(&mut edges, shape.image(), 80, 5);
    let bg = NormalizedBackground::from_parts(edges, RgbImage::new(120, 40)).unwrap();

    let result = Matcher::new().locate(&shape, &bg).unwrap();
    assert_eq!(result.placement.x, 10);
}
