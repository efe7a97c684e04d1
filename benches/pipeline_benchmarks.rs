//! Benchmarks for ranking, remapping, overlay rendering and resizing

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use landetect::{
    config::{OverlayConfig, RankingConfig},
    coordinate_mapping::{remap_faces, ScaleChain, StageKind},
    detector::{FaceCandidate, LandmarkPoint},
    face_ranking::FaceRanker,
    overlay::OverlayRenderer,
    utils::image_conversion::{blend_weighted, resize_area},
};

/// 478 points on a ring, roughly face shaped
fn mesh_face(center_x: f64, center_y: f64, radius: f64) -> FaceCandidate {
    let points = (0..478u32)
        .map(|i| {
            let angle = f64::from(i) * 2.0 * std::f64::consts::PI / 478.0;
            let r = radius * (0.3 + 0.7 * f64::from(i % 7) / 6.0);
            LandmarkPoint::with_depth(i, center_x + r * angle.cos(), center_y + r * angle.sin(), -0.01)
        })
        .collect();
    FaceCandidate::new(points)
}

fn benchmark_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("face_ranking");
    let ranker = FaceRanker::new(RankingConfig::default(), 5);
    let candidates: Vec<FaceCandidate> = (0..5)
        .map(|i| mesh_face(0.15 + 0.17 * f64::from(i), 0.5, 0.05 + 0.02 * f64::from(i)))
        .collect();

    group.bench_function("select_5_faces", |b| {
        b.iter(|| {
            let ranked = ranker.select(black_box(candidates.clone()), 960, 720, true);
            black_box(ranked);
        });
    });

    group.finish();
}

fn benchmark_remap(c: &mut Criterion) {
    let mut group = c.benchmark_group("coordinate_mapping");
    let faces = vec![mesh_face(0.5, 0.5, 0.2), mesh_face(0.2, 0.3, 0.1)];
    let mut chain = ScaleChain::new();
    chain.push(StageKind::WorkingUpscale, 2.0).expect("valid factor");
    chain.push(StageKind::LowResolutionUpscale, 1.5).expect("valid factor");
    chain.push(StageKind::Search, 0.75).expect("valid factor");

    group.bench_function("remap_two_faces_three_stages", |b| {
        b.iter(|| {
            let records = remap_faces(black_box(&faces), 720, 540, &chain, Some(0));
            black_box(records);
        });
    });

    group.finish();
}

fn benchmark_overlay(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlay");
    let renderer = OverlayRenderer::new(OverlayConfig::default());
    let frame = RgbImage::from_pixel(640, 480, Rgb([90, 120, 150]));
    let working = RgbImage::from_pixel(960, 720, Rgb([90, 120, 150]));
    let faces = vec![mesh_face(0.5, 0.5, 0.2)];

    group.bench_function("render_640x480", |b| {
        b.iter(|| {
            let output = renderer.render(black_box(&frame), &faces).expect("render failed");
            black_box(output);
        });
    });

    group.bench_function("render_restored_960_to_320", |b| {
        b.iter(|| {
            let output = renderer
                .render_restored(black_box(&working), &faces, 320, 240)
                .expect("render failed");
            black_box(output);
        });
    });

    group.bench_function("blend_640x480", |b| {
        b.iter(|| {
            let output = blend_weighted(black_box(&frame), &frame, 0.5).expect("blend failed");
            black_box(output);
        });
    });

    group.bench_function("resize_area_960_to_320", |b| {
        b.iter(|| {
            let output = resize_area(black_box(&working), 320, 240).expect("resize failed");
            black_box(output);
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_ranking, benchmark_remap, benchmark_overlay);
criterion_main!(benches);
