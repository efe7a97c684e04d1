//! Face ranking and minimum-size filtering tests


use landetect::config::RankingConfig;
use landetect::detector::{FaceCandidate, LandmarkPoint};
use landetect::face_ranking::FaceRanker;
use test_helpers::square_face;

#[test]
fn test_ranking_orders_by_area() {
    let ranker = FaceRanker::new(RankingConfig::default(), 0);
    // Areas 100, 400, 225 on a 100x100 raster
    let candidates = vec![
        square_face(0.0, 0.0, 0.1),
        square_face(0.3, 0.3, 0.2),
        square_face(0.6, 0.6, 0.15),
    ];
    let ranked = ranker.rank(candidates, 100, 100);
    let areas: Vec<f64> = ranked.iter().map(|(_, extent)| extent.area().round()).collect();
    assert_eq!(areas, vec![400.0, 225.0, 100.0]);
}

#[test]
fn test_ranking_ties_keep_detector_order() {
    let ranker = FaceRanker::new(RankingConfig::default(), 0);
    let candidates = vec![
        square_face(0.5, 0.0, 0.25),
        square_face(0.0, 0.0, 0.5),
        square_face(0.0, 0.5, 0.25),
        square_face(0.25, 0.25, 0.25),
    ];
    let ranked = ranker.rank(candidates, 64, 64);
    let lefts: Vec<f64> = ranked.iter().map(|(face, _)| face.points[0].x).collect();
    assert_eq!(lefts, vec![0.0, 0.5, 0.0, 0.25]);
    let tops: Vec<f64> = ranked.iter().map(|(face, _)| face.points[0].y).collect();
    assert_eq!(tops, vec![0.0, 0.0, 0.5, 0.25]);
}

#[test]
fn test_threshold_is_inclusive() {
    // 1/16 of 1024 is exactly 64 pixels
    let thresholds = RankingConfig {
        landscape_fraction: 0.0625,
        ..RankingConfig::default()
    };
    let ranker = FaceRanker::new(thresholds, 0);
    let at_threshold = square_face(0.0, 0.0, 0.0625);
    let below = square_face(0.5, 0.5, 0.0615);

    let ranked = ranker.select(vec![below, at_threshold], 1024, 1024, false);
    assert!((ranked.effective_min_size - 64.0).abs() < f64::EPSILON);
    assert_eq!(ranked.faces.len(), 1);
    assert_eq!(ranked.faces[0].points[0].x, 0.0);
    assert_eq!(ranked.discarded, 1);
}

#[test]
fn test_ghost_detections_dropped() {
    let ranker = FaceRanker::new(RankingConfig::default(), 0);
    // 640x480 landscape, not upscaled: minimum side 28.8px
    let real = square_face(0.2, 0.2, 0.3);
    let ghost = square_face(0.9, 0.9, 0.01);
    let ranked = ranker.select(vec![ghost, real], 640, 480, false);
    assert_eq!(ranked.faces.len(), 1);
    assert!(ranked.extents[0].width > 100.0);
}

#[test]
fn test_portrait_uses_smaller_fraction() {
    let ranker = FaceRanker::new(RankingConfig::default(), 0);
    // 20px face on a 480x640 portrait: portrait minimum is 14.4px, landscape would be 28.8px
    let face = square_face(0.1, 0.1, 20.0 / 480.0);
    assert_eq!(ranker.select(vec![face.clone()], 480, 640, false).faces.len(), 1);
    assert_eq!(ranker.select(vec![face], 640, 480, false).faces.len(), 0);
}

#[test]
fn test_portrait_multi_face_relaxes_threshold() {
    let ranker = FaceRanker::new(RankingConfig::default(), 0);
    // 480x640 portrait: base 14.4px, relaxed to 13.968px once two faces clear it
    let first = square_face(0.1, 0.1, 0.2);
    let second = square_face(0.5, 0.5, 0.1);
    let small = FaceCandidate::new(vec![
        LandmarkPoint::new(0, 0.7, 0.7),
        LandmarkPoint::new(1, 0.7 + 14.0 / 480.0, 0.7 + 14.0 / 640.0),
    ]);

    let ranked = ranker.select(vec![first, second, small.clone()], 480, 640, false);
    assert!(ranked.effective_min_size < 14.4);
    assert!((ranked.effective_min_size - 13.968).abs() < 1e-9);
    assert_eq!(ranked.faces.len(), 3);
    assert_eq!(ranked.discarded, 0);

    // Alone, the same 14px face is below the base threshold
    let ranked = ranker.select(vec![small], 480, 640, false);
    assert!(ranked.faces.is_empty());
}
