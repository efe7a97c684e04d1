//! Ranking and minimum-size filtering of detected faces.
//!
//! The detector produces ghost detections at extreme scales; anything whose
//! landmark extent is too small for the working resolution is dropped before
//! it reaches the overlay or the export.

use crate::config::RankingConfig;
use crate::coordinate_mapping::to_working_pixels;
use crate::detector::FaceCandidate;

/// Axis-aligned extent of a candidate in working-raster pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceExtent {
    /// Left edge
    pub min_x: f64,
    /// Top edge
    pub min_y: f64,
    /// `max(x) - min(x)`
    pub width: f64,
    /// `max(y) - min(y)`
    pub height: f64,
}

impl FaceExtent {
    /// `width * height`
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Compute the extent of a candidate on a `working_width` x `working_height` raster
#[must_use]
pub fn compute_extent(candidate: &FaceCandidate, working_width: u32, working_height: u32) -> Option<FaceExtent> {
    let mut points = candidate
        .points
        .iter()
        .map(|p| to_working_pixels(p, working_width, working_height));
    let (x0, y0) = points.next()?;
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (x0, x0, y0, y0);
    for (x, y) in points {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    Some(FaceExtent {
        min_x,
        min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    })
}

/// Result of ranking and filtering one detection pass
#[derive(Debug, Clone, Default)]
pub struct RankedFaces {
    /// Retained candidates, largest first
    pub faces: Vec<FaceCandidate>,
    /// Extents matching `faces`
    pub extents: Vec<FaceExtent>,
    /// Minimum side length that was applied
    pub effective_min_size: f64,
    /// Number of candidates dropped as too small or over the face limit
    pub discarded: usize,
}

/// Orders candidates by area and drops implausibly small ones
#[derive(Debug, Clone)]
pub struct FaceRanker {
    thresholds: RankingConfig,
    max_faces: usize,
}

impl FaceRanker {
    /// Create a ranker keeping at most `max_faces` faces (0 keeps all)
    #[must_use]
    pub fn new(thresholds: RankingConfig, max_faces: usize) -> Self {
        Self { thresholds, max_faces }
    }

    /// Minimum face side before multi-face relaxation.
    ///
    /// Portrait rasters use the portrait fraction; landscape rasters use the
    /// upscaled fraction when the source was enlarged, the landscape
    /// fraction otherwise.
    #[must_use]
    pub fn base_min_size(&self, working_width: u32, working_height: u32, upscaled: bool) -> f64 {
        let fraction = if working_height > working_width {
            self.thresholds.portrait_fraction
        } else if upscaled {
            self.thresholds.upscaled_fraction
        } else {
            self.thresholds.landscape_fraction
        };
        f64::from(working_width.min(working_height)) * fraction
    }

    /// Minimum face side once more than one face clears `base`.
    ///
    /// Always strictly below `base` for a positive relaxation fraction, in
    /// every orientation.
    #[must_use]
    pub fn relaxed_min_size(&self, base: f64) -> f64 {
        base * (1.0 - self.thresholds.multi_face_fraction)
    }

    /// Rank by extent area, largest first. Ties keep detector order.
    #[must_use]
    pub fn rank(
        &self,
        candidates: Vec<FaceCandidate>,
        working_width: u32,
        working_height: u32,
    ) -> Vec<(FaceCandidate, FaceExtent)> {
        let mut ranked: Vec<(FaceCandidate, FaceExtent)> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let extent = compute_extent(&candidate, working_width, working_height)?;
                Some((candidate, extent))
            })
            .collect();
        // sort_by is stable, so equal areas stay in detector order
        ranked.sort_by(|a, b| b.1.area().total_cmp(&a.1.area()));
        ranked
    }

    /// Rank and filter the candidates of one detection pass
    #[must_use]
    pub fn select(
        &self,
        candidates: Vec<FaceCandidate>,
        working_width: u32,
        working_height: u32,
        upscaled: bool,
    ) -> RankedFaces {
        let total = candidates.len();
        let ranked = self.rank(candidates, working_width, working_height);
        let base = self.base_min_size(working_width, working_height, upscaled);

        let above_base = ranked.iter().filter(|(_, e)| e.area() >= base * base).count();
        let effective_min_size = if above_base > 1 {
            self.relaxed_min_size(base)
        } else {
            base
        };
        let min_area = effective_min_size * effective_min_size;

        let mut faces = Vec::new();
        let mut extents = Vec::new();
        for (candidate, extent) in ranked {
            if extent.area() < min_area {
                log::debug!(
                    "Discarding face of {:.1}x{:.1} below minimum size {:.1}",
                    extent.width,
                    extent.height,
                    effective_min_size
                );
                continue;
            }
            if self.max_faces > 0 && faces.len() >= self.max_faces {
                break;
            }
            faces.push(candidate);
            extents.push(extent);
        }

        let discarded = total - faces.len();
        if discarded > 0 {
            log::info!("Kept {} of {} detected face(s)", faces.len(), total);
        }
        RankedFaces {
            faces,
            extents,
            effective_min_size,
            discarded,
        }
    }
}
