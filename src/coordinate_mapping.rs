//! Mapping of detector-local landmark coordinates back to original pixels.
//!
//! Every resampling applied between the original raster and the raster the
//! detector actually saw is recorded in a [`ScaleChain`]. Remapping divides by
//! the product of the whole chain, never by a single stage.

use crate::constants::{XY_DECIMALS, Z_DECIMALS};
use crate::detector::{FaceCandidate, LandmarkPoint};
use crate::{Error, Result};

/// Why a resampling stage was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// Upscale of a source below the minimum working resolution
    WorkingUpscale,
    /// Additional upscale of a source still below the secondary resolution
    LowResolutionUpscale,
    /// Factor chosen by the multi-scale search
    Search,
}

/// One multiplicative resampling step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleStage {
    /// Reason for the stage
    pub kind: StageKind,
    /// Factor applied to both sides
    pub factor: f64,
}

/// Ordered list of resampling stages applied before detection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleChain {
    stages: Vec<ScaleStage>,
}

impl ScaleChain {
    /// An empty chain (overall factor 1.0)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage
    ///
    /// # Errors
    ///
    /// Returns an error if the factor is not a positive finite number
    pub fn push(&mut self, kind: StageKind, factor: f64) -> Result<()> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "Scale factor for {kind:?} must be positive, got {factor}"
            )));
        }
        self.stages.push(ScaleStage { kind, factor });
        Ok(())
    }

    /// A copy of this chain with one more stage
    ///
    /// # Errors
    ///
    /// Returns an error if the factor is not a positive finite number
    pub fn with_stage(&self, kind: StageKind, factor: f64) -> Result<Self> {
        let mut chain = self.clone();
        chain.push(kind, factor)?;
        Ok(chain)
    }

    /// Product of every stage factor
    #[must_use]
    pub fn overall(&self) -> f64 {
        self.stages.iter().map(|stage| stage.factor).product()
    }

    /// Stages in application order
    #[must_use]
    pub fn stages(&self) -> &[ScaleStage] {
        &self.stages
    }

    /// True if any pre-search upscale stage enlarged the source
    #[must_use]
    pub fn upscaled(&self) -> bool {
        self.stages
            .iter()
            .any(|stage| stage.kind != StageKind::Search && stage.factor > 1.0)
    }

    /// Product of the pre-search stages only
    #[must_use]
    pub fn pre_search_factor(&self) -> f64 {
        self.stages
            .iter()
            .filter(|stage| stage.kind != StageKind::Search)
            .map(|stage| stage.factor)
            .product()
    }
}

/// A remapped landmark in original-image pixel units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkRecord {
    /// Stable landmark identifier
    pub id: u32,
    /// Horizontal pixel position, 2 decimals
    pub x: f64,
    /// Vertical pixel position, 2 decimals
    pub y: f64,
    /// Relative depth, 3 decimals, if the detector reported one
    pub z: Option<f64>,
}

/// All landmarks of one retained face
#[derive(Debug, Clone, PartialEq)]
pub struct FaceRecord {
    /// Rank after filtering, 0 is the largest face
    pub face_index: usize,
    /// Source frame for video, `None` for still images
    pub frame: Option<u64>,
    /// Landmarks in detector order
    pub landmarks: Vec<LandmarkRecord>,
}

/// Pixel position of a normalized point on the raster it was detected on
#[must_use]
pub fn to_working_pixels(point: &LandmarkPoint, working_width: u32, working_height: u32) -> (f64, f64) {
    (
        point.x * f64::from(working_width),
        point.y * f64::from(working_height),
    )
}

/// Unrounded original-image position of a normalized point
#[must_use]
pub fn to_original(point: &LandmarkPoint, working_width: u32, working_height: u32, chain: &ScaleChain) -> (f64, f64) {
    let overall = chain.overall();
    let (x, y) = to_working_pixels(point, working_width, working_height);
    (x / overall, y / overall)
}

/// Round half away from zero to a number of decimal places
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Convert ranked candidates into face records in original pixel units.
///
/// `working_width` and `working_height` are the dimensions of the raster the
/// detector ran on; candidates must already be in rank order.
#[must_use]
pub fn remap_faces(
    candidates: &[FaceCandidate],
    working_width: u32,
    working_height: u32,
    chain: &ScaleChain,
    frame: Option<u64>,
) -> Vec<FaceRecord> {
    candidates
        .iter()
        .enumerate()
        .map(|(face_index, candidate)| FaceRecord {
            face_index,
            frame,
            landmarks: candidate
                .points
                .iter()
                .map(|point| {
                    let (x, y) = to_original(point, working_width, working_height, chain);
                    LandmarkRecord {
                        id: point.id,
                        x: round_to(x, XY_DECIMALS),
                        y: round_to(y, XY_DECIMALS),
                        z: point.z.map(|z| round_to(z, Z_DECIMALS)),
                    }
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_chain_is_identity() {
        let chain = ScaleChain::new();
        assert_eq!(chain.overall(), 1.0);
        assert!(!chain.upscaled());
        let point = LandmarkPoint::new(0, 0.5, 0.25);
        assert_eq!(to_original(&point, 640, 480, &chain), (320.0, 120.0));
    }

    #[test]
    fn test_chain_rejects_bad_factor() {
        let mut chain = ScaleChain::new();
        assert!(chain.push(StageKind::Search, 0.0).is_err());
        assert!(chain.push(StageKind::Search, f64::NAN).is_err());
        assert!(chain.stages().is_empty());
    }

    #[test]
    fn test_upscaled_ignores_search_stage() {
        let mut chain = ScaleChain::new();
        chain.push(StageKind::Search, 1.25).unwrap();
        assert!(!chain.upscaled());
        chain.push(StageKind::WorkingUpscale, 2.0).unwrap();
        assert!(chain.upscaled());
        assert_eq!(chain.pre_search_factor(), 2.0);
    }

    #[test]
    fn test_depth_passes_through_unscaled() {
        let mut chain = ScaleChain::new();
        chain.push(StageKind::WorkingUpscale, 2.0).unwrap();
        let candidate = FaceCandidate::new(vec![LandmarkPoint::with_depth(7, 0.5, 0.5, -0.04567)]);
        let records = remap_faces(&[candidate], 640, 480, &chain, Some(3));
        let landmark = records[0].landmarks[0];
        assert_eq!(landmark.id, 7);
        assert_eq!(landmark.x, 160.0);
        assert_eq!(landmark.y, 120.0);
        assert_eq!(landmark.z, Some(-0.046));
        assert_eq!(records[0].frame, Some(3));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(1.235_000_1, 2), 1.24);
        assert_eq!(round_to(-0.0004, 3), -0.0);
    }

    #[test]
    fn test_face_index_follows_order() {
        let a = FaceCandidate::from_normalized(&[(0.1, 0.1, None)]);
        let b = FaceCandidate::from_normalized(&[(0.9, 0.9, None)]);
        let records = remap_faces(&[a, b], 100, 100, &ScaleChain::new(), None);
        assert_eq!(records[0].face_index, 0);
        assert_eq!(records[1].face_index, 1);
        assert_eq!(records[1].landmarks[0].x, 90.0);
    }
}
