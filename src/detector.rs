//! Detector adapter around the opaque landmark-detection capability.
//!
//! Any model that can turn an RGB raster into zero or more sets of normalized
//! landmark positions plugs in through [`LandmarkDetector`]. The rest of the
//! pipeline only sees [`DetectorAdapter`], which fixes the channel order on
//! the way in and rejects malformed output on the way out.

use crate::raster::Raster;
use crate::{Error, Result};
use image::RgbImage;
use std::fmt;
use std::sync::Arc;

/// One landmark as reported by the detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkPoint {
    /// Stable identifier: the same id always denotes the same anatomical point
    pub id: u32,
    /// Horizontal position relative to the detector input, normally in [0, 1]
    pub x: f64,
    /// Vertical position relative to the detector input, normally in [0, 1]
    pub y: f64,
    /// Relative depth, dimensionless
    pub z: Option<f64>,
}

impl LandmarkPoint {
    /// Create a point without depth
    #[must_use]
    pub fn new(id: u32, x: f64, y: f64) -> Self {
        Self { id, x, y, z: None }
    }

    /// Create a point with relative depth
    #[must_use]
    pub fn with_depth(id: u32, x: f64, y: f64, z: f64) -> Self {
        Self { id, x, y, z: Some(z) }
    }
}

/// Which hand a non-facial landmark set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

/// Optional per-candidate metadata some detectors provide
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateMetadata {
    /// Presence score of the whole set
    pub score: Option<f32>,
    /// Handedness for hand landmark sets
    pub handedness: Option<Handedness>,
    /// Per-point confidence, same order as the points
    pub point_confidence: Option<Vec<f32>>,
}

/// An ordered set of landmarks for one detected face
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceCandidate {
    /// Points in detector order; exports preserve this order
    pub points: Vec<LandmarkPoint>,
    /// Optional metadata
    pub metadata: CandidateMetadata,
}

impl FaceCandidate {
    /// Build a candidate from points
    #[must_use]
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self {
            points,
            metadata: CandidateMetadata::default(),
        }
    }

    /// Build a candidate from `(x, y, z)` triples, numbering points `0..n`
    #[must_use]
    pub fn from_normalized(coords: &[(f64, f64, Option<f64>)]) -> Self {
        let points = coords
            .iter()
            .zip(0u32..)
            .map(|(&(x, y, z), id)| LandmarkPoint { id, x, y, z })
            .collect();
        Self::new(points)
    }

    /// Attach metadata
    #[must_use]
    pub fn with_metadata(mut self, metadata: CandidateMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Number of landmarks
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the candidate carries no landmarks
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// The opaque landmark-detection capability.
///
/// Implementations receive an RGB raster and return zero or more candidates
/// whose coordinates are normalized to that raster. They may be called from
/// several worker threads at once.
pub trait LandmarkDetector: Send + Sync {
    /// Detect landmark sets in an RGB image
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails
    fn detect(&self, image: &RgbImage) -> Result<Vec<FaceCandidate>>;

    /// Detector name for logs
    fn name(&self) -> &str {
        "landmark_detector"
    }
}

/// Shared handle to a detector with input normalisation and output checks
#[derive(Clone)]
pub struct DetectorAdapter {
    detector: Arc<dyn LandmarkDetector>,
}

impl fmt::Debug for DetectorAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorAdapter")
            .field("detector", &self.detector.name())
            .finish()
    }
}

impl DetectorAdapter {
    /// Wrap a detector
    pub fn new<D: LandmarkDetector + 'static>(detector: D) -> Self {
        Self {
            detector: Arc::new(detector),
        }
    }

    /// Wrap an already shared detector
    #[must_use]
    pub fn from_shared(detector: Arc<dyn LandmarkDetector>) -> Self {
        Self { detector }
    }

    /// Name of the wrapped detector
    #[must_use]
    pub fn name(&self) -> &str {
        self.detector.name()
    }

    /// Detect on a raster of either channel order
    ///
    /// # Errors
    ///
    /// Returns an error if the raster is empty, the detector fails, or its
    /// output is malformed
    pub fn detect(&self, raster: &Raster) -> Result<Vec<FaceCandidate>> {
        if raster.is_empty() {
            return Err(Error::InvalidInput("Cannot detect on an empty raster".to_string()));
        }
        self.detect_rgb(&raster.to_rgb())
    }

    /// Detect on pixels that are already in RGB order
    ///
    /// # Errors
    ///
    /// Returns an error if the detector fails or its output is malformed
    pub fn detect_rgb(&self, image: &RgbImage) -> Result<Vec<FaceCandidate>> {
        let candidates = self.detector.detect(image)?;
        let mut accepted = Vec::with_capacity(candidates.len());
        for (index, candidate) in candidates.into_iter().enumerate() {
            validate_candidate(index, &candidate)?;
            if candidate.is_empty() {
                log::debug!("{}: dropping empty candidate {index}", self.name());
                continue;
            }
            accepted.push(candidate);
        }
        log::debug!(
            "{} found {} candidate(s) on {}x{}",
            self.name(),
            accepted.len(),
            image.width(),
            image.height()
        );
        Ok(accepted)
    }
}

/// Reject non-finite coordinates, ids that are not `0..n` in order, and
/// mismatched per-point metadata
fn validate_candidate(index: usize, candidate: &FaceCandidate) -> Result<()> {
    for (expected, point) in (0u32..).zip(&candidate.points) {
        if point.id != expected {
            return Err(Error::Detection(format!(
                "Candidate {index} has landmark id {} at position {expected}",
                point.id
            )));
        }
        let depth_ok = point.z.map_or(true, f64::is_finite);
        if !point.x.is_finite() || !point.y.is_finite() || !depth_ok {
            return Err(Error::Detection(format!(
                "Candidate {index} has a non-finite coordinate at landmark {}",
                point.id
            )));
        }
    }
    if let Some(confidence) = &candidate.metadata.point_confidence {
        if confidence.len() != candidate.points.len() {
            return Err(Error::Detection(format!(
                "Candidate {index} has {} confidences for {} landmarks",
                confidence.len(),
                candidate.points.len()
            )));
        }
    }
    Ok(())
}
