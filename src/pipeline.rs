//! Per-frame detection pipeline.
//!
//! Still images go through the multi-scale search; video frames get a single
//! detector pass on the frame as-is. Both paths rank and filter faces, remap
//! them to original pixels and render the overlay. Detection failures never
//! escape a frame: the caller gets the unmodified frame and no records.

use crate::config::Config;
use crate::coordinate_mapping::{remap_faces, FaceRecord, ScaleChain};
use crate::detector::{DetectorAdapter, FaceCandidate};
use crate::face_ranking::FaceRanker;
use crate::overlay::OverlayRenderer;
use crate::raster::Raster;
use crate::scale_search::MultiScaleSearch;
use crate::{Error, Result};
use image::RgbImage;

/// Displayable frame plus the landmark records found on it
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    /// Frame with the overlay applied, original dimensions, RGB order
    pub display: RgbImage,
    /// Retained faces in original pixel units, largest first
    pub records: Vec<FaceRecord>,
}

impl FrameOutput {
    /// The frame as it came in, with no landmarks
    #[must_use]
    pub fn unmodified(raster: &Raster) -> Self {
        Self {
            display: raster.to_rgb(),
            records: Vec::new(),
        }
    }

    /// Number of faces on this frame
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.records.len()
    }
}

/// Detection, ranking, remapping and rendering for one frame
#[derive(Debug, Clone)]
pub struct FramePipeline {
    detector: DetectorAdapter,
    search: MultiScaleSearch,
    ranker: FaceRanker,
    renderer: OverlayRenderer,
}

impl FramePipeline {
    /// Build the pipeline from the detector and configuration
    #[must_use]
    pub fn new(detector: DetectorAdapter, config: &Config) -> Self {
        Self {
            search: MultiScaleSearch::new(detector.clone(), config.search.clone()),
            ranker: FaceRanker::new(config.ranking.clone(), config.face_mesh.max_num_faces),
            renderer: OverlayRenderer::new(config.overlay.clone()),
            detector,
        }
    }

    /// Name of the underlying detector
    #[must_use]
    pub fn detector_name(&self) -> &str {
        self.detector.name()
    }

    /// Process a still image with the multi-scale search.
    ///
    /// # Errors
    ///
    /// Only an empty raster is an error. Detection failures degrade to the
    /// unmodified image with no records.
    pub fn process_image(&self, raster: &Raster) -> Result<FrameOutput> {
        if raster.is_empty() {
            return Err(Error::InvalidInput("Image has no pixels".to_string()));
        }
        let (width, height) = (raster.width(), raster.height());
        let source = raster.to_rgb();

        let outcome = match self.search.run(&source) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("Detection failed on image: {e}");
                return Ok(FrameOutput::unmodified(raster));
            }
        };
        if outcome.swapped_channels {
            log::info!("Faces found after swapping channel order");
        }

        let (working_width, working_height) = outcome.detected_on.dimensions();
        let ranked = self
            .ranker
            .select(outcome.candidates, working_width, working_height, outcome.chain.upscaled());
        let records = remap_faces(&ranked.faces, working_width, working_height, &outcome.chain, None);

        let display = match self
            .renderer
            .render_restored(&outcome.detected_on, &ranked.faces, width, height)
        {
            Ok(display) => display,
            Err(e) => {
                log::warn!("Overlay rendering failed: {e}");
                source
            }
        };
        log::info!("Image {}x{}: {} face(s) retained", width, height, records.len());
        Ok(FrameOutput { display, records })
    }

    /// Process one video frame with a single detector pass.
    ///
    /// Never fails: any error leaves the frame unmodified and without records.
    #[must_use]
    pub fn process_frame(&self, raster: &Raster, frame_index: u64) -> FrameOutput {
        match self.try_process_frame(raster, frame_index) {
            Ok(output) => output,
            Err(e) => {
                log::warn!("Frame {frame_index}: detection failed, passing frame through: {e}");
                FrameOutput::unmodified(raster)
            }
        }
    }

    fn try_process_frame(&self, raster: &Raster, frame_index: u64) -> Result<FrameOutput> {
        let image = raster.to_rgb();
        let candidates: Vec<FaceCandidate> = self.detector.detect_rgb(&image)?;
        let (width, height) = image.dimensions();
        let ranked = self.ranker.select(candidates, width, height, false);
        let records = remap_faces(&ranked.faces, width, height, &ScaleChain::new(), Some(frame_index));
        let display = self.renderer.render(&image, &ranked.faces)?;
        log::debug!("Frame {frame_index}: {} face(s)", records.len());
        Ok(FrameOutput { display, records })
    }
}
