//! Multi-scale face search for still images.
//!
//! Small sources are first enlarged to a working resolution, then the
//! detector runs on several resamples of the working raster and the scale
//! with the most faces wins. Every factor lands in the outcome's
//! [`ScaleChain`] so coordinates can be mapped back exactly.

use crate::config::SearchConfig;
use crate::coordinate_mapping::{ScaleChain, StageKind};
use crate::detector::{DetectorAdapter, FaceCandidate};
use crate::utils::image_conversion::{scale_by, swap_red_blue};
use crate::Result;
use image::RgbImage;

/// A source raster enlarged to the working resolution
#[derive(Debug, Clone)]
pub struct WorkingRaster {
    /// Pixels after the pre-search upscale stages
    pub image: RgbImage,
    /// Stages applied so far (empty if the source was large enough)
    pub chain: ScaleChain,
}

/// Upscale `source` until it reaches the working resolution.
///
/// The first stage lifts sources below the minimum working resolution; the
/// second lifts anything still below the secondary resolution. The combined
/// factor never exceeds `max_upscale`, and the source is resampled once with
/// the combined factor so the two stages do not blur twice.
///
/// # Errors
///
/// Returns an error if the source is empty or a factor is invalid
pub fn prepare_working(source: &RgbImage, config: &SearchConfig) -> Result<WorkingRaster> {
    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return Err(crate::Error::InvalidInput("Cannot search an empty raster".to_string()));
    }
    let (w, h) = (f64::from(width), f64::from(height));
    let mut chain = ScaleChain::new();

    if width < config.min_working_width || height < config.min_working_height {
        let factor = (f64::from(config.min_working_width) / w)
            .max(f64::from(config.min_working_height) / h)
            .min(config.max_upscale);
        if factor > 1.0 {
            chain.push(StageKind::WorkingUpscale, factor)?;
        }
    }

    let so_far = chain.overall();
    let (cw, ch) = (w * so_far, h * so_far);
    if (cw < f64::from(config.secondary_working_width) || ch < f64::from(config.secondary_working_height))
        && so_far < config.max_upscale
    {
        let factor = (f64::from(config.secondary_working_width) / cw)
            .max(f64::from(config.secondary_working_height) / ch)
            .min(config.max_upscale / so_far);
        if factor > 1.0 {
            chain.push(StageKind::LowResolutionUpscale, factor)?;
        }
    }

    let overall = chain.overall();
    let image = if chain.stages().is_empty() {
        source.clone()
    } else {
        let image = scale_by(source, overall, true)?;
        log::info!(
            "Upscaled {}x{} source by {:.3} to {}x{} for detection",
            width,
            height,
            overall,
            image.width(),
            image.height()
        );
        image
    };
    Ok(WorkingRaster { image, chain })
}

/// Result of a multi-scale search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// The raster the winning detection ran on, in RGB order
    pub detected_on: RgbImage,
    /// Every resampling between the source and `detected_on`
    pub chain: ScaleChain,
    /// Candidates normalized to `detected_on`
    pub candidates: Vec<FaceCandidate>,
    /// Winning search scale, `None` for the unscaled fallback
    pub scale: Option<f64>,
    /// True if the faces were only found with red and blue swapped
    pub swapped_channels: bool,
}

/// Runs the detector over a list of scales and keeps the best one
#[derive(Debug, Clone)]
pub struct MultiScaleSearch {
    detector: DetectorAdapter,
    config: SearchConfig,
}

impl MultiScaleSearch {
    /// Create a search over `config.effective_scales()`
    #[must_use]
    pub fn new(detector: DetectorAdapter, config: SearchConfig) -> Self {
        Self { detector, config }
    }

    /// Search `source` for faces
    ///
    /// # Errors
    ///
    /// Returns an error if the source is empty, resampling fails, or the
    /// unscaled fallback detection fails
    pub fn run(&self, source: &RgbImage) -> Result<SearchOutcome> {
        let working = prepare_working(source, &self.config)?;
        let outcome = self.search(source, &working)?;
        if !outcome.candidates.is_empty() || !self.config.retry_swapped_channels {
            return Ok(outcome);
        }

        log::info!("No faces found, retrying with red and blue channels swapped");
        let swapped_source = swap_red_blue(source);
        let swapped_working = WorkingRaster {
            image: swap_red_blue(&working.image),
            chain: working.chain.clone(),
        };
        let retry = self.search(&swapped_source, &swapped_working)?;
        if retry.candidates.is_empty() {
            log::warn!("No faces detected in either channel order");
            return Ok(outcome);
        }
        Ok(SearchOutcome {
            detected_on: swap_red_blue(&retry.detected_on),
            swapped_channels: true,
            ..retry
        })
    }

    /// Try every scale; fall back to one unscaled pass on the source
    fn search(&self, source: &RgbImage, working: &WorkingRaster) -> Result<SearchOutcome> {
        let mut best: Option<SearchOutcome> = None;

        for scale in self.config.effective_scales() {
            let resampled = if (scale - 1.0).abs() < f64::EPSILON {
                working.image.clone()
            } else {
                scale_by(&working.image, scale, false)?
            };
            let candidates = match self.detector.detect_rgb(&resampled) {
                Ok(candidates) => candidates,
                Err(e) => {
                    log::warn!("Detection failed at scale {scale}: {e}");
                    continue;
                }
            };
            log::debug!("Scale {scale}: {} face(s)", candidates.len());

            // Strictly greater: the first scale wins ties
            let best_count = best.as_ref().map_or(0, |b| b.candidates.len());
            if candidates.len() > best_count {
                best = Some(SearchOutcome {
                    detected_on: resampled,
                    chain: working.chain.with_stage(StageKind::Search, scale)?,
                    candidates,
                    scale: Some(scale),
                    swapped_channels: false,
                });
            }
        }

        if let Some(best) = best {
            log::info!(
                "Best scale {:?} found {} face(s)",
                best.scale,
                best.candidates.len()
            );
            return Ok(best);
        }

        log::debug!("No scale produced faces, falling back to the unscaled source");
        let candidates = self.detector.detect_rgb(source)?;
        Ok(SearchOutcome {
            detected_on: source.clone(),
            chain: ScaleChain::new(),
            candidates,
            scale: None,
            swapped_channels: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_small_source_two_stages() {
        let source = RgbImage::new(320, 240);
        let working = prepare_working(&source, &SearchConfig::default()).unwrap();
        assert_eq!(working.image.dimensions(), (960, 720));
        let stages = working.chain.stages();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].kind, StageKind::WorkingUpscale);
        assert!((stages[0].factor - 2.0).abs() < 1e-12);
        assert_eq!(stages[1].kind, StageKind::LowResolutionUpscale);
        assert!((stages[1].factor - 1.5).abs() < 1e-12);
        assert!((working.chain.overall() - 3.0).abs() < 1e-12);
        assert!(working.chain.upscaled());
    }

    #[test]
    fn test_prepare_mid_source_second_stage_only() {
        let source = RgbImage::new(800, 600);
        let working = prepare_working(&source, &SearchConfig::default()).unwrap();
        assert_eq!(working.chain.stages().len(), 1);
        assert_eq!(working.chain.stages()[0].kind, StageKind::LowResolutionUpscale);
        assert_eq!(working.image.dimensions(), (1024, 768));
    }

    #[test]
    fn test_prepare_large_source_untouched() {
        let source = RgbImage::new(1280, 960);
        let working = prepare_working(&source, &SearchConfig::default()).unwrap();
        assert!(working.chain.stages().is_empty());
        assert_eq!(working.image.dimensions(), (1280, 960));
    }

    #[test]
    fn test_prepare_respects_ceiling() {
        let source = RgbImage::new(100, 100);
        let working = prepare_working(&source, &SearchConfig::default()).unwrap();
        assert!((working.chain.overall() - 3.0).abs() < 1e-12);
        assert_eq!(working.image.dimensions(), (300, 300));
    }

    #[test]
    fn test_prepare_rejects_empty() {
        assert!(prepare_working(&RgbImage::new(0, 10), &SearchConfig::default()).is_err());
    }
}
