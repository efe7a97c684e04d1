//! Semi-transparent landmark overlay.

use crate::config::OverlayConfig;
use crate::coordinate_mapping::to_working_pixels;
use crate::detector::FaceCandidate;
use crate::mesh_connections::contour_edges;
use crate::utils::image_conversion::{blend_weighted, resize_area};
use crate::utils::safe_cast::{f32_to_i32_clamp, u32_to_i32_saturating};
use crate::Result;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use std::collections::HashMap;

/// Draws landmark markers and contour edges, then blends them over the frame
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    style: OverlayConfig,
}

impl OverlayRenderer {
    /// Create a renderer with the given style
    #[must_use]
    pub fn new(style: OverlayConfig) -> Self {
        Self { style }
    }

    /// Render candidates onto a copy of `frame`.
    ///
    /// Candidate coordinates are normalized to `frame` itself, i.e. the
    /// raster the detector ran on. The input is never modified.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured blend factor is invalid
    pub fn render(&self, frame: &RgbImage, candidates: &[FaceCandidate]) -> Result<RgbImage> {
        if candidates.is_empty() {
            return Ok(frame.clone());
        }

        let mut marked = frame.clone();
        for candidate in candidates {
            self.draw_candidate(&mut marked, candidate);
        }
        blend_weighted(&marked, frame, self.style.alpha)
    }

    /// Render, then resize the result to `original_width` x `original_height`
    ///
    /// # Errors
    ///
    /// Returns an error if blending or resizing fails
    pub fn render_restored(
        &self,
        working: &RgbImage,
        candidates: &[FaceCandidate],
        original_width: u32,
        original_height: u32,
    ) -> Result<RgbImage> {
        let rendered = self.render(working, candidates)?;
        if rendered.dimensions() == (original_width, original_height) {
            return Ok(rendered);
        }
        resize_area(&rendered, original_width, original_height)
    }

    fn draw_candidate(&self, canvas: &mut RgbImage, candidate: &FaceCandidate) {
        let (width, height) = canvas.dimensions();
        let max_x = u32_to_i32_saturating(width.saturating_sub(1));
        let max_y = u32_to_i32_saturating(height.saturating_sub(1));

        #[allow(clippy::cast_possible_truncation)] // pixel coordinates fit in f32
        let positions: HashMap<u32, (f32, f32)> = candidate
            .points
            .iter()
            .map(|p| {
                let (x, y) = to_working_pixels(p, width, height);
                (p.id, (x as f32, y as f32))
            })
            .collect();

        if self.style.draw_connections {
            let edge_color = Rgb(self.style.edge_color);
            for (a, b) in contour_edges() {
                if let (Some(&start), Some(&end)) = (positions.get(&a), positions.get(&b)) {
                    draw_line_segment_mut(canvas, start, end, edge_color);
                }
            }
        }

        let point_color = Rgb(self.style.point_color);
        for point in &candidate.points {
            let Some(&(x, y)) = positions.get(&point.id) else {
                continue;
            };
            let center = (f32_to_i32_clamp(x, 0, max_x), f32_to_i32_clamp(y, 0, max_y));
            draw_filled_circle_mut(canvas, center, self.style.point_radius, point_color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::LandmarkPoint;

    fn renderer(alpha: f32) -> OverlayRenderer {
        OverlayRenderer::new(OverlayConfig {
            alpha,
            point_color: [255, 255, 255],
            edge_color: [0, 255, 0],
            point_radius: 1,
            draw_connections: true,
        })
    }

    #[test]
    fn test_no_candidates_returns_copy() {
        let frame = RgbImage::from_pixel(10, 10, Rgb([5, 6, 7]));
        let out = renderer(0.5).render(&frame, &[]).unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn test_marker_is_blended() {
        let frame = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        let candidate = FaceCandidate::new(vec![LandmarkPoint::new(0, 0.5, 0.5)]);
        let out = renderer(0.5).render(&frame, &[candidate]).unwrap();
        // Half of white over black
        assert_eq!(out.get_pixel(5, 5).0, [128, 128, 128]);
        // Untouched pixels stay as they were
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0]);
        // Input frame is not modified
        assert_eq!(frame.get_pixel(5, 5).0, [0, 0, 0]);
    }

    #[test]
    fn test_connection_drawn_between_known_ids() {
        let frame = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        // (10, 338) is the first face oval edge
        let candidate = FaceCandidate::new(vec![
            LandmarkPoint::new(10, 0.1, 0.5),
            LandmarkPoint::new(338, 0.9, 0.5),
        ]);
        let out = renderer(1.0).render(&frame, &[candidate]).unwrap();
        assert_eq!(out.get_pixel(10, 10).0, [0, 255, 0]);
    }

    #[test]
    fn test_out_of_range_points_do_not_panic() {
        let frame = RgbImage::new(8, 8);
        let candidate = FaceCandidate::new(vec![LandmarkPoint::new(0, -0.5, 1.7)]);
        assert!(renderer(0.5).render(&frame, &[candidate]).is_ok());
    }

    #[test]
    fn test_render_restored_matches_original_size() {
        let working = RgbImage::new(960, 720);
        let candidate = FaceCandidate::new(vec![LandmarkPoint::new(0, 0.5, 0.5)]);
        let out = renderer(0.5).render_restored(&working, &[candidate], 320, 240).unwrap();
        assert_eq!(out.dimensions(), (320, 240));
    }
}
