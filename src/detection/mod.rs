//! Per-frame lane detection.
//!
//! Stages run in a fixed order, each a free function over image buffers:
//! color segmentation, 7x7 blur, Canny, region masking, probabilistic Hough,
//! and finally the overlay.

mod blur;
mod canny;
mod color;
mod hough;
mod overlay;
mod roi;
pub mod types;

pub use blur::suppress_noise;
pub use canny::detect_edges;
pub use color::{segment_lane_colors, to_grayscale, ColorRange};
pub use hough::{extract_lines, RHO, THETA, VOTE_THRESHOLD};
pub use overlay::{draw_lines, LINE_COLOR, LINE_THICKNESS};
pub use roi::{apply_region, mask_region, RoiPolygon};
pub use types::{Frame, LaneDetection, LineSegment, Mask};

use crate::config::PipelineConfig;

/// Run every detection stage on one frame.
pub fn detect_lanes(frame: &Frame, config: &PipelineConfig) -> LaneDetection {
    let mut detector = LaneDetector::new(config);
    detector.detect(frame)
}

/// Detection stages bound to one configuration.
///
/// Keeps the region mask for the last frame size seen; nothing else carries
/// over between frames.
pub struct LaneDetector<'a> {
    config: &'a PipelineConfig,
    region: Option<Mask>,
}

impl<'a> LaneDetector<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            region: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        self.config
    }

    fn region_for(&mut self, width: u32, height: u32) -> &Mask {
        let stale = self
            .region
            .as_ref()
            .map_or(true, |mask| mask.dimensions() != (width, height));
        if stale {
            tracing::debug!("Building region mask for {}x{}", width, height);
            let polygon = RoiPolygon::new(width, height, self.config.w_perc, self.config.h_perc);
            self.region = Some(polygon.mask(width, height));
        }
        self.region.get_or_insert_with(|| Mask::new(width, height))
    }

    /// Segment, blur, detect and mask edges, then extract lines.
    pub fn detect(&mut self, frame: &Frame) -> LaneDetection {
        let config = self.config;
        let (width, height) = frame.dimensions();

        let gated = segment_lane_colors(frame, config.white_thres);
        let blurred = suppress_noise(&gated);
        let edges = detect_edges(&blurred, config.low_canny, config.high_canny(), config.kernel_size);
        let edges = apply_region(&edges, self.region_for(width, height));
        let lines = extract_lines(&edges, config.min_line_dist, config.max_line_dist);

        LaneDetection {
            blurred,
            edges,
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_region_cache_follows_frame_size() {
        let config = PipelineConfig::default();
        let mut detector = LaneDetector::new(&config);

        assert_eq!(detector.region_for(100, 50).dimensions(), (100, 50));
        assert_eq!(detector.region_for(100, 50).get_pixel(50, 40)[0], 255);
        assert_eq!(detector.region_for(64, 64).dimensions(), (64, 64));
    }

    #[test]
    fn test_black_frame_yields_nothing() {
        let config = PipelineConfig::default();
        let detection = detect_lanes(&Frame::new(160, 120), &config);
        assert!(detection.blurred.pixels().all(|p| p[0] == 0));
        assert!(detection.edges.pixels().all(|p| p[0] == 0));
        assert!(detection.lines.is_empty());
    }

    #[test]
    fn test_edges_stay_inside_region() {
        let config = PipelineConfig::default();
        // White noise checkerboard across the whole frame
        let frame = Frame::from_fn(120, 100, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let detection = detect_lanes(&frame, &config);
        let region = RoiPolygon::new(120, 100, config.w_perc, config.h_perc).mask(120, 100);
        assert!(detection.edges.pixels().any(|p| p[0] != 0));
        for (x, y, p) in detection.edges.enumerate_pixels() {
            if p[0] != 0 {
                assert_eq!(region.get_pixel(x, y)[0], 255);
            }
        }
    }
}
