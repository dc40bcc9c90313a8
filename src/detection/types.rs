use image::{GrayImage, RgbImage};

/// A video frame. Color rules address channels by name (blue, green, red),
/// the in-memory order is the `image` crate's RGB.
pub type Frame = RgbImage;

/// Single-channel map: grayscale, gated lane mask, blurred mask, edge map or ROI mask.
pub type Mask = GrayImage;

/// A detected line segment in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl LineSegment {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn start(&self) -> (i32, i32) {
        (self.x1, self.y1)
    }

    pub fn end(&self) -> (i32, i32) {
        (self.x2, self.y2)
    }

    /// Euclidean length in pixels
    pub fn length(&self) -> f64 {
        let dx = f64::from(self.x2 - self.x1);
        let dy = f64::from(self.y2 - self.y1);
        dx.hypot(dy)
    }
}

/// Intermediate and final products of one pipeline run.
#[derive(Debug, Clone)]
pub struct LaneDetection {
    /// Color-gated grayscale after the 7x7 blur
    pub blurred: Mask,
    /// Edge map restricted to the region of interest
    pub edges: Mask,
    pub lines: Vec<LineSegment>,
}
