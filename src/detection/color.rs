use super::types::{Frame, Mask};
use image::Luma;

// Fixed-point luma weights, 14 fractional bits
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

/// Inclusive per-channel bounds, in (blue, green, red) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl ColorRange {
    /// Every channel at or above `white_thres * 255`.
    pub fn white(white_thres: f64) -> Self {
        // Fractional bounds round up: a pixel at 229 never passes 0.9 * 255 = 229.5
        let lower = (white_thres * 255.0).ceil().clamp(0.0, 255.0) as u8;
        Self {
            lower: [lower; 3],
            upper: [255; 3],
        }
    }

    /// Bright green and red with little blue.
    pub fn yellow() -> Self {
        Self {
            lower: [0, 200, 200],
            upper: [160, 255, 255],
        }
    }

    pub fn contains(&self, bgr: [u8; 3]) -> bool {
        bgr.iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .all(|(&v, (&lo, &hi))| lo <= v && v <= hi)
    }
}

/// Luma of an RGB frame.
pub fn to_grayscale(frame: &Frame) -> Mask {
    let (width, height) = frame.dimensions();
    Mask::from_fn(width, height, |x, y| {
        let [r, g, b] = frame.get_pixel(x, y).0;
        Luma([luma(r, g, b)])
    })
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted =
        u32::from(r) * R_WEIGHT + u32::from(g) * G_WEIGHT + u32::from(b) * B_WEIGHT;
    ((weighted + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT).min(255) as u8
}

/// Isolate lane-colored pixels.
///
/// A pixel keeps its grayscale intensity when it falls in the white or the
/// yellow range, and is zero otherwise. The result is gated intensity, not a
/// strict 0/255 mask.
pub fn segment_lane_colors(frame: &Frame, white_thres: f64) -> Mask {
    let _span = tracing::debug_span!("color_segment").entered();

    let white = ColorRange::white(white_thres);
    let yellow = ColorRange::yellow();
    let (width, height) = frame.dimensions();

    Mask::from_fn(width, height, |x, y| {
        let [r, g, b] = frame.get_pixel(x, y).0;
        let bgr = [b, g, r];
        if white.contains(bgr) || yellow.contains(bgr) {
            Luma([luma(r, g, b)])
        } else {
            Luma([0])
        }
    })
}
