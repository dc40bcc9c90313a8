mod headless;
mod image_dir;
mod keyboard;
mod loopback;
mod window;

pub use headless::HeadlessOutput;
pub use image_dir::ImageDirOutput;
pub use keyboard::KeyWatcher;
pub use loopback::V4L2Output;
pub use window::WindowOutput;

use crate::detection::{Frame, Mask};
use anyhow::Result;
use image::{Rgb, RgbImage};
use std::time::Duration;

/// Diagnostic views shown for every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum View {
    /// Edge map inside the region of interest
    #[value(name = "canny")]
    Canny,
    /// Color-gated mask after smoothing
    #[value(name = "blur")]
    GaussianBlur,
    /// Input frame with detected lines drawn on it
    #[value(name = "overlay")]
    LineDetection,
}

impl View {
    pub const ALL: [View; 3] = [View::Canny, View::GaussianBlur, View::LineDetection];

    /// Window title
    pub fn label(&self) -> &'static str {
        match self {
            View::Canny => "Canny",
            View::GaussianBlur => "Gaussian Blur",
            View::LineDetection => "Line Detection",
        }
    }

    /// File-name friendly form
    pub fn slug(&self) -> &'static str {
        match self {
            View::Canny => "canny",
            View::GaussianBlur => "blur",
            View::LineDetection => "overlay",
        }
    }
}

/// Borrowed image handed to a sink
#[derive(Debug, Clone, Copy)]
pub enum ViewImage<'a> {
    Mask(&'a Mask),
    Frame(&'a Frame),
}

impl ViewImage<'_> {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ViewImage::Mask(mask) => mask.dimensions(),
            ViewImage::Frame(frame) => frame.dimensions(),
        }
    }

    /// Color copy, masks expanded to gray
    pub fn to_rgb(&self) -> RgbImage {
        match self {
            ViewImage::Mask(mask) => RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
                let v = mask.get_pixel(x, y)[0];
                Rgb([v, v, v])
            }),
            ViewImage::Frame(frame) => (*frame).clone(),
        }
    }
}

/// Trait for display destinations
pub trait FrameSink {
    /// Show one diagnostic view of the current frame
    fn display(&mut self, view: View, image: ViewImage<'_>) -> Result<()>;

    /// Let the display refresh, then report whether the user asked to stop
    fn pause_and_check_cancel(&mut self, pause: Duration) -> Result<bool>;
}

/// Sleep for the pause, then poll the watcher if there is one.
fn pause_and_poll(watcher: Option<&KeyWatcher>, pause: Duration) -> bool {
    if !pause.is_zero() {
        std::thread::sleep(pause);
    }
    watcher.is_some_and(|w| w.cancel_requested())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_view_names() {
        assert_eq!(View::Canny.label(), "Canny");
        assert_eq!(View::GaussianBlur.slug(), "blur");
        assert_eq!(View::ALL.len(), 3);
    }

    #[test]
    fn test_mask_expands_to_gray() {
        let mut mask = Mask::new(2, 1);
        mask.put_pixel(1, 0, Luma([200]));
        let rgb = ViewImage::Mask(&mask).to_rgb();
        assert_eq!(*rgb.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*rgb.get_pixel(1, 0), Rgb([200, 200, 200]));
    }

    #[test]
    fn test_pause_without_watcher_never_cancels() {
        assert!(!pause_and_poll(None, Duration::ZERO));
    }
}
