use super::{FrameSink, View, ViewImage};
use crate::cv;
use anyhow::{Context, Result};
use opencv::highgui;
use std::time::Duration;

/// Shows every diagnostic view in its own HighGUI window.
///
/// Space or `q` pressed in any window stops the run.
pub struct WindowOutput {
    _private: (),
}

impl WindowOutput {
    pub fn new() -> Result<Self> {
        for view in View::ALL {
            highgui::named_window(view.label(), highgui::WINDOW_AUTOSIZE)
                .with_context(|| format!("Failed to open window {:?}", view.label()))?;
        }
        tracing::info!("Press space or q in a window to stop");
        Ok(Self { _private: () })
    }
}

impl FrameSink for WindowOutput {
    fn display(&mut self, view: View, image: ViewImage<'_>) -> Result<()> {
        let mat = match image {
            ViewImage::Mask(mask) => cv::mask_to_mat(mask)?,
            ViewImage::Frame(frame) => cv::frame_to_bgr(frame)?,
        };
        highgui::imshow(view.label(), &mat)?;
        Ok(())
    }

    fn pause_and_check_cancel(&mut self, pause: Duration) -> Result<bool> {
        // A zero delay would block until a key arrives
        let delay = pause.as_millis().clamp(1, i32::MAX as u128) as i32;
        let key = highgui::wait_key(delay)?;
        Ok(is_stop_key(key))
    }
}

impl Drop for WindowOutput {
    fn drop(&mut self) {
        let _ = highgui::destroy_all_windows();
    }
}

/// `wait_key` returns -1 when nothing was pressed.
fn is_stop_key(key: i32) -> bool {
    key >= 0 && matches!((key & 0xff) as u8, b' ' | b'q' | b'Q')
}
