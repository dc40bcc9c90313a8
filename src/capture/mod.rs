mod v4l_capture;
mod video_file;

pub use v4l_capture::WebcamCapture;
pub use video_file::{VideoFileSource, VideoProperties};

use crate::detection::Frame;
use anyhow::Result;
use thiserror::Error;

/// Errors raised while opening a frame source
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("video path is not valid UTF-8: {0}")]
    InvalidPath(String),

    #[error("no decoder could open {0}")]
    Open(String),
}

/// Trait for frame sources
pub trait FrameSource {
    /// Next frame in source order, `None` once the stream has ended
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Get the resolution of produced frames
    fn resolution(&self) -> (u32, u32);
}

/// Frames held in memory, yielded in order.
#[derive(Debug, Default)]
pub struct FrameQueue {
    frames: std::collections::VecDeque<Frame>,
}

impl FrameQueue {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for FrameQueue {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front())
    }

    fn resolution(&self) -> (u32, u32) {
        self.frames.front().map_or((0, 0), |f| f.dimensions())
    }
}
