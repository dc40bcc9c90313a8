use super::{CaptureError, FrameSource};
use crate::cv;
use crate::detection::Frame;
use anyhow::Result;
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture, VideoCaptureTraitConst};
use std::path::Path;

/// Video metadata reported when the file is opened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoProperties {
    /// Width of decoded frames in pixels
    pub width: u32,

    /// Height of decoded frames in pixels
    pub height: u32,

    /// Nominal frame rate, 0 when unknown
    pub fps: f64,
}

/// Frames decoded from a video file through OpenCV's `videoio`.
///
/// A file that cannot be opened or decoded yields no frames.
pub struct VideoFileSource {
    properties: VideoProperties,
    capture: Option<VideoCapture>,
    pending: Option<Frame>,
}

impl VideoFileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        tracing::info!("Opening video {}", path.display());

        match Self::try_open(path) {
            Ok(source) => source,
            Err(err) => {
                tracing::warn!("Cannot read {}: {:#}", path.display(), err);
                Self {
                    properties: VideoProperties::default(),
                    capture: None,
                    pending: None,
                }
            }
        }
    }

    fn try_open(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        let name = path.to_str().ok_or_else(|| CaptureError::InvalidPath(display.clone()))?;

        let capture = VideoCapture::from_file(name, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(CaptureError::Open(display).into());
        }

        let fps = VideoCaptureTraitConst::get(&capture, videoio::CAP_PROP_FPS)?;
        let width = VideoCaptureTraitConst::get(&capture, videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = VideoCaptureTraitConst::get(&capture, videoio::CAP_PROP_FRAME_HEIGHT)? as u32;

        let mut source = Self {
            properties: VideoProperties { width, height, fps },
            capture: Some(capture),
            pending: None,
        };

        // Rotation metadata can make decoded frames differ from the container size
        source.pending = source.decode()?;
        if let Some(frame) = &source.pending {
            let (w, h) = frame.dimensions();
            if (w, h) != (width, height) {
                tracing::debug!("Container reports {}x{}, decoder yields {}x{}", width, height, w, h);
            }
            source.properties.width = w;
            source.properties.height = h;
        }

        tracing::info!(
            "Video properties: {}x{} @ {:.1} FPS",
            source.properties.width,
            source.properties.height,
            source.properties.fps
        );

        Ok(source)
    }

    pub fn properties(&self) -> &VideoProperties {
        &self.properties
    }

    fn decode(&mut self) -> Result<Option<Frame>> {
        let Some(capture) = self.capture.as_mut() else {
            return Ok(None);
        };

        let mut mat = Mat::default();
        if !capture.read(&mut mat)? || mat.empty() {
            tracing::debug!("Decoder reached end of stream");
            self.capture = None;
            return Ok(None);
        }

        cv::frame_from_bgr(&mat).map(Some)
    }
}

impl FrameSource for VideoFileSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match self.pending.take() {
            Some(frame) => Ok(Some(frame)),
            None => self.decode(),
        }
    }

    fn resolution(&self) -> (u32, u32) {
        (self.properties.width, self.properties.height)
    }
}
