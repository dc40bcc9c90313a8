//! Frame loop: source → detection → overlay → sink, one frame at a time.

use crate::capture::FrameSource;
use crate::config::PipelineConfig;
use crate::detection::{draw_lines, Frame, LaneDetection, LaneDetector};
use crate::output::{FrameSink, View, ViewImage};
use anyhow::Result;
use std::time::{Duration, Instant};

const STATS_INTERVAL: u64 = 30;

/// Detection results for a frame plus the frame with lines drawn on it.
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    pub overlay: Frame,
    pub detection: LaneDetection,
}

/// How a run ended and what it saw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub segments_found: u64,
    pub cancelled: bool,
}

#[derive(Debug, Default)]
struct Timings {
    detect: Duration,
    overlay: Duration,
    display: Duration,
}

/// Per-video processing state: the detector and the size of the last frame seen.
pub struct Pipeline<'a> {
    detector: LaneDetector<'a>,
    frame_size: Option<(u32, u32)>,
    timings: Timings,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            detector: LaneDetector::new(config),
            frame_size: None,
            timings: Timings::default(),
        }
    }

    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.frame_size
    }

    fn accepts(&mut self, frame: &Frame) -> bool {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            tracing::warn!("Skipping empty {}x{} frame", width, height);
            return false;
        }
        match self.frame_size {
            Some(size) if size == (width, height) => {}
            Some((w, h)) => {
                tracing::info!("Frame size changed from {}x{} to {}x{}", w, h, width, height);
            }
            None => tracing::info!("Frame size {}x{}", width, height),
        }
        self.frame_size = Some((width, height));
        true
    }

    /// Detect lanes and draw them. `None` when the frame is empty and skipped.
    pub fn process(&mut self, mut frame: Frame) -> Option<ProcessedFrame> {
        if !self.accepts(&frame) {
            return None;
        }

        let start = Instant::now();
        let detection = self.detector.detect(&frame);
        self.timings.detect += start.elapsed();

        let start = Instant::now();
        draw_lines(&mut frame, &detection.lines);
        self.timings.overlay += start.elapsed();

        Some(ProcessedFrame {
            overlay: frame,
            detection,
        })
    }

    fn show<O: FrameSink + ?Sized>(&mut self, sink: &mut O, processed: &ProcessedFrame) -> Result<()> {
        let start = Instant::now();
        sink.display(View::Canny, ViewImage::Mask(&processed.detection.edges))?;
        sink.display(View::GaussianBlur, ViewImage::Mask(&processed.detection.blurred))?;
        sink.display(View::LineDetection, ViewImage::Frame(&processed.overlay))?;
        self.timings.display += start.elapsed();
        Ok(())
    }

    fn log_stats(&self, frames: u64) {
        let per_frame = |d: Duration| d.as_secs_f64() * 1000.0 / frames as f64;
        let detect_ms = per_frame(self.timings.detect);
        let overlay_ms = per_frame(self.timings.overlay);
        let display_ms = per_frame(self.timings.display);
        let total_ms = detect_ms + overlay_ms + display_ms;
        let fps = if total_ms > 0.0 { 1000.0 / total_ms } else { 0.0 };

        tracing::info!(
            "Frame {}: detect={:.1}ms, overlay={:.1}ms, display={:.1}ms, total={:.1}ms, fps={:.1}",
            frames,
            detect_ms,
            overlay_ms,
            display_ms,
            total_ms,
            fps
        );
    }
}

/// Process frames until the source ends, the sink asks to stop, or `max_frames` is reached.
pub fn run<S, O>(
    source: &mut S,
    sink: &mut O,
    config: &PipelineConfig,
    max_frames: Option<u64>,
) -> Result<RunSummary>
where
    S: FrameSource + ?Sized,
    O: FrameSink + ?Sized,
{
    let mut pipeline = Pipeline::new(config);
    let mut summary = RunSummary::default();

    tracing::info!("Starting lane detection loop");

    loop {
        if max_frames.is_some_and(|max| summary.frames_processed >= max) {
            tracing::info!("Reached frame limit");
            break;
        }

        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!("End of stream");
                break;
            }
            Err(err) => {
                tracing::warn!("Frame source failed, stopping: {:#}", err);
                break;
            }
        };

        let Some(processed) = pipeline.process(frame) else {
            summary.frames_skipped += 1;
            continue;
        };
        summary.frames_processed += 1;
        summary.segments_found += processed.detection.lines.len() as u64;
        tracing::debug!(
            "Frame {}: {} segment(s)",
            summary.frames_processed,
            processed.detection.lines.len()
        );

        pipeline.show(sink, &processed)?;

        if summary.frames_processed % STATS_INTERVAL == 0 {
            pipeline.log_stats(summary.frames_processed);
        }

        if sink.pause_and_check_cancel(config.pause())? {
            tracing::info!("Cancelled after frame {}", summary.frames_processed);
            summary.cancelled = true;
            break;
        }
    }

    tracing::info!(
        "Processed {} frame(s), skipped {}, found {} segment(s)",
        summary.frames_processed,
        summary.frames_skipped,
        summary.segments_found
    );

    Ok(summary)
}
