//! Road lane marking detection for video streams.
//!
//! Each frame is processed independently: lane-colored pixels are isolated,
//! smoothed, edge-detected, restricted to the road ahead and fed to a
//! probabilistic Hough transform. Detected segments are drawn back onto the
//! frame.

pub mod capture;
pub mod config;
mod cv;
pub mod detection;
pub mod output;
pub mod pipeline;

pub use config::{ConfigError, PipelineConfig};
pub use detection::{detect_lanes, Frame, LaneDetection, LineSegment, Mask};
pub use pipeline::{run, Pipeline, ProcessedFrame, RunSummary};
