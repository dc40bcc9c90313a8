use anyhow::{Context, Result};
use clap::Parser;
use lanefollow::capture::{FrameSource, VideoFileSource, WebcamCapture};
use lanefollow::output::{
    FrameSink, HeadlessOutput, ImageDirOutput, KeyWatcher, V4L2Output, View, WindowOutput,
};
use lanefollow::PipelineConfig;
use std::path::PathBuf;

const USAGE: &str = "Please specify path to video (i.e. ./lane-follow <path>).";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input video
    video: Option<PathBuf>,

    /// Capture from this camera index instead of a file
    #[arg(long)]
    camera: Option<u32>,

    /// Show a view on this v4l2loopback device
    #[arg(long)]
    loopback: Option<PathBuf>,

    /// View sent to the loopback device
    #[arg(long, value_enum, default_value_t = View::LineDetection)]
    view: View,

    /// Write every view as PNG files into this directory
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Run without windows or any other display
    #[arg(long)]
    headless: bool,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Minimum channel intensity for white, as a fraction of 255
    #[arg(long, default_value_t = 0.9)]
    white_thres: f64,

    /// Sobel aperture for edge detection
    #[arg(long, default_value_t = 3)]
    kernel_size: u32,

    /// Upper Canny threshold as a multiple of the lower one
    #[arg(long, default_value_t = 3.0)]
    canny_ratio: f64,

    /// Lower Canny threshold
    #[arg(long, default_value_t = 50.0)]
    low_canny: f64,

    /// Horizontal inset of the region of interest
    #[arg(long, default_value_t = 0.20)]
    w_perc: f64,

    /// Top of the region of interest as a fraction of the height
    #[arg(long, default_value_t = 0.6)]
    h_perc: f64,

    /// Minimum line segment length in pixels
    #[arg(long, default_value_t = 100.0)]
    min_line_dist: f64,

    /// Maximum gap in pixels joined within one line
    #[arg(long, default_value_t = 200.0)]
    max_line_dist: f64,

    /// Pause after each frame in milliseconds
    #[arg(long, default_value_t = 1)]
    pause_ms: u64,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

enum Input {
    Camera(u32),
    File(PathBuf),
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            white_thres: self.white_thres,
            kernel_size: self.kernel_size,
            canny_ratio: self.canny_ratio,
            low_canny: self.low_canny,
            w_perc: self.w_perc,
            h_perc: self.h_perc,
            min_line_dist: self.min_line_dist,
            max_line_dist: self.max_line_dist,
            pause_ms: self.pause_ms,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let input = match (args.camera, args.video.clone()) {
        (Some(index), _) => Input::Camera(index),
        (None, Some(path)) => Input::File(path),
        (None, None) => {
            println!("{USAGE}");
            return Ok(());
        }
    };

    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = args.pipeline_config();
    config.validate().context("Invalid pipeline configuration")?;
    tracing::info!(
        "Thresholds: white={:.2}, canny={}..{}, roi=({:.2}, {:.2}), lines>={} gap<={}",
        config.white_thres,
        config.low_canny,
        config.high_canny(),
        config.w_perc,
        config.h_perc,
        config.min_line_dist,
        config.max_line_dist
    );

    let mut source: Box<dyn FrameSource> = match input {
        Input::Camera(index) => Box::new(
            WebcamCapture::new(index).context("Failed to initialize webcam capture")?,
        ),
        Input::File(path) => Box::new(VideoFileSource::open(path)),
    };

    let (width, height) = source.resolution();
    let mut sink = open_sink(&args, width, height)?;

    let summary = lanefollow::run(source.as_mut(), sink.as_mut(), &config, args.max_frames)?;
    if summary.cancelled {
        tracing::info!("Stopped by user");
    }

    Ok(())
}

fn open_sink(args: &Args, width: u32, height: u32) -> Result<Box<dyn FrameSink>> {
    let interactive = args.loopback.is_some() || args.dump_dir.is_some();
    let watcher = interactive.then(KeyWatcher::spawn);
    if interactive {
        tracing::info!("Type a space or q then Enter to stop");
    }

    if let Some(device) = &args.loopback {
        if width == 0 || height == 0 {
            tracing::warn!("Source resolution unknown, not opening {}", device.display());
            return Ok(Box::new(HeadlessOutput::new()));
        }
        let mut output = V4L2Output::new(device, width, height, args.view)
            .context("Failed to initialize v4l2loopback output")?;
        if let Some(watcher) = watcher {
            output = output.with_key_watcher(watcher);
        }
        return Ok(Box::new(output));
    }

    if let Some(dir) = &args.dump_dir {
        let mut output = ImageDirOutput::new(dir, &View::ALL)?;
        if let Some(watcher) = watcher {
            output = output.with_key_watcher(watcher);
        }
        return Ok(Box::new(output));
    }

    if args.headless {
        return Ok(Box::new(HeadlessOutput::new()));
    }

    match WindowOutput::new() {
        Ok(output) => Ok(Box::new(output)),
        Err(err) => {
            tracing::warn!("No display available, running headless: {:#}", err);
            Ok(Box::new(HeadlessOutput::new()))
        }
    }
}
