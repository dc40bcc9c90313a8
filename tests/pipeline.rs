use anyhow::Result;
use image::Rgb;
use lanefollow::capture::{FrameQueue, FrameSource};
use lanefollow::detection::{to_grayscale, RoiPolygon};
use lanefollow::output::{FrameSink, View, ViewImage};
use lanefollow::{detect_lanes, run, Frame, Pipeline, PipelineConfig};
use std::time::Duration;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

/// Records what the driver shows and cancels after a fixed number of frames.
#[derive(Default)]
struct RecordingSink {
    shown: Vec<(View, (u32, u32))>,
    overlays: Vec<Frame>,
    pauses: u32,
    cancel_after: Option<u32>,
}

impl FrameSink for RecordingSink {
    fn display(&mut self, view: View, image: ViewImage<'_>) -> Result<()> {
        self.shown.push((view, image.dimensions()));
        if let ViewImage::Frame(frame) = image {
            self.overlays.push(frame.clone());
        }
        Ok(())
    }

    fn pause_and_check_cancel(&mut self, _pause: Duration) -> Result<bool> {
        self.pauses += 1;
        Ok(self.cancel_after.is_some_and(|n| self.pauses >= n))
    }
}

/// Fails on the first read.
struct BrokenSource;

impl FrameSource for BrokenSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        anyhow::bail!("decoder crashed")
    }

    fn resolution(&self) -> (u32, u32) {
        (WIDTH, HEIGHT)
    }
}

fn black_frame() -> Frame {
    Frame::new(WIDTH, HEIGHT)
}

/// White vertical strip at x in [300, 310], y in [288, 480)
fn strip_frame() -> Frame {
    Frame::from_fn(WIDTH, HEIGHT, |x, y| {
        if (300..=310).contains(&x) && y >= 288 {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    })
}

#[test]
fn black_frame_produces_no_lines_and_unchanged_overlay() {
    let config = PipelineConfig::default();
    let mut pipeline = Pipeline::new(&config);

    let processed = pipeline.process(black_frame()).expect("frame accepted");
    assert!(processed.detection.blurred.pixels().all(|p| p[0] == 0));
    assert!(processed.detection.edges.pixels().all(|p| p[0] == 0));
    assert!(processed.detection.lines.is_empty());
    assert_eq!(processed.overlay, black_frame());
}

#[test]
fn white_strip_yields_vertical_segment() {
    let config = PipelineConfig::default();
    let detection = detect_lanes(&strip_frame(), &config);

    // Both long sides of the strip survive edge detection inside the region
    let column_hits = |x: u32| {
        (288..HEIGHT)
            .filter(|&y| detection.edges.get_pixel(x, y)[0] == 255)
            .count()
    };
    assert!((296..=303).map(column_hits).max().unwrap_or(0) > 150);
    assert!((307..=314).map(column_hits).max().unwrap_or(0) > 150);

    let near_strip = |x: i32| (297..=303).contains(&x) || (307..=313).contains(&x);
    let found = detection.lines.iter().any(|line| {
        let (top, bottom) = (line.y1.min(line.y2), line.y1.max(line.y2));
        near_strip(line.x1) && near_strip(line.x2) && top <= 300 && bottom >= 470
    });
    assert!(found, "lines: {:?}", detection.lines);

    for line in &detection.lines {
        assert!(line.length() >= config.min_line_dist, "{line:?}");
    }
}

#[test]
fn overlay_marks_detected_lane_in_red() {
    let config = PipelineConfig::default();
    let mut pipeline = Pipeline::new(&config);
    let processed = pipeline.process(strip_frame()).expect("frame accepted");

    let line = processed.detection.lines[0];
    let mid = ((line.x1 + line.x2) / 2, (line.y1 + line.y2) / 2);
    assert_eq!(
        *processed.overlay.get_pixel(mid.0 as u32, mid.1 as u32),
        Rgb([230, 0, 0])
    );
    // Far from any line the frame is untouched
    assert_eq!(*processed.overlay.get_pixel(50, 50), Rgb([0, 0, 0]));
}

#[test]
fn repeated_runs_give_identical_lines() {
    let config = PipelineConfig::default();
    let frame = strip_frame();
    let first = detect_lanes(&frame, &config);
    let second = detect_lanes(&frame, &config);
    assert_eq!(first.lines, second.lines);
    assert_eq!(first.edges, second.edges);

    // A long-lived pipeline behaves the same as a fresh one
    let mut pipeline = Pipeline::new(&config);
    let a = pipeline.process(frame.clone()).unwrap();
    let b = pipeline.process(frame).unwrap();
    assert_eq!(a.detection.lines, b.detection.lines);
    assert_eq!(a.detection.lines, first.lines);
}

#[test]
fn edges_never_escape_region_of_interest() {
    let config = PipelineConfig::default();
    let frame = Frame::from_fn(WIDTH, HEIGHT, |x, y| {
        if (x / 16 + y / 16) % 2 == 0 {
            Rgb([250, 240, 235])
        } else {
            Rgb([10, 10, 10])
        }
    });
    let detection = detect_lanes(&frame, &config);
    let region = RoiPolygon::new(WIDTH, HEIGHT, config.w_perc, config.h_perc).mask(WIDTH, HEIGHT);

    for (x, y, p) in detection.edges.enumerate_pixels() {
        if p[0] != 0 {
            assert!((128..=512).contains(&x) && y >= 288, "edge at ({x}, {y})");
            assert_eq!(region.get_pixel(x, y)[0], 255);
        }
    }
}

#[test]
fn gated_mask_requires_lane_color() {
    let config = PipelineConfig::default();
    // Bright blue passes grayscale but neither color range
    let frame = Frame::from_pixel(64, 64, Rgb([40, 60, 255]));
    assert!(to_grayscale(&frame).pixels().all(|p| p[0] > 0));
    let detection = detect_lanes(&frame, &config);
    assert!(detection.blurred.pixels().all(|p| p[0] == 0));
}

#[test]
fn degenerate_region_settings_do_not_fault() {
    let frame = strip_frame();
    for (w_perc, h_perc) in [(0.0, 0.6), (0.2, 1.0), (0.5, 0.0), (0.0, 0.0), (1.0, 1.0)] {
        let config = PipelineConfig {
            w_perc,
            h_perc,
            ..Default::default()
        };
        let detection = detect_lanes(&frame, &config);
        if h_perc >= 1.0 {
            assert!(detection.edges.pixels().all(|p| p[0] == 0));
            assert!(detection.lines.is_empty());
        }
    }
}

#[test]
fn run_shows_three_views_per_frame_in_order() {
    let config = PipelineConfig::default();
    let mut source = FrameQueue::new([black_frame(), strip_frame(), black_frame()]);
    let mut sink = RecordingSink::default();

    let summary = run(&mut source, &mut sink, &config, None).unwrap();

    assert_eq!(summary.frames_processed, 3);
    assert_eq!(summary.frames_skipped, 0);
    assert!(summary.segments_found >= 1);
    assert!(!summary.cancelled);
    assert_eq!(sink.pauses, 3);

    let views: Vec<View> = sink.shown.iter().map(|(v, _)| *v).collect();
    assert_eq!(views.len(), 9);
    for chunk in views.chunks(3) {
        assert_eq!(chunk, View::ALL);
    }
    assert!(sink.shown.iter().all(|(_, dims)| *dims == (WIDTH, HEIGHT)));

    // Frames come out in source order
    assert_eq!(sink.overlays[0], black_frame());
    assert_ne!(sink.overlays[1], strip_frame());
    assert_eq!(sink.overlays[2], black_frame());
}

#[test]
fn cancellation_stops_after_current_frame() {
    let config = PipelineConfig::default();
    let mut source = FrameQueue::new(vec![black_frame(); 5]);
    let mut sink = RecordingSink {
        cancel_after: Some(2),
        ..Default::default()
    };

    let summary = run(&mut source, &mut sink, &config, None).unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.frames_processed, 2);
    assert_eq!(sink.overlays.len(), 2);
    assert_eq!(sink.shown.len(), 6);
}

#[test]
fn empty_frames_are_skipped() {
    let config = PipelineConfig::default();
    let mut source = FrameQueue::new([
        Frame::new(0, 0),
        black_frame(),
        Frame::new(WIDTH, 0),
        black_frame(),
    ]);
    let mut sink = RecordingSink::default();

    let summary = run(&mut source, &mut sink, &config, None).unwrap();

    assert_eq!(summary.frames_processed, 2);
    assert_eq!(summary.frames_skipped, 2);
    assert_eq!(sink.pauses, 2);
}

#[test]
fn frames_of_a_new_size_are_processed() {
    let config = PipelineConfig::default();
    let small = Frame::from_fn(320, 240, |x, y| {
        if (150..=155).contains(&x) && y >= 144 {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    });
    let mut source = FrameQueue::new([strip_frame(), small, strip_frame()]);
    let mut sink = RecordingSink::default();

    let summary = run(&mut source, &mut sink, &config, None).unwrap();

    assert_eq!(summary.frames_processed, 3);
    assert_eq!(summary.frames_skipped, 0);
    let sizes: Vec<(u32, u32)> = sink.overlays.iter().map(|f| f.dimensions()).collect();
    assert_eq!(sizes, [(WIDTH, HEIGHT), (320, 240), (WIDTH, HEIGHT)]);
    assert!(sink.shown[3..6].iter().all(|(_, dims)| *dims == (320, 240)));

    // The region mask follows the frame size
    let mut pipeline = Pipeline::new(&config);
    let first = pipeline.process(strip_frame()).unwrap();
    pipeline.process(Frame::new(320, 240)).unwrap();
    assert_eq!(pipeline.frame_size(), Some((320, 240)));
    let again = pipeline.process(strip_frame()).unwrap();
    assert_eq!(first.detection.lines, again.detection.lines);
}

#[test]
fn frame_limit_and_source_failure_end_the_run() {
    let config = PipelineConfig::default();

    let mut source = FrameQueue::new(vec![black_frame(); 4]);
    let mut sink = RecordingSink::default();
    let summary = run(&mut source, &mut sink, &config, Some(1)).unwrap();
    assert_eq!(summary.frames_processed, 1);

    let mut sink = RecordingSink::default();
    let summary = run(&mut BrokenSource, &mut sink, &config, None).unwrap();
    assert_eq!(summary, Default::default());
    assert!(sink.shown.is_empty());
}

#[test]
fn empty_source_ends_immediately() {
    let config = PipelineConfig::default();
    let mut source = FrameQueue::default();
    let mut sink = RecordingSink::default();
    let summary = run(&mut source, &mut sink, &config, None).unwrap();
    assert_eq!(summary.frames_processed, 0);
    assert_eq!(sink.pauses, 0);
}
