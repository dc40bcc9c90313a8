use super::types::{Frame, LineSegment};
use image::Rgb;
use imageproc::drawing::{draw_antialiased_line_segment_mut, draw_filled_circle_mut, draw_polygon_mut};
use imageproc::pixelops::interpolate;
use imageproc::point::Point;

/// Red, in RGB storage order
pub const LINE_COLOR: Rgb<u8> = Rgb([230, 0, 0]);
pub const LINE_THICKNESS: i32 = 3;

/// Draw every segment onto the frame.
pub fn draw_lines(frame: &mut Frame, lines: &[LineSegment]) {
    let _span = tracing::debug_span!("overlay").entered();

    for line in lines {
        draw_thick_line(frame, line, LINE_COLOR, LINE_THICKNESS);
    }
}

/// Thick anti-aliased segment: filled body, smoothed long edges, round caps.
fn draw_thick_line(frame: &mut Frame, line: &LineSegment, color: Rgb<u8>, thickness: i32) {
    let radius = thickness / 2;
    let (x1, y1) = line.start();
    let (x2, y2) = line.end();

    let dx = (x2 - x1) as f32;
    let dy = (y2 - y1) as f32;
    let len = dx.hypot(dy);
    if len < 1.0 {
        draw_filled_circle_mut(frame, (x1, y1), radius, color);
        return;
    }

    let half = (thickness - 1) as f32 / 2.0;
    let (nx, ny) = (-dy / len * half, dx / len * half);
    let offset = |x: i32, y: i32, sign: f32| {
        (
            (x as f32 + sign * nx).round() as i32,
            (y as f32 + sign * ny).round() as i32,
        )
    };

    let a = offset(x1, y1, 1.0);
    let b = offset(x2, y2, 1.0);
    let c = offset(x2, y2, -1.0);
    let d = offset(x1, y1, -1.0);

    let body = [a, b, c, d].map(|(x, y)| Point::new(x, y));
    if body[0] != body[3] {
        draw_polygon_mut(frame, &body, color);
    }

    draw_antialiased_line_segment_mut(frame, a, b, color, interpolate);
    draw_antialiased_line_segment_mut(frame, d, c, color, interpolate);
    draw_filled_circle_mut(frame, (x1, y1), radius, color);
    draw_filled_circle_mut(frame, (x2, y2), radius, color);
}
