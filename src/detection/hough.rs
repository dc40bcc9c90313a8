use super::types::{LineSegment, Mask};
use ndarray::Array2;
use std::f64::consts::PI;

/// Distance resolution of the accumulator in pixels
pub const RHO: f64 = 2.0;
/// Angular resolution of the accumulator in radians
pub const THETA: f64 = PI / 180.0;
/// Votes a line needs before a segment is traced along it
pub const VOTE_THRESHOLD: i32 = 20;

const SHIFT: u32 = 16;

/// Multiply-with-carry generator that picks the next edge point to vote.
///
/// Seeded identically for every call so identical inputs give identical lines.
#[derive(Debug, Clone)]
struct Rng {
    state: u64,
}

impl Rng {
    const MULTIPLIER: u64 = 4_164_903_690;

    fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0xffff_ffff } else { seed },
        }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = (self.state & 0xffff_ffff)
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(self.state >> 32);
        self.state as u32
    }

    /// Uniform integer in `lo..hi`
    fn uniform(&mut self, lo: usize, hi: usize) -> usize {
        if lo == hi {
            lo
        } else {
            lo + (self.next_u32() as usize) % (hi - lo)
        }
    }
}

/// Round half to even, as the accumulator binning expects.
fn round(v: f32) -> i32 {
    v.round_ties_even() as i32
}

/// Progressive probabilistic Hough transform.
///
/// Edge points are sampled in pseudo-random order. Each sampled point votes
/// for every `(rho, theta)` line through it; once the best bin for that point
/// reaches [`VOTE_THRESHOLD`], the line is walked in both directions, bridging
/// gaps of at most `max_line_gap` pixels. A walk whose horizontal or vertical
/// extent reaches `min_line_length` becomes a segment, and its pixels stop
/// voting.
pub fn extract_lines(edges: &Mask, min_line_length: f64, max_line_gap: f64) -> Vec<LineSegment> {
    let _span = tracing::debug_span!("hough").entered();

    let (width, height) = (edges.width() as i32, edges.height() as i32);
    if width == 0 || height == 0 {
        return Vec::new();
    }

    // Extents are integral, so a fractional minimum rounds up
    let line_length = min_line_length.ceil() as i32;
    let line_gap = max_line_gap.round() as i32;

    let num_angle = (PI / THETA).round() as usize;
    let num_rho = ((f64::from(width + height) * 2.0 + 1.0) / RHO).round() as usize;
    let irho = 1.0 / RHO;

    let trig: Vec<(f32, f32)> = (0..num_angle)
        .map(|n| {
            let angle = n as f64 * THETA;
            ((angle.cos() * irho) as f32, (angle.sin() * irho) as f32)
        })
        .collect();
    let offset = (num_rho as i32 - 1) / 2;
    let bin = |n: usize, x: i32, y: i32| -> usize {
        let (c, s) = trig[n];
        (round(x as f32 * c + y as f32 * s) + offset) as usize
    };

    let mut accum = Array2::<i32>::zeros((num_angle, num_rho));
    let w = width as usize;
    let mut remaining: Vec<u8> = edges.as_raw().iter().map(|&v| u8::from(v != 0)).collect();
    let mut points: Vec<(i32, i32)> = edges
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] != 0)
        .map(|(x, y, _)| (x as i32, y as i32))
        .collect();

    tracing::debug!("Hough over {} edge points", points.len());

    let mut rng = Rng::new(u64::MAX);
    let mut lines = Vec::new();

    for count in (1..=points.len()).rev() {
        let idx = rng.uniform(0, count);
        let (px, py) = points[idx];
        points[idx] = points[count - 1];

        // Already consumed by an earlier segment
        if remaining[py as usize * w + px as usize] == 0 {
            continue;
        }

        let mut max_val = VOTE_THRESHOLD - 1;
        let mut max_n = 0;
        for n in 0..num_angle {
            let r = bin(n, px, py);
            accum[[n, r]] += 1;
            let val = accum[[n, r]];
            if max_val < val {
                max_val = val;
                max_n = n;
            }
        }

        if max_val < VOTE_THRESHOLD {
            continue;
        }

        // Step one pixel along the major axis, fixed point along the minor one
        let a = -trig[max_n].1;
        let b = trig[max_n].0;
        let (mut x0, mut y0) = (px, py);
        let xflag = a.abs() > b.abs();
        let (dx0, dy0) = if xflag {
            y0 = (y0 << SHIFT) + (1 << (SHIFT - 1));
            (if a > 0.0 { 1 } else { -1 }, round(b * (1 << SHIFT) as f32 / a.abs()))
        } else {
            x0 = (x0 << SHIFT) + (1 << (SHIFT - 1));
            (round(a * (1 << SHIFT) as f32 / b.abs()), if b > 0.0 { 1 } else { -1 })
        };
        let to_pixel = |x: i32, y: i32| -> (i32, i32) {
            if xflag {
                (x, y >> SHIFT)
            } else {
                (x >> SHIFT, y)
            }
        };

        let mut line_end = [(px, py); 2];
        for (k, end) in line_end.iter_mut().enumerate() {
            let (dx, dy) = if k == 0 { (dx0, dy0) } else { (-dx0, -dy0) };
            let (mut x, mut y) = (x0, y0);
            let mut gap = 0;
            loop {
                let (j1, i1) = to_pixel(x, y);
                if j1 < 0 || j1 >= width || i1 < 0 || i1 >= height {
                    break;
                }
                if remaining[i1 as usize * w + j1 as usize] != 0 {
                    gap = 0;
                    *end = (j1, i1);
                } else {
                    gap += 1;
                    if gap > line_gap {
                        break;
                    }
                }
                x += dx;
                y += dy;
            }
        }

        let good_line = (line_end[1].0 - line_end[0].0).abs() >= line_length
            || (line_end[1].1 - line_end[0].1).abs() >= line_length;

        // Consume the walked pixels; withdraw their votes if the segment is kept
        for (k, end) in line_end.iter().enumerate() {
            let (dx, dy) = if k == 0 { (dx0, dy0) } else { (-dx0, -dy0) };
            let (mut x, mut y) = (x0, y0);
            loop {
                let (j1, i1) = to_pixel(x, y);
                if j1 < 0 || j1 >= width || i1 < 0 || i1 >= height {
                    break;
                }
                let cell = &mut remaining[i1 as usize * w + j1 as usize];
                if *cell != 0 {
                    if good_line {
                        for n in 0..num_angle {
                            accum[[n, bin(n, j1, i1)]] -= 1;
                        }
                    }
                    *cell = 0;
                }
                if (j1, i1) == *end {
                    break;
                }
                x += dx;
                y += dy;
            }
        }

        if good_line {
            lines.push(LineSegment::new(
                line_end[0].0,
                line_end[0].1,
                line_end[1].0,
                line_end[1].1,
            ));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn draw_column(mask: &mut Mask, x: u32, ys: std::ops::Range<u32>) {
        for y in ys {
            mask.put_pixel(x, y, Luma([255]));
        }
    }

    #[test]
    fn test_rng_is_deterministic() {
        let mut a = Rng::new(u64::MAX);
        let mut b = Rng::new(u64::MAX);
        let xs: Vec<u32> = (0..8).map(|_| a.next_u32()).collect();
        let ys: Vec<u32> = (0..8).map(|_| b.next_u32()).collect();
        assert_eq!(xs, ys);
        assert!(xs.windows(2).any(|w| w[0] != w[1]));
        assert_eq!(a.uniform(3, 3), 3);
        assert!((0..100).all(|_| a.uniform(0, 7) < 7));
    }

    #[test]
    fn test_empty_map_has_no_lines() {
        assert!(extract_lines(&Mask::new(64, 48), 10.0, 5.0).is_empty());
        assert!(extract_lines(&Mask::new(0, 0), 10.0, 5.0).is_empty());
    }

    #[test]
    fn test_vertical_line_is_found() {
        let mut edges = Mask::new(200, 200);
        draw_column(&mut edges, 80, 20..180);
        let lines = extract_lines(&edges, 100.0, 200.0);

        assert!(!lines.is_empty());
        let seg = lines[0];
        assert!((seg.x1 - 80).abs() <= 1 && (seg.x2 - 80).abs() <= 1, "{seg:?}");
        assert!((seg.y1 - seg.y2).abs() >= 150, "{seg:?}");
    }

    #[test]
    fn test_diagonal_line_is_found() {
        let mut edges = Mask::new(200, 200);
        for i in 10..190 {
            edges.put_pixel(i, i, Luma([255]));
        }
        let lines = extract_lines(&edges, 100.0, 10.0);
        assert!(lines
            .iter()
            .any(|l| (l.x1 - l.x2).abs() >= 100 && (l.y1 - l.y2).abs() >= 100));
    }

    #[test]
    fn test_short_lines_are_rejected() {
        let mut edges = Mask::new(200, 200);
        draw_column(&mut edges, 50, 10..60);
        assert!(extract_lines(&edges, 100.0, 200.0).is_empty());
    }

    #[test]
    fn test_segments_meet_minimum_length() {
        let mut edges = Mask::new(300, 300);
        draw_column(&mut edges, 40, 0..300);
        draw_column(&mut edges, 200, 100..230);
        for i in 0..250 {
            edges.put_pixel(i + 20, 280 - i, Luma([255]));
        }
        for seg in extract_lines(&edges, 100.0, 20.0) {
            assert!(seg.length() >= 100.0, "{seg:?}");
        }
    }

    #[test]
    fn test_fractional_minimum_rounds_up() {
        let mut edges = Mask::new(60, 160);
        draw_column(&mut edges, 20, 0..101);

        let exact = extract_lines(&edges, 100.0, 5.0);
        assert!(exact.iter().any(|l| (l.y1 - l.y2).abs() == 100), "{exact:?}");

        let lines = extract_lines(&edges, 100.4, 5.0);
        assert!(lines.iter().all(|l| l.length() >= 100.4), "{lines:?}");
        assert!(lines.is_empty());
    }

    #[test]
    fn test_gap_limit_splits_line() {
        let mut edges = Mask::new(100, 400);
        draw_column(&mut edges, 50, 0..150);
        draw_column(&mut edges, 50, 250..400);

        let bridged = extract_lines(&edges, 100.0, 200.0);
        assert!(bridged.iter().any(|l| (l.y1 - l.y2).abs() >= 390));

        let split = extract_lines(&edges, 100.0, 20.0);
        assert!(!split.is_empty());
        assert!(split.iter().all(|l| (l.y1 - l.y2).abs() < 160));
    }

    #[test]
    fn test_repeatable() {
        let mut edges = Mask::new(160, 160);
        draw_column(&mut edges, 30, 0..160);
        for i in 0..150 {
            edges.put_pixel(i + 5, i, Luma([255]));
        }
        assert_eq!(extract_lines(&edges, 50.0, 10.0), extract_lines(&edges, 50.0, 10.0));
    }
}
