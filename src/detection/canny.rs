use super::types::Mask;
use image::Luma;

// tan(22.5°) in 15-bit fixed point
const CANNY_SHIFT: u32 = 15;
const TG22: i64 = 13573;

const NOT_EDGE: u8 = 1;
const MAYBE_EDGE: u8 = 0;
const EDGE: u8 = 2;

/// Horizontal and vertical Sobel responses.
struct Gradients {
    dx: Vec<i32>,
    dy: Vec<i32>,
}

/// Binomial smoothing and derivative taps for a Sobel aperture of 3, 5 or 7.
fn sobel_kernels(aperture: u32) -> (Vec<i32>, Vec<i32>) {
    let binomial = |order: usize| {
        let mut row = vec![1i32];
        for _ in 0..order {
            let mut next = vec![0i32; row.len() + 1];
            for (i, &v) in row.iter().enumerate() {
                next[i] += v;
                next[i + 1] += v;
            }
            row = next;
        }
        row
    };

    let n = aperture.max(3) as usize;
    let smooth = binomial(n - 1);
    let inner = binomial(n - 3);
    let mut deriv = vec![0i32; n];
    for (i, &v) in inner.iter().enumerate() {
        deriv[i] -= v;
        deriv[i + 2] += v;
    }
    (smooth, deriv)
}

/// Separable correlation with replicated borders.
fn correlate(src: &[i32], width: usize, height: usize, along_x: &[i32], along_y: &[i32]) -> Vec<i32> {
    let rx = (along_x.len() / 2) as i64;
    let ry = (along_y.len() / 2) as i64;
    let clamp = |v: i64, len: usize| v.clamp(0, len as i64 - 1) as usize;

    let mut tmp = vec![0i32; src.len()];
    for y in 0..height {
        for x in 0..width {
            tmp[y * width + x] = along_x
                .iter()
                .enumerate()
                .map(|(k, &tap)| tap * src[y * width + clamp(x as i64 + k as i64 - rx, width)])
                .sum();
        }
    }

    let mut out = vec![0i32; src.len()];
    for y in 0..height {
        for x in 0..width {
            out[y * width + x] = along_y
                .iter()
                .enumerate()
                .map(|(k, &tap)| tap * tmp[clamp(y as i64 + k as i64 - ry, height) * width + x])
                .sum();
        }
    }
    out
}

fn sobel(mask: &Mask, aperture: u32) -> Gradients {
    let (width, height) = (mask.width() as usize, mask.height() as usize);
    let src: Vec<i32> = mask.as_raw().iter().map(|&v| i32::from(v)).collect();
    let (smooth, deriv) = sobel_kernels(aperture);
    Gradients {
        dx: correlate(&src, width, height, &deriv, &smooth),
        dy: correlate(&src, width, height, &smooth, &deriv),
    }
}

/// Two-threshold edge detection.
///
/// Gradient magnitude is `|dx| + |dy|`. A pixel survives non-maximum
/// suppression when it is a local maximum across the quantized gradient
/// direction. Survivors above `high` are edges; survivors above `low` are
/// edges only when 8-connected to one above `high`.
pub fn detect_edges(mask: &Mask, low: f64, high: f64, aperture: u32) -> Mask {
    let _span = tracing::debug_span!("canny").entered();

    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return Mask::new(width, height);
    }
    let (w, h) = (width as usize, height as usize);

    let (low, high) = if low > high { (high, low) } else { (low, high) };
    let low = low.floor() as i64;
    let high = high.floor() as i64;

    let Gradients { dx, dy } = sobel(mask, aperture);
    let magnitude: Vec<i64> = dx
        .iter()
        .zip(dy.iter())
        .map(|(&gx, &gy)| i64::from(gx.abs()) + i64::from(gy.abs()))
        .collect();
    let mag_at = |x: i64, y: i64| -> i64 {
        if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
            0
        } else {
            magnitude[y as usize * w + x as usize]
        }
    };

    let mut map = vec![NOT_EDGE; w * h];
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let m = magnitude[idx];
            if m <= low {
                continue;
            }

            let (xs, ys) = (i64::from(dx[idx]), i64::from(dy[idx]));
            let ax = xs.abs();
            let ay = ys.abs() << CANNY_SHIFT;
            let tg22x = ax * TG22;
            let (xi, yi) = (x as i64, y as i64);

            let is_peak = if ay < tg22x {
                m > mag_at(xi - 1, yi) && m >= mag_at(xi + 1, yi)
            } else {
                let tg67x = tg22x + (ax << (CANNY_SHIFT + 1));
                if ay > tg67x {
                    m > mag_at(xi, yi - 1) && m >= mag_at(xi, yi + 1)
                } else {
                    let s = if (xs ^ ys) < 0 { -1 } else { 1 };
                    m > mag_at(xi - s, yi - 1) && m > mag_at(xi + s, yi + 1)
                }
            };

            if !is_peak {
                continue;
            }
            if m > high {
                map[idx] = EDGE;
                stack.push((x, y));
            } else {
                map[idx] = MAYBE_EDGE;
            }
        }
    }

    // Hysteresis: grow strong edges through weak neighbours
    while let Some((x, y)) = stack.pop() {
        for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                let n = ny * w + nx;
                if map[n] == MAYBE_EDGE {
                    map[n] = EDGE;
                    stack.push((nx, ny));
                }
            }
        }
    }

    Mask::from_fn(width, height, |x, y| {
        if map[y as usize * w + x as usize] == EDGE {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
