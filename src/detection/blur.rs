use super::types::Mask;
use image::Luma;

/// Seven-tap Gaussian used when sigma is derived from the kernel size, in 1/64ths.
const GAUSSIAN_7: [u32; 7] = [2, 7, 14, 18, 14, 7, 2];
const TAP_SHIFT: u32 = 6;
const RADIUS: i64 = 3;

/// Mirror an out-of-range index back into `0..len` without repeating the edge sample.
pub(crate) fn reflect_101(index: i64, len: i64) -> usize {
    if len <= 1 {
        return 0;
    }
    let mut i = index;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= len {
            i = 2 * (len - 1) - i;
        } else {
            return i as usize;
        }
    }
}

/// Smooth the gated lane mask with a 7x7 Gaussian.
///
/// The horizontal pass keeps full precision so the two passes round once.
pub fn suppress_noise(mask: &Mask) -> Mask {
    let _span = tracing::debug_span!("gaussian_blur").entered();

    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return Mask::new(width, height);
    }
    let (w, h) = (i64::from(width), i64::from(height));
    let src = mask.as_raw();

    // Horizontal pass, scaled by 64
    let mut rows = vec![0u32; src.len()];
    for y in 0..height as usize {
        let line = &src[y * width as usize..(y + 1) * width as usize];
        for x in 0..w {
            rows[y * width as usize + x as usize] = GAUSSIAN_7
                .iter()
                .enumerate()
                .map(|(k, &tap)| tap * u32::from(line[reflect_101(x + k as i64 - RADIUS, w)]))
                .sum();
        }
    }

    // Vertical pass, scaled by 64 * 64
    let round = 1u32 << (2 * TAP_SHIFT - 1);
    Mask::from_fn(width, height, |x, y| {
        let acc: u32 = GAUSSIAN_7
            .iter()
            .enumerate()
            .map(|(k, &tap)| {
                let row = reflect_101(i64::from(y) + k as i64 - RADIUS, h);
                tap * rows[row * width as usize + x as usize]
            })
            .sum();
        Luma([((acc + round) >> (2 * TAP_SHIFT)).min(255) as u8])
    })
}
