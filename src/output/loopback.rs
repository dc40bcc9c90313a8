use super::{pause_and_poll, FrameSink, KeyWatcher, View, ViewImage};
use anyhow::{Context, Result};
use image::RgbImage;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

/// Shows one diagnostic view on a v4l2loopback device as a virtual camera.
pub struct V4L2Output {
    file: File,
    width: u32,
    height: u32,
    view: View,
    watcher: Option<KeyWatcher>,
}

impl V4L2Output {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32, view: View) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{}, view {})",
            path.display(),
            width,
            height,
            view.label()
        );

        let device = Device::with_path(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;
        let requested = Format::new(width, height, FourCC::new(b"YUYV"));
        let actual = Output::set_format(&device, &requested)
            .context("Failed to set v4l2loopback output format")?;
        tracing::debug!(
            "Loopback format: {}x{} {}",
            actual.width,
            actual.height,
            actual.fourcc
        );

        // v4l2loopback accepts raw frame data written to the device file
        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        Ok(Self {
            file,
            width,
            height,
            view,
            watcher: None,
        })
    }

    pub fn with_key_watcher(mut self, watcher: KeyWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }
}

/// Pack RGB rows into YUYV 4:2:2 with studio-range BT.601 coefficients.
///
/// Each horizontal pixel pair shares the average of its chroma. An odd last
/// column is paired with itself.
fn pack_yuyv(frame: &RgbImage) -> Vec<u8> {
    let row_len = frame.width() as usize * 3;
    if row_len == 0 {
        return Vec::new();
    }

    let mut packed = Vec::with_capacity(frame.width().div_ceil(2) as usize * 4 * frame.height() as usize);
    for row in frame.as_raw().chunks_exact(row_len) {
        for pair in row.chunks(6) {
            let left = [pair[0], pair[1], pair[2]];
            let right = match pair {
                [_, _, _, r, g, b] => [*r, *g, *b],
                _ => left,
            };
            let (u, v) = pair_chroma(left, right);
            packed.extend_from_slice(&[luma(left), u, luma(right), v]);
        }
    }
    packed
}

fn luma([r, g, b]: [u8; 3]) -> u8 {
    let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));
    (((66 * r + 129 * g + 25 * b + 128) >> 8) + 16).clamp(0, 255) as u8
}

/// Cb and Cr of the summed pair; the extra shift halves the sum.
fn pair_chroma(left: [u8; 3], right: [u8; 3]) -> (u8, u8) {
    let r = i32::from(left[0]) + i32::from(right[0]);
    let g = i32::from(left[1]) + i32::from(right[1]);
    let b = i32::from(left[2]) + i32::from(right[2]);
    let u = ((-38 * r - 74 * g + 112 * b + 256) >> 9) + 128;
    let v = ((112 * r - 94 * g - 18 * b + 256) >> 9) + 128;
    (u.clamp(0, 255) as u8, v.clamp(0, 255) as u8)
}

impl FrameSink for V4L2Output {
    fn display(&mut self, view: View, image: ViewImage<'_>) -> Result<()> {
        if view != self.view {
            return Ok(());
        }

        let mut frame = image.to_rgb();
        if frame.dimensions() != (self.width, self.height) {
            frame = image::imageops::resize(
                &frame,
                self.width,
                self.height,
                image::imageops::FilterType::Triangle,
            );
        }

        self.file
            .write_all(&pack_yuyv(&frame))
            .context("Failed to write frame to v4l2loopback device")?;

        Ok(())
    }

    fn pause_and_check_cancel(&mut self, pause: Duration) -> Result<bool> {
        Ok(pause_and_poll(self.watcher.as_ref(), pause))
    }
}
