//! Conversions between `image` buffers and OpenCV matrices.

use crate::detection::{Frame, Mask};
use anyhow::{bail, Context, Result};
use opencv::core::{Mat, Scalar, CV_8UC1, CV_8UC3};
use opencv::imgproc;
use opencv::prelude::*;

/// Copy a decoded 8-bit BGR matrix into an RGB frame.
///
/// The frame takes its size from the matrix, never from container metadata.
pub fn frame_from_bgr(mat: &Mat) -> Result<Frame> {
    if mat.typ() != CV_8UC3 {
        bail!("expected an 8-bit BGR image, got matrix type {}", mat.typ());
    }

    let mut rgb = Mat::default();
    imgproc::cvt_color_def(mat, &mut rgb, imgproc::COLOR_BGR2RGB)?;
    let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
    let bytes = rgb.data_bytes()?.to_vec();

    Frame::from_raw(width, height, bytes).context("Decoded frame has the wrong size")
}

fn mat_from_bytes(rows: u32, cols: u32, typ: i32, bytes: &[u8]) -> Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(rows as i32, cols as i32, typ, Scalar::all(0.0))?;
    mat.data_bytes_mut()?.copy_from_slice(bytes);
    Ok(mat)
}

pub fn mask_to_mat(mask: &Mask) -> Result<Mat> {
    mat_from_bytes(mask.height(), mask.width(), CV_8UC1, mask.as_raw())
}

/// BGR copy of a frame, ready for HighGUI.
pub fn frame_to_bgr(frame: &Frame) -> Result<Mat> {
    let rgb = mat_from_bytes(frame.height(), frame.width(), CV_8UC3, frame.as_raw())?;
    let mut bgr = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR)?;
    Ok(bgr)
}
