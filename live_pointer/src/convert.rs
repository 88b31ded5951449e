use gaze_pointer::core_modules::frame::Frame;
use opencv::{
    core::{CV_8UC3, Mat, Scalar},
    imgproc,
    prelude::*,
};

/// Copies an RGB frame into a freshly allocated BGR `Mat`.
pub fn frame_to_bgr(frame: &Frame) -> opencv::Result<Mat> {
    let (width, height) = frame.dimensions();
    let mut rgb = Mat::new_rows_cols_with_default(height as i32, width as i32, CV_8UC3, Scalar::all(0.0))?;
    rgb.data_bytes_mut()?.copy_from_slice(frame.as_raw());

    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}
