use crate::convert::frame_to_bgr;
use gaze_pointer::{
    Error, Result, core_modules::frame::Frame, devices::DebugDisplay, pipeline::Marker,
};
use opencv::{
    core::{Point, Scalar},
    highgui, imgproc,
};
use tracing::warn;

/// Keyboard poll per frame. Also gives highgui the time it needs to repaint.
const KEY_POLL_MS: i32 = 1;
const MARKER_THICKNESS: i32 = 1;

/// The titled highgui window showing the mirrored camera feed.
pub struct HighGuiWindow {
    title: String,
}

impl HighGuiWindow {
    pub fn open(title: &str) -> Result<Self> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE).map_err(Error::display)?;
        Ok(Self {
            title: title.to_string(),
        })
    }
}

impl DebugDisplay for HighGuiWindow {
    fn present(&mut self, frame: &Frame, markers: &[Marker]) -> Result<Option<i32>> {
        let mut canvas = frame_to_bgr(frame).map_err(Error::display)?;
        for marker in markers {
            let [r, g, b] = marker.color;
            imgproc::circle(
                &mut canvas,
                Point::new(marker.x, marker.y),
                marker.radius,
                Scalar::new(b as f64, g as f64, r as f64, 0.0),
                MARKER_THICKNESS,
                imgproc::LINE_8,
                0,
            )
            .map_err(Error::display)?;
        }

        highgui::imshow(&self.title, &canvas).map_err(Error::display)?;
        let key = highgui::wait_key(KEY_POLL_MS).map_err(Error::display)?;
        Ok((key >= 0).then_some(key))
    }
}

impl Drop for HighGuiWindow {
    fn drop(&mut self) {
        if let Err(err) = highgui::destroy_window(&self.title) {
            warn!(%err, "failed to close debug window");
        }
    }
}
