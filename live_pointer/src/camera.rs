use gaze_pointer::{
    Error, Result, config::CameraConfig, core_modules::frame::Frame, devices::FrameSource,
};
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use tracing::{info, warn};

/// The default system camera, read through opencv `videoio`.
pub struct OpenCvCamera {
    capture: VideoCapture,
    bgr: Mat,
    rgb: Mat,
}

impl OpenCvCamera {
    pub fn open(config: &CameraConfig) -> Result<Self> {
        let mut capture = VideoCapture::new(config.index, videoio::CAP_ANY).map_err(Error::capture)?;
        if !capture.is_opened().map_err(Error::capture)? {
            return Err(Error::capture(format!("camera {} could not be opened", config.index)));
        }

        if let Some(width) = config.width {
            capture
                .set(videoio::CAP_PROP_FRAME_WIDTH, width as f64)
                .map_err(Error::capture)?;
        }
        if let Some(height) = config.height {
            capture
                .set(videoio::CAP_PROP_FRAME_HEIGHT, height as f64)
                .map_err(Error::capture)?;
        }

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH).map_err(Error::capture)?;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT).map_err(Error::capture)?;
        info!(index = config.index, width, height, "camera opened");

        Ok(Self {
            capture,
            bgr: Mat::default(),
            rgb: Mat::default(),
        })
    }
}

impl FrameSource for OpenCvCamera {
    fn read_frame(&mut self) -> Result<Frame> {
        let grabbed = self.capture.read(&mut self.bgr).map_err(Error::capture)?;
        if !grabbed || self.bgr.empty() {
            return Err(Error::capture("camera returned no frame"));
        }

        // The landmark model wants RGB; opencv delivers BGR.
        imgproc::cvt_color(&self.bgr, &mut self.rgb, imgproc::COLOR_BGR2RGB, 0).map_err(Error::capture)?;
        let width = self.rgb.cols() as u32;
        let height = self.rgb.rows() as u32;
        let bytes = self.rgb.data_bytes().map_err(Error::capture)?.to_vec();
        Frame::from_rgb_bytes(width, height, bytes)
    }
}

impl Drop for OpenCvCamera {
    fn drop(&mut self) {
        match self.capture.release() {
            Ok(()) => info!("camera released"),
            Err(err) => warn!(%err, "failed to release camera"),
        }
    }
}

