//! Seams to the three external capabilities (camera, landmark model, OS input)
//! and the debug window. The engine only talks to hardware through these.

use crate::core_modules::frame::Frame;
use crate::core_modules::landmark::FaceLandmarks;
use crate::core_modules::overlay::Marker;
use crate::core_modules::screen::{ScreenPoint, ScreenSize};
use crate::error::Result;
use std::time::Duration;

pub trait FrameSource {
    /// Blocks until the next frame is available.
    fn read_frame(&mut self) -> Result<Frame>;
}

pub trait LandmarkDetector {
    /// Returns one landmark set per detected face, best face first. An empty
    /// vector means no face.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceLandmarks>>;
}

pub trait PointerDriver {
    fn screen_size(&self) -> Result<ScreenSize>;
    fn move_to(&mut self, target: ScreenPoint) -> Result<()>;
    fn click(&mut self) -> Result<()>;
    fn sleep(&mut self, delay: Duration);
}

pub trait DebugDisplay {
    /// Shows the frame with its markers and polls the keyboard briefly. Returns
    /// the key pressed during the poll, if any.
    fn present(&mut self, frame: &Frame, markers: &[Marker]) -> Result<Option<i32>>;
}

/// Display used when the debug window is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl DebugDisplay for NullDisplay {
    fn present(&mut self, _frame: &Frame, _markers: &[Marker]) -> Result<Option<i32>> {
        Ok(None)
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn read_frame(&mut self) -> Result<Frame> {
        (**self).read_frame()
    }
}

impl<T: LandmarkDetector + ?Sized> LandmarkDetector for Box<T> {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceLandmarks>> {
        (**self).detect(frame)
    }
}

impl<T: PointerDriver + ?Sized> PointerDriver for Box<T> {
    fn screen_size(&self) -> Result<ScreenSize> {
        (**self).screen_size()
    }

    fn move_to(&mut self, target: ScreenPoint) -> Result<()> {
        (**self).move_to(target)
    }

    fn click(&mut self) -> Result<()> {
        (**self).click()
    }

    fn sleep(&mut self, delay: Duration) {
        (**self).sleep(delay)
    }
}

impl<T: DebugDisplay + ?Sized> DebugDisplay for Box<T> {
    fn present(&mut self, frame: &Frame, markers: &[Marker]) -> Result<Option<i32>> {
        (**self).present(frame, markers)
    }
}
