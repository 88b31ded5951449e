// THEORY:
// A `Frame` is the unit of work for one loop iteration. It owns the RGB pixels
// the camera produced, is mirrored in place, handed to the landmark detector and
// then rendered. Nothing keeps a frame alive past the iteration that created it.
//
// The buffer is always tightly packed RGB8 (`width * height * 3` bytes). Camera
// backends that deliver BGR convert before constructing a frame.

use crate::error::{Error, Result};
use image::{RgbImage, imageops};

/// One camera image in RGB order.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Wraps a packed RGB8 buffer, rejecting buffers whose length does not match
    /// the given dimensions.
    pub fn from_rgb_bytes(width: u32, height: u32, bytes: Vec<u8>) -> Result<Self> {
        let len = bytes.len();
        let expected = width as usize * height as usize * 3;
        if len != expected {
            return Err(Error::FrameSize { width, height, len });
        }
        RgbImage::from_raw(width, height, bytes)
            .map(Self::new)
            .ok_or(Error::FrameSize { width, height, len })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Flips the frame around its vertical axis so on-screen motion follows the
    /// user's own motion (selfie view).
    pub fn mirror(&mut self) {
        imageops::flip_horizontal_in_place(&mut self.image);
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }
}
