//! Debug overlay markers. Purely diagnostic; they never feed back into control.

use crate::core_modules::landmark::Landmark;

pub type Rgb = [u8; 3];

pub const IRIS_MARKER_COLOR: Rgb = [0, 255, 0];
pub const EYELID_MARKER_COLOR: Rgb = [255, 255, 0];
pub const MARKER_RADIUS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Iris,
    Eyelid,
}

/// A small circle drawn at a landmark, in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
    pub color: Rgb,
    pub kind: MarkerKind,
}

impl Marker {
    /// Places a marker on a landmark. Pixel positions truncate toward zero.
    pub fn at(landmark: &Landmark, frame_width: u32, frame_height: u32, kind: MarkerKind) -> Self {
        let (x, y) = landmark.to_pixel(frame_width, frame_height);
        let color = match kind {
            MarkerKind::Iris => IRIS_MARKER_COLOR,
            MarkerKind::Eyelid => EYELID_MARKER_COLOR,
        };
        Self {
            x: x as i32,
            y: y as i32,
            radius: MARKER_RADIUS,
            color,
            kind,
        }
    }
}
