// THEORY:
// The `GazeMapper` is the only first-party geometry in the system. It is a
// stateless function of one face's landmarks and the frame/display sizes:
//
// 1.  **Cursor target**: the iris tracking point is taken to frame pixels and
//     scaled per axis by `gain * screen / frame`. This cancels the frame size,
//     so the target is `gain * screen * normalized` and is linear in the
//     landmark. The clamp policy is applied last.
// 2.  **Click decision**: the lower-minus-upper eyelid gap is compared against a
//     fixed threshold. One frame under the threshold is one click; there is no
//     hysteresis and no memory of earlier frames.
// 3.  **Markers**: every landmark the mapper reads gets a debug marker.
//
// A target that is not finite (NaN or infinite landmark output) is dropped, so
// a garbage mesh never sends the cursor anywhere.

use crate::core_modules::landmark::{EyelidPair, FaceLandmarks, Landmark};
use crate::core_modules::overlay::{Marker, MarkerKind};
use crate::core_modules::screen::{ClampPolicy, ScreenPoint, ScreenSize};
use crate::error::Result;

pub const DEFAULT_GAIN: f64 = 1.2;
pub const DEFAULT_CLICK_THRESHOLD: f64 = 0.004;

/// Offset of the tracking point within the iris ring.
const TRACKING_RING_OFFSET: usize = 2;

/// Everything the mapper derives from one face.
#[derive(Debug, Clone, PartialEq)]
pub struct GazeReading {
    /// `None` when the tracking point did not produce a finite position.
    pub cursor_target: Option<ScreenPoint>,
    pub click: bool,
    pub eyelid_gap: f64,
    pub markers: Vec<Marker>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeMapper {
    screen: ScreenSize,
    gain: f64,
    click_threshold: f64,
    clamp: ClampPolicy,
}

impl GazeMapper {
    pub fn new(screen: ScreenSize, gain: f64, click_threshold: f64, clamp: ClampPolicy) -> Self {
        Self {
            screen,
            gain,
            click_threshold,
            clamp,
        }
    }

    pub fn screen(&self) -> ScreenSize {
        self.screen
    }

    pub fn cursor_target(&self, tracking: &Landmark, frame_width: u32, frame_height: u32) -> ScreenPoint {
        let (x, y) = tracking.to_pixel(frame_width, frame_height);
        let target = ScreenPoint::new(
            self.gain * self.screen.width as f64 / frame_width as f64 * x,
            self.gain * self.screen.height as f64 / frame_height as f64 * y,
        );
        self.clamp.apply(target, self.screen)
    }

    /// Strictly below the threshold counts as a blink.
    pub fn is_click(&self, eyelids: &EyelidPair) -> bool {
        eyelids.gap() < self.click_threshold
    }

    pub fn map(&self, face: &FaceLandmarks, frame_width: u32, frame_height: u32) -> Result<GazeReading> {
        let ring = face.iris_ring()?;
        let eyelids = face.eyelids()?;

        let mut markers = Vec::with_capacity(ring.len() + 2);
        markers.extend(
            ring.iter()
                .map(|l| Marker::at(l, frame_width, frame_height, MarkerKind::Iris)),
        );
        markers.extend(
            [eyelids.lower, eyelids.upper]
                .iter()
                .map(|l| Marker::at(l, frame_width, frame_height, MarkerKind::Eyelid)),
        );

        Ok(GazeReading {
            cursor_target: Some(self.cursor_target(&ring[TRACKING_RING_OFFSET], frame_width, frame_height))
                .filter(ScreenPoint::is_finite),
            click: self.is_click(&eyelids),
            eyelid_gap: eyelids.gap(),
            markers,
        })
    }
}
