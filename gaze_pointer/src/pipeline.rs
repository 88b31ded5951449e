// THEORY:
// The `pipeline` module is the per-frame API of the engine. It turns one frame's
// detection result into a `FrameOutcome` value (an optional cursor target and a
// click flag) without touching any device. Side effects belong to the session,
// which makes every decision here testable without a camera or a desktop.

use crate::config::PointerConfig;
use crate::core_modules::frame::Frame;
use crate::core_modules::gaze_mapper::GazeMapper;
use crate::core_modules::landmark::FaceLandmarks;
use crate::devices::LandmarkDetector;
use crate::error::Result;

// Re-export key data structures for the public API.
pub use crate::core_modules::overlay::{Marker, MarkerKind};
pub use crate::core_modules::screen::{ClampPolicy, ScreenPoint, ScreenSize};

/// What one frame asks of the pointer and the debug display.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameOutcome {
    pub cursor_target: Option<ScreenPoint>,
    pub click: bool,
    /// Lower-minus-upper eyelid gap, when a face was seen.
    pub eyelid_gap: Option<f64>,
    pub markers: Vec<Marker>,
}

impl FrameOutcome {
    pub fn no_face() -> Self {
        Self::default()
    }

    pub fn has_face(&self) -> bool {
        self.eyelid_gap.is_some()
    }

    /// Number of pointer commands this outcome issues: at most one move and one click.
    pub fn command_count(&self) -> usize {
        usize::from(self.cursor_target.is_some()) + usize::from(self.click)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameProcessor {
    mapper: GazeMapper,
}

impl FrameProcessor {
    pub fn new(mapper: GazeMapper) -> Self {
        Self { mapper }
    }

    pub fn from_config(config: &PointerConfig, screen: ScreenSize) -> Self {
        Self::new(GazeMapper::new(
            screen,
            config.mapping.gain,
            config.click.threshold,
            config.mapping.clamp,
        ))
    }

    pub fn mapper(&self) -> &GazeMapper {
        &self.mapper
    }

    /// Maps the first detected face. Any further faces are ignored.
    pub fn process(&self, faces: &[FaceLandmarks], frame_width: u32, frame_height: u32) -> Result<FrameOutcome> {
        let Some(face) = faces.first() else {
            return Ok(FrameOutcome::no_face());
        };
        let reading = self.mapper.map(face, frame_width, frame_height)?;
        Ok(FrameOutcome {
            cursor_target: reading.cursor_target,
            click: reading.click,
            eyelid_gap: Some(reading.eyelid_gap),
            markers: reading.markers,
        })
    }

    /// Mirrors the frame in place when asked, runs the detector once and maps the
    /// result.
    pub fn process_frame<D>(&self, frame: &mut Frame, detector: &mut D, mirror: bool) -> Result<FrameOutcome>
    where
        D: LandmarkDetector + ?Sized,
    {
        if mirror {
            frame.mirror();
        }
        let faces = detector.detect(frame)?;
        let (width, height) = frame.dimensions();
        self.process(&faces, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::landmark::synthetic_face;
    use image::{Rgb, RgbImage};

    fn processor() -> FrameProcessor {
        FrameProcessor::from_config(&PointerConfig::default(), ScreenSize::new(1920, 1080))
    }

    /// Reports where the bright pixel was when it looked at the frame.
    struct BrightSpotDetector {
        seen_at: Option<u32>,
    }

    impl LandmarkDetector for BrightSpotDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceLandmarks>> {
            self.seen_at = frame
                .image()
                .enumerate_pixels()
                .find(|(_, _, p)| p.0 == [255, 255, 255])
                .map(|(x, _, _)| x);
            Ok(vec![synthetic_face((0.5, 0.5), 0.6, 0.5)])
        }
    }

    #[test]
    fn no_face_yields_no_commands() {
        let outcome = processor().process(&[], 640, 480).expect("empty detection");
        assert_eq!(outcome, FrameOutcome::no_face());
        assert_eq!(outcome.command_count(), 0);
        assert!(!outcome.has_face());
        assert!(outcome.markers.is_empty());
    }

    #[test]
    fn only_the_first_face_drives_the_pointer() {
        let first = synthetic_face((0.25, 0.25), 0.6, 0.5);
        let second = synthetic_face((0.75, 0.75), 0.5005, 0.5);

        let outcome = processor().process(&[first, second], 640, 480).expect("two faces");

        let target = outcome.cursor_target.expect("face seen");
        assert!((target.x - 1.2 * 1920.0 * 0.25).abs() < 1e-9);
        assert!((target.y - 1.2 * 1080.0 * 0.25).abs() < 1e-9);
        // The second face has its eye closed; it must not click.
        assert!(!outcome.click);
        assert_eq!(outcome.command_count(), 1);
    }

    #[test]
    fn a_blinking_face_moves_and_clicks() {
        let face = synthetic_face((0.5, 0.5), 0.502, 0.5);
        let outcome = processor().process(&[face], 640, 480).unwrap();
        assert!(outcome.click);
        assert_eq!(outcome.command_count(), 2);
        assert_eq!(outcome.markers.len(), 6);
    }

    #[test]
    fn a_nan_iris_issues_no_pointer_command() {
        let face = synthetic_face((f64::NAN, f64::NAN), 0.6, 0.5);
        let outcome = processor().process(&[face], 640, 480).unwrap();
        assert!(outcome.has_face());
        assert_eq!(outcome.cursor_target, None);
        assert_eq!(outcome.command_count(), 0);
    }

    #[test]
    fn frames_are_mirrored_before_detection() {
        let mut image = RgbImage::new(8, 2);
        image.put_pixel(1, 0, Rgb([255, 255, 255]));
        let mut detector = BrightSpotDetector { seen_at: None };

        let mut frame = Frame::new(image.clone());
        processor().process_frame(&mut frame, &mut detector, true).unwrap();
        assert_eq!(detector.seen_at, Some(6));

        let mut frame = Frame::new(image);
        processor().process_frame(&mut frame, &mut detector, false).unwrap();
        assert_eq!(detector.seen_at, Some(1));
    }
}
