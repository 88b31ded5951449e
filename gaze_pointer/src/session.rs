// THEORY:
// The `PointerSession` is the main loop. It owns the four devices and runs the
// fixed sequence read → mirror → detect → map → move → click (+ debounce) →
// present, one frame at a time on one thread. Nothing overlaps between frames.
//
// Lifecycle:
// - Start: the display size is read once from the pointer driver (or the config
//   override) and fixed for the life of the session.
// - Stop: the shutdown channel is checked before each frame, and the quit key
//   is checked after each present. A debounce sleep in progress is not cut
//   short; the stop is seen on the next iteration.
// - Release: the devices are owned by the session, so dropping it closes the
//   camera and the debug window.
//
// Any device error ends the run; there is no retry.

use crate::config::PointerConfig;
use crate::devices::{DebugDisplay, FrameSource, LandmarkDetector, PointerDriver};
use crate::error::{Error, Result};
use crate::pipeline::{FrameOutcome, FrameProcessor, ScreenSize};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSummary {
    pub frames: u64,
    pub faces: u64,
    pub moves: u64,
    pub clicks: u64,
}

/// Result of one loop iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub outcome: FrameOutcome,
    /// The quit key was pressed in the debug window.
    pub quit: bool,
}

pub struct PointerSession<S, D, P, V> {
    source: S,
    detector: D,
    pointer: P,
    display: V,
    processor: FrameProcessor,
    mirror: bool,
    debounce: Duration,
    quit_key: Option<i32>,
    summary: SessionSummary,
}

impl<S, D, P, V> PointerSession<S, D, P, V>
where
    S: FrameSource,
    D: LandmarkDetector,
    P: PointerDriver,
    V: DebugDisplay,
{
    pub fn new(source: S, detector: D, pointer: P, display: V, config: &PointerConfig) -> Result<Self> {
        config.validate()?;
        let screen = config.screen.resolve(pointer.screen_size()?);
        if screen.width == 0 || screen.height == 0 {
            return Err(Error::pointer(format!(
                "display reported as {}x{}",
                screen.width, screen.height
            )));
        }
        info!(width = screen.width, height = screen.height, "display size captured");

        Ok(Self {
            source,
            detector,
            pointer,
            display,
            processor: FrameProcessor::from_config(config, screen),
            mirror: config.camera.mirror,
            debounce: config.click.debounce(),
            quit_key: config.display.quit_key,
            summary: SessionSummary::default(),
        })
    }

    pub fn screen(&self) -> ScreenSize {
        self.processor.mapper().screen()
    }

    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    pub fn pointer(&self) -> &P {
        &self.pointer
    }

    /// Hands the devices back, for callers that want to reuse or inspect them.
    pub fn into_parts(self) -> (S, D, P, V) {
        (self.source, self.detector, self.pointer, self.display)
    }

    /// Runs exactly one iteration of the loop.
    pub fn step(&mut self) -> Result<Step> {
        let mut frame = self.source.read_frame()?;
        if frame.is_empty() {
            return Err(Error::capture("camera delivered an empty frame"));
        }

        let outcome = self
            .processor
            .process_frame(&mut frame, &mut self.detector, self.mirror)?;
        self.summary.frames += 1;

        if let Some(gap) = outcome.eyelid_gap {
            self.summary.faces += 1;
            debug!(eyelid_gap = gap, target = ?outcome.cursor_target, "face mapped");
        }

        if let Some(target) = outcome.cursor_target {
            self.pointer.move_to(target)?;
            self.summary.moves += 1;
        }

        if outcome.click {
            info!(eyelid_gap = ?outcome.eyelid_gap, "blink click");
            self.pointer.click()?;
            self.summary.clicks += 1;
            self.pointer.sleep(self.debounce);
        }

        let key = self.display.present(&frame, &outcome.markers)?;
        let quit = matches!((key, self.quit_key), (Some(pressed), Some(quit)) if pressed == quit);

        Ok(Step { outcome, quit })
    }

    /// Loops until shutdown is signalled, the quit key is pressed or a device
    /// fails.
    #[tracing::instrument(name = "pointer_session", skip_all)]
    pub fn run(&mut self, shutdown: &watch::Receiver<bool>) -> Result<SessionSummary> {
        info!(mirror = self.mirror, debounce_ms = self.debounce.as_millis() as u64, "session started");
        loop {
            if *shutdown.borrow() {
                info!("shutdown requested");
                break;
            }
            if self.step()?.quit {
                warn!("quit key pressed in debug window");
                break;
            }
        }
        let summary = self.summary;
        info!(
            frames = summary.frames,
            faces = summary.faces,
            moves = summary.moves,
            clicks = summary.clicks,
            "session stopped"
        );
        Ok(summary)
    }
}
