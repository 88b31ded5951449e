use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};
use gaze_pointer::{
    Error, Result,
    devices::PointerDriver,
    pipeline::{ScreenPoint, ScreenSize},
};
use std::time::Duration;
use tracing::info;

/// Moves and clicks the real OS pointer.
pub struct EnigoPointer {
    enigo: Enigo,
}

impl EnigoPointer {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default()).map_err(Error::pointer)?;
        Ok(Self { enigo })
    }
}

impl PointerDriver for EnigoPointer {
    fn screen_size(&self) -> Result<ScreenSize> {
        let (width, height) = self.enigo.main_display().map_err(Error::pointer)?;
        Ok(ScreenSize::new(width.max(0) as u32, height.max(0) as u32))
    }

    fn move_to(&mut self, target: ScreenPoint) -> Result<()> {
        let (x, y) = target.rounded();
        self.enigo.move_mouse(x, y, Coordinate::Abs).map_err(Error::pointer)
    }

    fn click(&mut self) -> Result<()> {
        self.enigo.button(Button::Left, Direction::Click).map_err(Error::pointer)
    }

    fn sleep(&mut self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// Logs pointer commands instead of performing them.
pub struct DryRunPointer {
    screen: ScreenSize,
}

impl DryRunPointer {
    pub const DEFAULT_SCREEN: ScreenSize = ScreenSize {
        width: 1920,
        height: 1080,
    };

    pub fn new(screen: ScreenSize) -> Self {
        Self { screen }
    }
}

impl PointerDriver for DryRunPointer {
    fn screen_size(&self) -> Result<ScreenSize> {
        Ok(self.screen)
    }

    fn move_to(&mut self, target: ScreenPoint) -> Result<()> {
        let (x, y) = target.rounded();
        info!(x, y, "dry run: move");
        Ok(())
    }

    fn click(&mut self) -> Result<()> {
        info!("dry run: click");
        Ok(())
    }

    fn sleep(&mut self, delay: Duration) {
        std::thread::sleep(delay);
    }
}
