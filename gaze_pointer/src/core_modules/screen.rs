use serde::{Deserialize, Serialize};

/// Physical display extent in pixels. Captured once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// An absolute cursor target. May lie outside the display when unclamped.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_within(&self, screen: ScreenSize) -> bool {
        (0.0..screen.width as f64).contains(&self.x) && (0.0..screen.height as f64).contains(&self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Clamps into `[0, width - 1] x [0, height - 1]`.
    pub fn clamp_to(self, screen: ScreenSize) -> Self {
        let max_x = screen.width.saturating_sub(1) as f64;
        let max_y = screen.height.saturating_sub(1) as f64;
        Self {
            x: self.x.clamp(0.0, max_x),
            y: self.y.clamp(0.0, max_y),
        }
    }

    /// Integer pixel position for input injection.
    pub fn rounded(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

/// What to do with targets that land outside the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampPolicy {
    /// Keep targets on the display.
    #[default]
    Display,
    /// Pass targets through. With a gain above 1 the cursor can be commanded past
    /// the screen edges.
    Unclamped,
}

impl ClampPolicy {
    pub fn apply(self, point: ScreenPoint, screen: ScreenSize) -> ScreenPoint {
        match self {
            ClampPolicy::Display => point.clamp_to(screen),
            ClampPolicy::Unclamped => point,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_HD: ScreenSize = ScreenSize { width: 1920, height: 1080 };

    #[test]
    fn clamping_pins_overflow_to_the_last_pixel() {
        let point = ScreenPoint::new(2200.0, -15.0).clamp_to(FULL_HD);
        assert_eq!(point, ScreenPoint::new(1919.0, 0.0));
        assert!(point.is_within(FULL_HD));
    }

    #[test]
    fn unclamped_policy_passes_points_through() {
        let point = ScreenPoint::new(2200.0, 1300.0);
        assert_eq!(ClampPolicy::Unclamped.apply(point, FULL_HD), point);
        assert!(!point.is_within(FULL_HD));
    }

    #[test]
    fn points_inside_are_untouched_by_either_policy() {
        let point = ScreenPoint::new(1152.0, 648.0);
        assert_eq!(ClampPolicy::Display.apply(point, FULL_HD), point);
        assert_eq!(ClampPolicy::Unclamped.apply(point, FULL_HD), point);
    }

    #[test]
    fn rounding_picks_the_nearest_pixel() {
        assert_eq!(ScreenPoint::new(10.49, 10.5).rounded(), (10, 11));
    }

    #[test]
    fn clamp_policy_uses_snake_case_names() {
        assert_eq!(serde_json::to_string(&ClampPolicy::Unclamped).unwrap(), "\"unclamped\"");
        let policy: ClampPolicy = serde_json::from_str("\"display\"").unwrap();
        assert_eq!(policy, ClampPolicy::Display);
    }
}
