//! Runtime configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all) gives
//! the stock behavior: camera 0, mirrored frames, gain 1.2, click below a 0.004
//! eyelid gap, one second of debounce.

use crate::core_modules::gaze_mapper::{DEFAULT_CLICK_THRESHOLD, DEFAULT_GAIN};
use crate::core_modules::mesh_input::TensorLayout;
use crate::core_modules::screen::{ClampPolicy, ScreenSize};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that selects the camera index.
pub const CAMERA_ENV_VAR: &str = "EYE_MOUSE_CAMERA";

/// Esc, as reported by highgui.
pub const DEFAULT_QUIT_KEY: i32 = 27;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerConfig {
    pub camera: CameraConfig,
    pub mapping: MappingConfig,
    pub click: ClickConfig,
    pub display: DisplayConfig,
    pub screen: ScreenOverride,
    pub detector: DetectorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub index: i32,
    /// Requested capture size. The platform default is used when unset.
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Mirror frames horizontally before detection.
    pub mirror: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: None,
            height: None,
            mirror: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub gain: f64,
    pub clamp: ClampPolicy,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            gain: DEFAULT_GAIN,
            clamp: ClampPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickConfig {
    /// A click fires when the eyelid gap is strictly below this value.
    pub threshold: f64,
    /// Blocking pause after each click.
    pub debounce_ms: u64,
}

impl ClickConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CLICK_THRESHOLD,
            debounce_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub enabled: bool,
    pub window_title: String,
    /// Key code that ends the session from the debug window. `None` disables it.
    pub quit_key: Option<i32>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_title: "Eye Mouse".to_string(),
            quit_key: Some(DEFAULT_QUIT_KEY),
        }
    }
}

/// Fixed display size, replacing the value the pointer driver reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenOverride {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ScreenOverride {
    pub fn resolve(&self, detected: ScreenSize) -> ScreenSize {
        ScreenSize::new(
            self.width.unwrap_or(detected.width),
            self.height.unwrap_or(detected.height),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// YuNet face detector. Without it the landmark model sees the centered
    /// square of the whole frame.
    pub face_model: Option<PathBuf>,
    pub landmark_model: PathBuf,
    pub input_size: u32,
    pub score_threshold: f32,
    pub presence_threshold: f32,
    pub roi_scale: f32,
    pub max_faces: usize,
    pub layout: TensorLayout,
    /// Name of the mesh output holding the face-presence logit. When unset the
    /// first single-value output is used.
    pub presence_output: Option<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            face_model: Some(PathBuf::from("models/face_detection_yunet_2023mar.onnx")),
            landmark_model: PathBuf::from("models/face_landmarks_detector.onnx"),
            input_size: 256,
            score_threshold: 0.5,
            presence_threshold: 0.5,
            roi_scale: 1.5,
            max_faces: 1,
            layout: TensorLayout::default(),
            presence_output: None,
        }
    }
}

impl PointerConfig {
    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_camera_env(std::env::var(CAMERA_ENV_VAR).ok())
    }

    pub fn apply_camera_env(&mut self, value: Option<String>) -> Result<()> {
        let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
            return Ok(());
        };
        self.camera.index = value
            .trim()
            .parse()
            .map_err(|_| Error::InvalidConfig(format!("{CAMERA_ENV_VAR}={value} is not a camera index")))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(Error::InvalidConfig(msg.to_string()));

        if !(self.mapping.gain.is_finite() && self.mapping.gain > 0.0) {
            return fail("mapping.gain must be a positive number");
        }
        if !self.click.threshold.is_finite() {
            return fail("click.threshold must be finite");
        }
        if self.camera.index < 0 {
            return fail("camera.index must not be negative");
        }
        if self.screen.width == Some(0) || self.screen.height == Some(0) {
            return fail("screen overrides must be non-zero");
        }
        if self.detector.input_size == 0 {
            return fail("detector.input_size must be non-zero");
        }
        if !(self.detector.roi_scale.is_finite() && self.detector.roi_scale > 0.0) {
            return fail("detector.roi_scale must be a positive number");
        }
        if self.detector.max_faces == 0 {
            return fail("detector.max_faces must be at least 1");
        }
        Ok(())
    }
}
