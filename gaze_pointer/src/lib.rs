// THEORY:
// This file is the entry point for the `gaze_pointer` library crate. The public
// surface is the per-frame `pipeline` API, the `session` main loop and the
// `devices` traits a binary implements to plug in a camera, a landmark model, an
// input backend and a debug window. Geometry and preprocessing live in
// `core_modules` and carry no hardware dependencies.

pub mod config;
pub mod core_modules;
pub mod devices;
pub mod error;
pub mod pipeline;
pub mod session;

pub use config::PointerConfig;
pub use error::{Error, Result};
pub use session::{PointerSession, SessionSummary};
