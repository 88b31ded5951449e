use std::path::PathBuf;

/// Boxed cause carried by the device-facing error variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("camera error: {0}")]
    Capture(#[source] BoxError),

    #[error("landmark detector error: {0}")]
    Detector(#[source] BoxError),

    #[error("pointer error: {0}")]
    Pointer(#[source] BoxError),

    #[error("display error: {0}")]
    Display(#[source] BoxError),

    /// The landmark set is shorter than the model topology requires.
    #[error("landmark {index} is missing from a set of {len} points")]
    LandmarkIndex { index: usize, len: usize },

    #[error("frame buffer of {len} bytes does not hold a {width}x{height} RGB image")]
    FrameSize { width: u32, height: u32, len: usize },

    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn capture<E: Into<BoxError>>(err: E) -> Self {
        Self::Capture(err.into())
    }

    pub fn detector<E: Into<BoxError>>(err: E) -> Self {
        Self::Detector(err.into())
    }

    pub fn pointer<E: Into<BoxError>>(err: E) -> Self {
        Self::Pointer(err.into())
    }

    pub fn display<E: Into<BoxError>>(err: E) -> Self {
        Self::Display(err.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
