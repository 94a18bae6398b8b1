use thiserror::Error;

/// Camera device failures surfaced to the user with a retry affordance.
///
/// These are never retried automatically; the UI is expected to show the
/// message and offer a retry action that calls `FrameSource::retry`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Camera access denied. Please allow camera permissions.")]
    PermissionDenied,

    #[error("No camera found. Please connect a camera and try again.")]
    NotFound,

    #[error("Camera is already in use by another application.")]
    Busy,

    #[error("Camera error: {message}")]
    Unknown { message: String },
}

/// Infrastructure-level failure while decoding or processing a frame.
///
/// Transient by design: the analysis loop logs these and skips the cycle.
/// A `None` pose (no person visible) is not an error and never maps here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EstimationError {
    #[error("Frame decode failed: {details}")]
    Decode { details: String },

    #[error("Estimator backend failed: {details}")]
    Backend { details: String },
}

#[derive(Error, Debug)]
pub enum FormcoachError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Estimation error: {0}")]
    Estimation(#[from] EstimationError),

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl FormcoachError {
    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FormcoachError>;
