use thiserror::Error;

use crate::shared::constants::{IDEAL_FRAME_RATE, IDEAL_HEIGHT, IDEAL_WIDTH};
use crate::video::domain::video_source::VideoSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

/// Hints for a camera request.
///
/// None of these are hard constraints: the backend asks for them and
/// accepts whatever the device actually delivers.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConstraints {
    pub facing_mode: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub ideal_frame_rate: u32,
    /// Specific device to open; platform default when `None`.
    pub device: Option<String>,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::User,
            ideal_width: IDEAL_WIDTH,
            ideal_height: IDEAL_HEIGHT,
            ideal_frame_rate: IDEAL_FRAME_RATE,
            device: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("no capture device found")]
    NotFound,
    #[error("permission to use the camera was denied")]
    PermissionDenied,
    #[error("camera is in use by another application")]
    Busy,
    #[error("failed to open video source: {0}")]
    Open(String),
}

impl CameraError {
    /// Only a missing device warrants the pre-recorded fallback.
    pub fn is_device_missing(&self) -> bool {
        matches!(self, CameraError::NotFound)
    }
}

/// Acquires video sources: live cameras and looping pre-recorded media.
pub trait MediaDevices {
    fn request_camera(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<Box<dyn VideoSource>, CameraError>;

    /// Opens `location` (file path or URL) as a muted source that loops
    /// forever.
    fn open_looping(&self, location: &str) -> Result<Box<dyn VideoSource>, CameraError>;
}
