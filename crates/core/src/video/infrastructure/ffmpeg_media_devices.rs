use std::path::Path;

use crate::video::domain::media_devices::{
    CameraConstraints, CameraError, FacingMode, MediaDevices,
};
use crate::video::domain::video_source::VideoSource;
use crate::video::infrastructure::ffmpeg_stream::{FfmpegStream, OpenRequest};

/// Cameras through libavdevice, pre-recorded media through libavformat.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegMediaDevices;

impl FfmpegMediaDevices {
    pub fn new() -> Self {
        Self
    }
}

impl MediaDevices for FfmpegMediaDevices {
    fn request_camera(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<Box<dyn VideoSource>, CameraError> {
        let request = camera_request(constraints)?;
        if constraints.facing_mode != FacingMode::User {
            log::debug!("Desktop capture ignores facing mode {:?}", constraints.facing_mode);
        }
        log::info!(
            "Requesting camera {} via {}",
            request.location,
            request.device_format.as_deref().unwrap_or("auto")
        );
        Ok(Box::new(FfmpegStream::open(request)?))
    }

    fn open_looping(&self, location: &str) -> Result<Box<dyn VideoSource>, CameraError> {
        log::info!("Opening looping source {location}");
        Ok(Box::new(FfmpegStream::open(OpenRequest {
            location: location.to_string(),
            device_format: None,
            options: vec![],
            looping: true,
        })?))
    }
}

/// Platform capture backend and the device it opens by default.
fn platform_backend() -> (&'static str, Option<&'static str>) {
    if cfg!(target_os = "linux") {
        ("video4linux2", Some("/dev/video0"))
    } else if cfg!(target_os = "macos") {
        ("avfoundation", Some("0"))
    } else if cfg!(target_os = "windows") {
        // dshow has no default device; it must be named.
        ("dshow", None)
    } else {
        ("video4linux2", Some("/dev/video0"))
    }
}

fn camera_request(constraints: &CameraConstraints) -> Result<OpenRequest, CameraError> {
    let (format, default_device) = platform_backend();
    let location = match (&constraints.device, default_device) {
        (Some(device), _) => device_location(format, device),
        (None, Some(device)) => device.to_string(),
        (None, None) => return Err(CameraError::NotFound),
    };

    if format == "video4linux2" && !Path::new(&location).exists() {
        return Err(CameraError::NotFound);
    }

    Ok(OpenRequest {
        location,
        device_format: Some(format.to_string()),
        options: capture_hints(constraints),
        looping: false,
    })
}

fn device_location(format: &str, device: &str) -> String {
    if format == "dshow" && !device.starts_with("video=") {
        format!("video={device}")
    } else {
        device.to_string()
    }
}

fn capture_hints(constraints: &CameraConstraints) -> Vec<(String, String)> {
    let mut options = Vec::new();
    if constraints.ideal_width > 0 && constraints.ideal_height > 0 {
        options.push((
            "video_size".to_string(),
            format!("{}x{}", constraints.ideal_width, constraints.ideal_height),
        ));
    }
    if constraints.ideal_frame_rate > 0 {
        options.push((
            "framerate".to_string(),
            constraints.ideal_frame_rate.to_string(),
        ));
    }
    options
}
