/// Native properties of a delivered video stream.
///
/// Only known once the source has decoded enough to describe itself, which
/// is why [`crate::video::domain::video_source::VideoSource::metadata`]
/// returns an `Option`.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Device path, file path or URL the stream was opened from.
    pub source: String,
}

impl VideoMetadata {
    /// Delay between frames at the native rate, falling back to 30 fps
    /// when the container does not report one.
    pub fn frame_interval(&self) -> std::time::Duration {
        let fps = if self.fps > 0.0 { self.fps } else { 30.0 };
        std::time::Duration::from_secs_f64(1.0 / fps)
    }
}
