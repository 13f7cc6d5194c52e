use std::time::Duration;

pub const BLAZEFACE_MODEL_NAME: &str = "blazeface_short_range.onnx";

/// Environment override for where the model is downloaded from when it is
/// neither cached nor bundled.
pub const MODEL_URL_ENV: &str = "FACECAP_MODEL_URL";

/// Played on a loop when no capture device exists.
pub const SAMPLE_VIDEO_URL: &str = "https://media.gettyimages.com/id/527909290/video/portrait-of-happy-diverse-group-of-friends-smiling-at-camera.mp4?s=640x640&k=20&c=WKj0P-GkLmdDc9BP2hQHEnVqVv1pJmOKRZgPVYyryz8=";

pub const DETECTION_PERIOD: Duration = Duration::from_millis(100);

/// Margin added around each face before cropping a card.
pub const CROP_PADDING: u32 = 20;

pub const CARD_JPEG_QUALITY: u8 = 80;

pub const MAX_FACES: usize = 20;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

pub const IDEAL_WIDTH: u32 = 640;
pub const IDEAL_HEIGHT: u32 = 480;
pub const IDEAL_FRAME_RATE: u32 = 30;

/// `#00FF00`
pub const OVERLAY_COLOR: [u8; 3] = [0x00, 0xFF, 0x00];
pub const OVERLAY_LINE_WIDTH: f32 = 3.0;
pub const OVERLAY_FONT_SIZE: f32 = 16.0;
