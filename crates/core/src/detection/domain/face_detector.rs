use std::sync::{Arc, Mutex};

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Domain interface for face detection.
///
/// Returns boxes in the detector's own order; callers must not assume any
/// correlation between the boxes of two calls. Inference sessions need
/// exclusive access, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>>;
}

/// A loaded detector shared between the session and the worker that runs it.
pub type SharedDetector = Arc<Mutex<Box<dyn FaceDetector>>>;

pub fn share(detector: Box<dyn FaceDetector>) -> SharedDetector {
    Arc::new(Mutex::new(detector))
}
