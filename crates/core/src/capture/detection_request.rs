use crate::detection::domain::face_detector::SharedDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// Periodic pass that redraws the overlay.
    Overlay,
    /// One-shot pass that rebuilds the face cards.
    Capture,
}

/// Identifies which session and which call chain a detection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub purpose: Purpose,
}

/// One detection pass, detached from the session so it can run anywhere.
pub struct DetectionRequest {
    pub ticket: Ticket,
    pub frame: Frame,
    detector: SharedDetector,
}

impl DetectionRequest {
    pub fn new(ticket: Ticket, frame: Frame, detector: SharedDetector) -> Self {
        Self {
            ticket,
            frame,
            detector,
        }
    }

    /// Runs the detector over the frame. Blocks for the whole inference.
    pub fn run(self) -> DetectionOutcome {
        let result = match self.detector.lock() {
            Ok(mut detector) => detector.detect(&self.frame).map_err(|e| e.to_string()),
            Err(_) => Err("face detector is unusable after a panic".to_string()),
        };
        DetectionOutcome {
            ticket: self.ticket,
            frame: self.frame,
            result,
        }
    }
}

impl std::fmt::Debug for DetectionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionRequest")
            .field("ticket", &self.ticket)
            .field("frame", &self.frame.index())
            .finish()
    }
}

/// The result of a [`DetectionRequest`], carrying the frame it was run on.
#[derive(Debug)]
pub struct DetectionOutcome {
    pub ticket: Ticket,
    pub frame: Frame,
    pub result: Result<Vec<BoundingBox>, String>,
}
