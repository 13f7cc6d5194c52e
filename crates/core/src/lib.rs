//! Live face detection over a camera feed.
//!
//! [`capture::orchestrator::CaptureOrchestrator`] owns the whole session:
//! it acquires the detector and the video source, drives the periodic
//! overlay pass and materialises cropped face cards on demand. Front ends
//! (the CLI and the desktop app) only forward timer ticks and detection
//! outcomes into it and render what it exposes.

pub mod capture;
pub mod detection;
pub mod rendering;
pub mod shared;
pub mod video;
