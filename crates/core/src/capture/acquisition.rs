//! Opening video sources away from the thread that owns the orchestrator.
//!
//! Device negotiation and remote sample fetches can take seconds, so the
//! orchestrator only hands out an [`AcquireRequest`]; whoever runs it sends
//! the resulting [`Acquisition`] back through
//! `CaptureOrchestrator::source_acquired`.
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;

use crate::video::domain::media_devices::{CameraConstraints, CameraError, MediaDevices};
use crate::video::domain::video_source::VideoSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Camera,
    /// The looping pre-recorded fallback.
    Sample,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Camera(CameraConstraints),
    Sample(String),
}

impl Target {
    pub fn kind(&self) -> SourceKind {
        match self {
            Target::Camera(_) => SourceKind::Camera,
            Target::Sample(_) => SourceKind::Sample,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcquireRequest {
    pub generation: u64,
    pub target: Target,
}

impl AcquireRequest {
    /// Opens the target. Blocks until the device or file answers.
    pub fn run(self, devices: &dyn MediaDevices) -> Acquisition {
        let kind = self.target.kind();
        let result = match self.target {
            Target::Camera(ref constraints) => devices.request_camera(constraints),
            Target::Sample(ref location) => devices.open_looping(location),
        };
        Acquisition {
            generation: self.generation,
            kind,
            result,
        }
    }
}

pub struct Acquisition {
    pub generation: u64,
    pub kind: SourceKind,
    pub result: Result<Box<dyn VideoSource>, CameraError>,
}

impl std::fmt::Debug for Acquisition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = match self.result {
            Ok(_) => "Ok".to_string(),
            Err(ref e) => format!("Err({e})"),
        };
        f.debug_struct("Acquisition")
            .field("generation", &self.generation)
            .field("kind", &self.kind)
            .field("result", &result)
            .finish()
    }
}

/// Runs `request` on its own thread.
///
/// The receiver yields exactly one [`Acquisition`], or disconnects without
/// one if the thread could not be started. Dropping the receiver early
/// drops the opened source with it, which releases the device.
pub fn spawn(
    request: AcquireRequest,
    devices: Arc<dyn MediaDevices + Send + Sync>,
) -> Receiver<Acquisition> {
    let (tx, rx) = crossbeam_channel::bounded::<Acquisition>(1);

    let spawned = thread::Builder::new()
        .name("facecap-acquire".into())
        .spawn(move || {
            log::debug!("Opening {:?} source", request.target.kind());
            let _ = tx.send(request.run(devices.as_ref()));
        });
    if let Err(e) = spawned {
        log::error!("Failed to start acquisition thread: {e}");
    }

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::shared::frame::Frame;
    use crate::shared::video_metadata::VideoMetadata;
    use crate::video::domain::video_source::{ReadyState, TrackState};

    struct NullSource;

    impl VideoSource for NullSource {
        fn metadata(&self) -> Option<VideoMetadata> {
            None
        }

        fn ready_state(&self) -> ReadyState {
            ReadyState::HaveNothing
        }

        fn current_frame(&self) -> Option<Frame> {
            None
        }

        fn track_states(&self) -> Vec<TrackState> {
            vec![TrackState::Live]
        }

        fn stop(&mut self) {}

        fn is_looping(&self) -> bool {
            false
        }
    }

    /// Records what was asked for; cameras are always missing.
    #[derive(Default)]
    struct RecordingDevices {
        opened: Mutex<Vec<String>>,
    }

    impl MediaDevices for RecordingDevices {
        fn request_camera(
            &self,
            _constraints: &CameraConstraints,
        ) -> Result<Box<dyn VideoSource>, CameraError> {
            self.opened.lock().unwrap().push("camera".into());
            Err(CameraError::NotFound)
        }

        fn open_looping(&self, location: &str) -> Result<Box<dyn VideoSource>, CameraError> {
            self.opened.lock().unwrap().push(location.into());
            Ok(Box::new(NullSource))
        }
    }

    #[test]
    fn test_run_dispatches_on_target() {
        let devices = RecordingDevices::default();

        let camera = AcquireRequest {
            generation: 3,
            target: Target::Camera(CameraConstraints::default()),
        }
        .run(&devices);
        assert_eq!(camera.generation, 3);
        assert_eq!(camera.kind, SourceKind::Camera);
        assert!(matches!(camera.result, Err(CameraError::NotFound)));

        let sample = AcquireRequest {
            generation: 3,
            target: Target::Sample("loop.mp4".into()),
        }
        .run(&devices);
        assert_eq!(sample.kind, SourceKind::Sample);
        assert!(sample.result.is_ok());

        assert_eq!(*devices.opened.lock().unwrap(), vec!["camera", "loop.mp4"]);
    }

    #[test]
    fn test_spawn_delivers_one_acquisition() {
        let devices = Arc::new(RecordingDevices::default());
        let rx = spawn(
            AcquireRequest {
                generation: 1,
                target: Target::Sample("loop.mp4".into()),
            },
            devices.clone(),
        );

        let acquisition = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(acquisition.kind, SourceKind::Sample);
        assert!(acquisition.result.is_ok());
        // The thread is done; nothing else follows.
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_err());
    }
}
