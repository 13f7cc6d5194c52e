use std::time::Duration;

use crate::capture::acquisition::{AcquireRequest, Acquisition, SourceKind, Target};
use crate::capture::controls::Controls;
use crate::capture::detection_request::{DetectionOutcome, DetectionRequest, Purpose, Ticket};
use crate::capture::face_card::{build_cards, FaceCard};
use crate::capture::session::{DetectorSlot, Session, Ticker};
use crate::detection::domain::face_detector::SharedDetector;
use crate::rendering::domain::drawing_surface::{DrawingSurface, StrokeStyle, TextStyle};
use crate::rendering::infrastructure::display_list::DisplayList;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{
    CARD_JPEG_QUALITY, CROP_PADDING, DETECTION_PERIOD, SAMPLE_VIDEO_URL,
};
use crate::shared::frame::Frame;
use crate::video::domain::media_devices::{CameraConstraints, MediaDevices};
use crate::video::domain::video_source::{ReadyState, VideoSource};

const STATUS_LOADING: &str = "Loading face detection model...";
const STATUS_MODEL_LOADED: &str = "Model loaded successfully!";
const STATUS_MODEL_FAILED: &str = "Error loading model. Please restart the application.";
const STATUS_ACCESSING_CAMERA: &str = "Accessing camera...";
const STATUS_CAMERA_STARTED: &str = "Camera started. Point at people to detect faces.";
const STATUS_CAMERA_FAILED: &str =
    "Error accessing camera. Please ensure camera permissions are granted.";
const STATUS_SAMPLE: &str = "Using sample video. Click \"Capture Faces\" to detect faces.";
const STATUS_DETECT_FAILED: &str = "Error detecting faces.";
const STATUS_CAPTURING: &str = "Capturing faces...";
const STATUS_NO_FACES: &str = "No faces detected. Try again.";
const STATUS_CAPTURE_FAILED: &str = "Error capturing faces. Please try again.";
const STATUS_STOPPED: &str = "Camera stopped. Click \"Start Camera\" to begin again.";

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub detection_period: Duration,
    /// Margin in pixels around each captured face.
    pub crop_padding: u32,
    pub jpeg_quality: u8,
    pub camera: CameraConstraints,
    /// Looping video used when no camera exists.
    pub sample_location: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            detection_period: DETECTION_PERIOD,
            crop_padding: CROP_PADDING,
            jpeg_quality: CARD_JPEG_QUALITY,
            camera: CameraConstraints::default(),
            sample_location: SAMPLE_VIDEO_URL.to_string(),
        }
    }
}

/// Drives a face detection session over a camera feed.
///
/// All state lives here and changes only through these methods, which
/// never block on detection or on opening a device. Work that does block
/// is handed out as a request: an [`AcquireRequest`] whose result goes to
/// [`CaptureOrchestrator::source_acquired`], or a [`DetectionRequest`]
/// whose outcome goes to [`CaptureOrchestrator::complete`]. Two detection
/// requests can be outstanding at most: one overlay pass and one capture.
pub struct CaptureOrchestrator {
    config: CaptureConfig,
    session: Session,
    status: String,
    controls: Controls,
    surface: DisplayList,
    cards: Vec<FaceCard>,
}

impl CaptureOrchestrator {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            session: Session::new(),
            status: STATUS_LOADING.to_string(),
            controls: Controls::disabled(),
            surface: DisplayList::new(),
            cards: Vec::new(),
        }
    }

    /// Reports model download progress while the detector is pending.
    pub fn model_progress(&mut self, downloaded: u64, total: u64) {
        if !matches!(self.session.detector, DetectorSlot::Loading) {
            return;
        }
        self.status = if total > 0 {
            format!(
                "Downloading face detection model... {}%",
                downloaded * 100 / total
            )
        } else {
            format!(
                "Downloading face detection model... {:.1} MB",
                downloaded as f64 / 1_000_000.0
            )
        };
    }

    /// Settles the detector. Only the first call has any effect.
    pub fn model_loaded(&mut self, result: Result<SharedDetector, String>) {
        if !matches!(self.session.detector, DetectorSlot::Loading) {
            log::warn!("Ignoring repeated model load result");
            return;
        }
        match result {
            Ok(detector) => {
                log::info!("Face detector ready");
                self.session.detector = DetectorSlot::Ready(detector);
                self.status = STATUS_MODEL_LOADED.to_string();
            }
            Err(e) => {
                log::error!("Error initializing face detection: {e}");
                self.session.detector = DetectorSlot::Unavailable(e);
                self.status = STATUS_MODEL_FAILED.to_string();
            }
        }
        if self.session.stream.is_none() {
            self.controls = Controls::initial(self.session.detector().is_some());
        }
    }

    /// Begins opening the camera.
    ///
    /// Sets "Accessing camera..." and returns the request to run off this
    /// thread; its result goes to [`CaptureOrchestrator::source_acquired`].
    /// `None` without a ready detector, with a stream already bound or
    /// while another acquisition is pending.
    pub fn begin_camera(&mut self) -> Option<AcquireRequest> {
        if self.session.detector().is_none() {
            log::warn!("Start requested without a detector");
            return None;
        }
        if self.session.stream.is_some() || self.session.acquiring {
            log::debug!("Start requested while a stream is bound or pending");
            return None;
        }

        self.session.acquiring = true;
        self.controls = Controls::acquiring();
        self.status = STATUS_ACCESSING_CAMERA.to_string();
        Some(self.acquire_request(Target::Camera(self.config.camera.clone())))
    }

    /// Applies the result of an [`AcquireRequest`].
    ///
    /// A camera binds and starts the detection loop. A missing camera
    /// yields a follow-up request for the looping sample, which binds
    /// without detection so capture stays user-driven. Results that
    /// arrive after a stop are released and ignored.
    pub fn source_acquired(&mut self, acquisition: Acquisition) -> Option<AcquireRequest> {
        if !self.session.acquiring || acquisition.generation != self.session.generation {
            log::debug!("Discarding {:?} source opened for a stopped session", acquisition.kind);
            if let Ok(mut stream) = acquisition.result {
                stream.stop();
            }
            return None;
        }

        match (acquisition.kind, acquisition.result) {
            (SourceKind::Camera, Ok(stream)) => {
                self.session.acquiring = false;
                self.bind(stream);
                self.status = STATUS_CAMERA_STARTED.to_string();
                self.start_detection();
                None
            }
            (SourceKind::Camera, Err(e)) if e.is_device_missing() => {
                log::warn!("Error accessing camera: {e}; falling back to sample video");
                self.status = STATUS_CAMERA_FAILED.to_string();
                Some(self.acquire_request(Target::Sample(self.config.sample_location.clone())))
            }
            (SourceKind::Camera, Err(e)) => {
                log::error!("Error accessing camera: {e}");
                self.settle_idle(STATUS_CAMERA_FAILED.to_string());
                None
            }
            (SourceKind::Sample, Ok(stream)) => {
                self.session.acquiring = false;
                self.bind(stream);
                self.status = STATUS_SAMPLE.to_string();
                None
            }
            (SourceKind::Sample, Err(e)) => {
                log::error!("Error loading sample video: {e}");
                self.settle_idle(format!("Error loading sample video: {e}"));
                None
            }
        }
    }

    /// Acquires a source on the calling thread, blocking until it opens.
    /// Same transitions as [`begin_camera`](Self::begin_camera) followed by
    /// [`source_acquired`](Self::source_acquired).
    pub fn start_camera(&mut self, devices: &dyn MediaDevices) {
        let mut pending = self.begin_camera();
        while let Some(request) = pending {
            pending = self.source_acquired(request.run(devices));
        }
    }

    /// Moves from idle to detecting and issues a new ticker.
    ///
    /// Returns `false`, changing nothing, when already detecting or when
    /// there is no stream to detect on.
    pub fn start_detection(&mut self) -> bool {
        if self.session.detecting || self.session.stream.is_none() {
            return false;
        }
        self.session.detecting = true;
        let ticker = self.session.issue_ticker(self.config.detection_period);
        log::debug!(
            "Detection loop started (ticker {}, every {:?})",
            ticker.id(),
            ticker.period()
        );
        true
    }

    /// Handles one firing of the ticker.
    ///
    /// Returns the overlay pass to run, or `None` when the tick is skipped:
    /// not detecting, no decoded frame yet, or the previous pass is still
    /// running.
    pub fn tick(&mut self) -> Option<DetectionRequest> {
        if !self.session.detecting {
            return None;
        }
        self.size_surface();

        let frame = self.ready_frame()?;
        if self.session.tick_in_flight {
            self.session.dropped_ticks += 1;
            log::debug!(
                "Tick dropped, detection still running ({} so far)",
                self.session.dropped_ticks
            );
            return None;
        }
        let detector = self.session.detector()?.clone();

        self.session.tick_in_flight = true;
        Some(DetectionRequest::new(
            self.ticket(Purpose::Overlay),
            frame,
            detector,
        ))
    }

    /// Starts a one-shot capture over the current frame, independent of
    /// the detection loop.
    pub fn capture(&mut self) -> Option<DetectionRequest> {
        if self.session.capture_in_flight {
            log::debug!("Capture already running");
            return None;
        }
        self.status = STATUS_CAPTURING.to_string();

        let Some(detector) = self.session.detector().cloned() else {
            log::error!("Error capturing faces: detector unavailable");
            self.status = STATUS_CAPTURE_FAILED.to_string();
            return None;
        };
        let Some(frame) = self.ready_frame() else {
            log::error!("Error capturing faces: no video frame available");
            self.status = STATUS_CAPTURE_FAILED.to_string();
            return None;
        };

        self.session.capture_in_flight = true;
        Some(DetectionRequest::new(
            self.ticket(Purpose::Capture),
            frame,
            detector,
        ))
    }

    /// Applies the result of a request handed out by `tick` or `capture`.
    pub fn complete(&mut self, outcome: DetectionOutcome) {
        if outcome.ticket.generation != self.session.generation {
            log::debug!("Discarding {:?} result from a stopped session", outcome.ticket.purpose);
            return;
        }
        match outcome.ticket.purpose {
            Purpose::Overlay => {
                self.session.tick_in_flight = false;
                self.apply_overlay(&outcome.frame, outcome.result);
            }
            Purpose::Capture => {
                self.session.capture_in_flight = false;
                self.apply_capture(&outcome.frame, outcome.result);
            }
        }
    }

    /// Stops detection and releases the camera. Safe in any state.
    ///
    /// A pending acquisition is abandoned; its source is released when it
    /// arrives. With a failed model and nothing to release, the model
    /// error stays on screen.
    pub fn stop(&mut self) {
        self.session.ticker = None;
        self.session.detecting = false;
        let released = self.session.release_stream();
        if released {
            log::info!("Camera released");
        }
        let abandoned = std::mem::take(&mut self.session.acquiring);
        self.surface.clear();
        self.session.generation += 1;
        self.session.tick_in_flight = false;
        self.session.capture_in_flight = false;
        self.controls = Controls::initial(self.session.detector().is_some());

        let model_failed = matches!(self.session.detector, DetectorSlot::Unavailable(_));
        if !(model_failed && !released && !abandoned) {
            self.status = STATUS_STOPPED.to_string();
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn surface(&self) -> &DisplayList {
        &self.surface
    }

    pub fn cards(&self) -> &[FaceCard] {
        &self.cards
    }

    pub fn is_detecting(&self) -> bool {
        self.session.detecting
    }

    pub fn ticker(&self) -> Option<Ticker> {
        self.session.ticker
    }

    pub fn stream(&self) -> Option<&dyn VideoSource> {
        self.session.stream.as_deref()
    }

    pub fn dropped_ticks(&self) -> u64 {
        self.session.dropped_ticks
    }

    fn acquire_request(&self, target: Target) -> AcquireRequest {
        AcquireRequest {
            generation: self.session.generation,
            target,
        }
    }

    fn settle_idle(&mut self, status: String) {
        self.session.acquiring = false;
        self.controls = Controls::initial(self.session.detector().is_some());
        self.status = status;
    }

    fn bind(&mut self, stream: Box<dyn VideoSource>) {
        self.session.stream = Some(stream);
        self.size_surface();
        self.controls = Controls::streaming();
    }

    /// Matches the surface to the stream once its dimensions are known.
    fn size_surface(&mut self) {
        let Some(metadata) = self.session.stream.as_ref().and_then(|s| s.metadata()) else {
            return;
        };
        if self.surface.size() != (metadata.width, metadata.height) {
            self.surface.resize(metadata.width, metadata.height);
        }
    }

    fn ready_frame(&self) -> Option<Frame> {
        let stream = self.session.stream.as_ref()?;
        if stream.ready_state() < ReadyState::HaveEnoughData {
            return None;
        }
        stream.current_frame()
    }

    fn ticket(&self, purpose: Purpose) -> Ticket {
        Ticket {
            generation: self.session.generation,
            purpose,
        }
    }

    fn apply_overlay(&mut self, frame: &Frame, result: Result<Vec<BoundingBox>, String>) {
        let faces = match result {
            Ok(faces) => faces,
            Err(e) => {
                log::error!("Error detecting faces: {e}");
                self.status = STATUS_DETECT_FAILED.to_string();
                return;
            }
        };

        let width = match self.surface.size() {
            (0, _) => frame.width(),
            (w, _) => w,
        };
        let stroke = StrokeStyle::default();
        let text = TextStyle::default();

        self.surface.clear();
        self.surface.draw_frame(frame);
        for face in &faces {
            self.surface.stroke_rect(face, &stroke);
            let (x, y) = face.label_anchor();
            let label = format!("Face {}", face.horizontal_percent(width));
            self.surface.fill_text(&label, x, y, &text);
        }

        if !faces.is_empty() {
            self.status = format!("Detected {}", count_faces(faces.len()));
        }
    }

    fn apply_capture(&mut self, frame: &Frame, result: Result<Vec<BoundingBox>, String>) {
        let faces = match result {
            Ok(faces) => faces,
            Err(e) => {
                log::error!("Error capturing faces: {e}");
                self.status = STATUS_CAPTURE_FAILED.to_string();
                return;
            }
        };
        if faces.is_empty() {
            self.status = STATUS_NO_FACES.to_string();
            return;
        }

        match build_cards(frame, &faces, self.config.crop_padding, self.config.jpeg_quality) {
            Ok(cards) => {
                log::info!("Captured {} face card(s)", cards.len());
                self.cards = cards;
                self.status = format!("Captured {}", count_faces(faces.len()));
            }
            Err(e) => {
                log::error!("Error capturing faces: {e}");
                self.status = STATUS_CAPTURE_FAILED.to_string();
            }
        }
    }
}

fn count_faces(n: usize) -> String {
    if n == 1 {
        "1 face".to_string()
    } else {
        format!("{n} faces")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::detection::domain::face_detector::{share, FaceDetector};
    use crate::rendering::infrastructure::display_list::DrawCommand;
    use crate::shared::video_metadata::VideoMetadata;
    use crate::video::domain::media_devices::CameraError;
    use crate::video::domain::video_source::TrackState;

    // --- Stubs ---

    struct StubDetector {
        boxes: Arc<Mutex<Vec<BoundingBox>>>,
        fail: Arc<AtomicBool>,
    }

    impl FaceDetector for StubDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err("inference failed".into());
            }
            Ok(self.boxes.lock().unwrap().clone())
        }
    }

    struct DetectorHandle {
        boxes: Arc<Mutex<Vec<BoundingBox>>>,
        fail: Arc<AtomicBool>,
    }

    impl DetectorHandle {
        fn returns(&self, boxes: Vec<BoundingBox>) {
            *self.boxes.lock().unwrap() = boxes;
        }

        fn fails(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }
    }

    fn stub_detector() -> (SharedDetector, DetectorHandle) {
        let boxes = Arc::new(Mutex::new(Vec::new()));
        let fail = Arc::new(AtomicBool::new(false));
        let detector = share(Box::new(StubDetector {
            boxes: boxes.clone(),
            fail: fail.clone(),
        }));
        (detector, DetectorHandle { boxes, fail })
    }

    struct StubSource {
        ready: Arc<AtomicBool>,
        stopped: Arc<AtomicBool>,
        looping: bool,
    }

    impl VideoSource for StubSource {
        fn metadata(&self) -> Option<VideoMetadata> {
            Some(VideoMetadata {
                width: 320,
                height: 240,
                fps: 30.0,
                source: "stub".into(),
            })
        }

        fn ready_state(&self) -> ReadyState {
            if self.stopped.load(Ordering::SeqCst) {
                ReadyState::HaveNothing
            } else if self.ready.load(Ordering::SeqCst) {
                ReadyState::HaveEnoughData
            } else {
                ReadyState::HaveMetadata
            }
        }

        fn current_frame(&self) -> Option<Frame> {
            if self.ready_state() == ReadyState::HaveEnoughData {
                Some(Frame::black(320, 240))
            } else {
                None
            }
        }

        fn track_states(&self) -> Vec<TrackState> {
            if self.stopped.load(Ordering::SeqCst) {
                vec![TrackState::Ended]
            } else {
                vec![TrackState::Live]
            }
        }

        fn stop(&mut self) {
            self.stopped.store(true, Ordering::SeqCst);
        }

        fn is_looping(&self) -> bool {
            self.looping
        }
    }

    enum CameraBehaviour {
        Works,
        Missing,
        Denied,
    }

    struct StubDevices {
        camera: CameraBehaviour,
        sample_works: bool,
        ready: Arc<AtomicBool>,
        stopped: Arc<AtomicBool>,
        sample_opens: AtomicUsize,
    }

    impl StubDevices {
        fn new(camera: CameraBehaviour) -> Self {
            Self {
                camera,
                sample_works: true,
                ready: Arc::new(AtomicBool::new(true)),
                stopped: Arc::new(AtomicBool::new(false)),
                sample_opens: AtomicUsize::new(0),
            }
        }

        fn source(&self, looping: bool) -> Box<dyn VideoSource> {
            Box::new(StubSource {
                ready: self.ready.clone(),
                stopped: self.stopped.clone(),
                looping,
            })
        }
    }

    impl MediaDevices for StubDevices {
        fn request_camera(
            &self,
            _constraints: &CameraConstraints,
        ) -> Result<Box<dyn VideoSource>, CameraError> {
            match self.camera {
                CameraBehaviour::Works => Ok(self.source(false)),
                CameraBehaviour::Missing => Err(CameraError::NotFound),
                CameraBehaviour::Denied => Err(CameraError::PermissionDenied),
            }
        }

        fn open_looping(&self, _location: &str) -> Result<Box<dyn VideoSource>, CameraError> {
            self.sample_opens.fetch_add(1, Ordering::SeqCst);
            if self.sample_works {
                Ok(self.source(true))
            } else {
                Err(CameraError::Open("sample unreachable".into()))
            }
        }
    }

    fn loaded() -> (CaptureOrchestrator, DetectorHandle) {
        let (detector, handle) = stub_detector();
        let mut orchestrator = CaptureOrchestrator::new(CaptureConfig::default());
        orchestrator.model_loaded(Ok(detector));
        (orchestrator, handle)
    }

    fn streaming(devices: &StubDevices) -> (CaptureOrchestrator, DetectorHandle) {
        let (mut orchestrator, handle) = loaded();
        orchestrator.start_camera(devices);
        (orchestrator, handle)
    }

    fn run_tick(orchestrator: &mut CaptureOrchestrator) {
        let request = orchestrator.tick().expect("tick should request detection");
        orchestrator.complete(request.run());
    }

    fn run_capture(orchestrator: &mut CaptureOrchestrator) {
        let request = orchestrator.capture().expect("capture should request detection");
        orchestrator.complete(request.run());
    }

    fn two_faces() -> Vec<BoundingBox> {
        vec![
            BoundingBox::new(10.0, 10.0, 50.0, 60.0),
            BoundingBox::new(200.0, 30.0, 40.0, 40.0),
        ]
    }

    // --- Model acquisition ---

    #[test]
    fn test_initial_state_waits_for_model() {
        let orchestrator = CaptureOrchestrator::new(CaptureConfig::default());
        assert_eq!(orchestrator.status(), "Loading face detection model...");
        assert_eq!(orchestrator.controls(), Controls::disabled());
        assert!(!orchestrator.is_detecting());
        assert!(orchestrator.stream().is_none());
    }

    #[test]
    fn test_model_loaded_enables_start() {
        let (orchestrator, _) = loaded();
        assert_eq!(orchestrator.status(), "Model loaded successfully!");
        assert_eq!(orchestrator.controls(), Controls::initial(true));
    }

    #[test]
    fn test_model_failure_is_terminal() {
        let mut orchestrator = CaptureOrchestrator::new(CaptureConfig::default());
        orchestrator.model_loaded(Err("network down".into()));
        assert_eq!(
            orchestrator.status(),
            "Error loading model. Please restart the application."
        );
        assert!(!orchestrator.controls().start);

        // A later success cannot revive detection.
        let (detector, _) = stub_detector();
        orchestrator.model_loaded(Ok(detector));
        assert!(!orchestrator.controls().start);

        orchestrator.start_camera(&StubDevices::new(CameraBehaviour::Works));
        assert!(orchestrator.stream().is_none());

        orchestrator.stop();
        assert!(!orchestrator.controls().start);
        assert_eq!(
            orchestrator.status(),
            "Error loading model. Please restart the application."
        );
    }

    #[test]
    fn test_model_progress_reported_only_while_loading() {
        let mut orchestrator = CaptureOrchestrator::new(CaptureConfig::default());
        orchestrator.model_progress(50, 200);
        assert_eq!(orchestrator.status(), "Downloading face detection model... 25%");

        let (detector, _) = stub_detector();
        orchestrator.model_loaded(Ok(detector));
        orchestrator.model_progress(200, 200);
        assert_eq!(orchestrator.status(), "Model loaded successfully!");
    }

    #[test]
    fn test_start_before_model_does_nothing() {
        let mut orchestrator = CaptureOrchestrator::new(CaptureConfig::default());
        orchestrator.start_camera(&StubDevices::new(CameraBehaviour::Works));
        assert!(orchestrator.stream().is_none());
        assert!(!orchestrator.is_detecting());
    }

    // --- Video acquisition ---

    #[test]
    fn test_camera_start_begins_detection() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        let (orchestrator, _) = streaming(&devices);

        assert_eq!(
            orchestrator.status(),
            "Camera started. Point at people to detect faces."
        );
        assert_eq!(orchestrator.controls(), Controls::streaming());
        assert!(orchestrator.is_detecting());
        assert_eq!(orchestrator.surface().size(), (320, 240));
        let ticker = orchestrator.ticker().unwrap();
        assert_eq!(ticker.period(), Duration::from_millis(100));
        assert!(!orchestrator.stream().unwrap().is_looping());
    }

    #[test]
    fn test_missing_camera_falls_back_to_sample() {
        let devices = StubDevices::new(CameraBehaviour::Missing);
        let (orchestrator, _) = streaming(&devices);

        assert_eq!(devices.sample_opens.load(Ordering::SeqCst), 1);
        assert_eq!(
            orchestrator.status(),
            "Using sample video. Click \"Capture Faces\" to detect faces."
        );
        assert_eq!(orchestrator.controls(), Controls::streaming());
        assert!(orchestrator.stream().unwrap().is_looping());
        assert_eq!(orchestrator.surface().size(), (320, 240));
        assert!(!orchestrator.is_detecting());
        assert!(orchestrator.ticker().is_none());
    }

    #[test]
    fn test_sample_status_survives_ticks() {
        let devices = StubDevices::new(CameraBehaviour::Missing);
        let (mut orchestrator, detector) = streaming(&devices);
        detector.returns(two_faces());

        assert!(orchestrator.tick().is_none());
        assert_eq!(
            orchestrator.status(),
            "Using sample video. Click \"Capture Faces\" to detect faces."
        );

        run_capture(&mut orchestrator);
        assert_eq!(orchestrator.cards().len(), 2);
        assert_eq!(orchestrator.status(), "Captured 2 faces");
    }

    #[test]
    fn test_accessing_camera_shown_while_pending() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        let (mut orchestrator, _) = loaded();

        let request = orchestrator.begin_camera().unwrap();
        assert_eq!(orchestrator.status(), "Accessing camera...");
        assert_eq!(orchestrator.controls(), Controls::acquiring());
        assert!(orchestrator.stream().is_none());
        assert!(orchestrator.begin_camera().is_none());

        assert!(orchestrator.source_acquired(request.run(&devices)).is_none());
        assert_eq!(
            orchestrator.status(),
            "Camera started. Point at people to detect faces."
        );
        assert!(orchestrator.is_detecting());
    }

    #[test]
    fn test_missing_camera_requests_sample() {
        let devices = StubDevices::new(CameraBehaviour::Missing);
        let (mut orchestrator, _) = loaded();

        let camera = orchestrator.begin_camera().unwrap();
        let sample = orchestrator.source_acquired(camera.run(&devices)).unwrap();
        assert_eq!(
            sample.target,
            Target::Sample(CaptureConfig::default().sample_location)
        );
        assert_eq!(
            orchestrator.status(),
            "Error accessing camera. Please ensure camera permissions are granted."
        );
        assert_eq!(orchestrator.controls(), Controls::acquiring());
        assert_eq!(devices.sample_opens.load(Ordering::SeqCst), 0);

        assert!(orchestrator.source_acquired(sample.run(&devices)).is_none());
        assert!(orchestrator.stream().unwrap().is_looping());
    }

    #[test]
    fn test_source_arriving_after_stop_is_released() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        let (mut orchestrator, _) = loaded();

        let request = orchestrator.begin_camera().unwrap();
        orchestrator.stop();
        assert_eq!(orchestrator.controls(), Controls::initial(true));

        assert!(orchestrator.source_acquired(request.run(&devices)).is_none());
        assert!(devices.stopped.load(Ordering::SeqCst));
        assert!(orchestrator.stream().is_none());
        assert!(!orchestrator.is_detecting());
        assert_eq!(
            orchestrator.status(),
            "Camera stopped. Click \"Start Camera\" to begin again."
        );
    }

    #[test]
    fn test_denied_camera_stays_idle_and_retryable() {
        let devices = StubDevices::new(CameraBehaviour::Denied);
        let (orchestrator, _) = streaming(&devices);

        assert_eq!(
            orchestrator.status(),
            "Error accessing camera. Please ensure camera permissions are granted."
        );
        assert_eq!(devices.sample_opens.load(Ordering::SeqCst), 0);
        assert!(orchestrator.stream().is_none());
        assert!(!orchestrator.is_detecting());
        assert!(orchestrator.controls().start);
    }

    #[test]
    fn test_sample_failure_stays_idle() {
        let mut devices = StubDevices::new(CameraBehaviour::Missing);
        devices.sample_works = false;
        let (orchestrator, _) = streaming(&devices);

        assert!(orchestrator.status().starts_with("Error loading sample video"));
        assert!(orchestrator.stream().is_none());
        assert!(orchestrator.controls().start);
    }

    // --- Detection loop ---

    #[test]
    fn test_start_when_detecting_is_noop() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        let (mut orchestrator, _) = streaming(&devices);
        let before = orchestrator.ticker();

        assert!(!orchestrator.start_detection());
        assert!(orchestrator.is_detecting());
        assert_eq!(orchestrator.ticker(), before);
    }

    #[test]
    fn test_start_detection_without_stream_is_noop() {
        let (mut orchestrator, _) = loaded();
        assert!(!orchestrator.start_detection());
        assert!(orchestrator.ticker().is_none());
    }

    #[test]
    fn test_tick_skipped_until_frame_ready() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        devices.ready.store(false, Ordering::SeqCst);
        let (mut orchestrator, _) = streaming(&devices);

        assert!(orchestrator.tick().is_none());
        assert_eq!(orchestrator.dropped_ticks(), 0);

        devices.ready.store(true, Ordering::SeqCst);
        assert!(orchestrator.tick().is_some());
    }

    #[test]
    fn test_tick_while_idle_is_none() {
        let (mut orchestrator, _) = loaded();
        assert!(orchestrator.tick().is_none());
    }

    #[test]
    fn test_overlapping_tick_is_dropped() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        let (mut orchestrator, _) = streaming(&devices);

        let pending = orchestrator.tick().unwrap();
        assert!(orchestrator.tick().is_none());
        assert!(orchestrator.tick().is_none());
        assert_eq!(orchestrator.dropped_ticks(), 2);

        orchestrator.complete(pending.run());
        assert!(orchestrator.tick().is_some());
    }

    #[test]
    fn test_tick_draws_boxes_and_labels_in_detector_order() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        let (mut orchestrator, detector) = streaming(&devices);
        detector.returns(two_faces());

        run_tick(&mut orchestrator);

        let surface = orchestrator.surface();
        assert!(matches!(surface.commands()[0], DrawCommand::Frame(_)));
        assert_eq!(surface.rects().copied().collect::<Vec<_>>(), two_faces());
        // 10/320 rounds to 3%, 200/320 to 63%.
        assert_eq!(surface.labels().collect::<Vec<_>>(), vec!["Face 3", "Face 63"]);
        assert_eq!(orchestrator.status(), "Detected 2 faces");
    }

    #[test]
    fn test_label_placement_near_top_edge() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        let (mut orchestrator, detector) = streaming(&devices);
        detector.returns(vec![BoundingBox::new(0.0, 5.0, 40.0, 40.0)]);

        run_tick(&mut orchestrator);

        let anchors: Vec<(f32, f32)> = orchestrator
            .surface()
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillText { x, y, .. } => Some((*x, *y)),
                _ => None,
            })
            .collect();
        assert_eq!(anchors, vec![(0.0, 25.0)]);
        assert_eq!(orchestrator.status(), "Detected 1 face");
    }

    #[test]
    fn test_zero_faces_keeps_previous_status() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        let (mut orchestrator, detector) = streaming(&devices);

        detector.returns(two_faces());
        run_tick(&mut orchestrator);
        assert_eq!(orchestrator.status(), "Detected 2 faces");

        detector.returns(vec![]);
        run_tick(&mut orchestrator);
        assert_eq!(orchestrator.status(), "Detected 2 faces");
        // The frame is still redrawn without boxes.
        assert_eq!(orchestrator.surface().commands().len(), 1);
    }

    #[test]
    fn test_detection_error_keeps_loop_running() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        let (mut orchestrator, detector) = streaming(&devices);

        detector.fails(true);
        run_tick(&mut orchestrator);
        assert_eq!(orchestrator.status(), "Error detecting faces.");
        assert!(orchestrator.is_detecting());

        detector.fails(false);
        detector.returns(two_faces());
        run_tick(&mut orchestrator);
        assert_eq!(orchestrator.status(), "Detected 2 faces");
    }

    // --- Capture ---

    #[test]
    fn test_capture_builds_padded_cards() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        let (mut orchestrator, detector) = streaming(&devices);
        detector.returns(two_faces());

        run_capture(&mut orchestrator);

        let cards = orchestrator.cards();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].label, "Face 1");
        assert_eq!(cards[1].label, "Face 2");
        assert_eq!((cards[0].width, cards[0].height), (90, 100));
        assert_eq!((cards[1].width, cards[1].height), (80, 80));
        assert_eq!(orchestrator.status(), "Captured 2 faces");
    }

    #[test]
    fn test_capture_with_no_faces_keeps_cards() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        let (mut orchestrator, detector) = streaming(&devices);
        detector.returns(two_faces());
        run_capture(&mut orchestrator);
        let before = orchestrator.cards().to_vec();

        detector.returns(vec![]);
        run_capture(&mut orchestrator);

        assert_eq!(orchestrator.status(), "No faces detected. Try again.");
        assert_eq!(orchestrator.cards(), before.as_slice());
    }

    #[test]
    fn test_capture_replaces_previous_cards() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        let (mut orchestrator, detector) = streaming(&devices);
        detector.returns(two_faces());
        run_capture(&mut orchestrator);

        detector.returns(vec![BoundingBox::new(100.0, 100.0, 30.0, 30.0)]);
        run_capture(&mut orchestrator);

        assert_eq!(orchestrator.cards().len(), 1);
        assert_eq!(orchestrator.cards()[0].label, "Face 1");
        assert_eq!(orchestrator.status(), "Captured 1 face");
    }

    #[test]
    fn test_capture_error_reported() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        let (mut orchestrator, detector) = streaming(&devices);
        detector.fails(true);

        run_capture(&mut orchestrator);
        assert_eq!(orchestrator.status(), "Error capturing faces. Please try again.");
        assert!(orchestrator.cards().is_empty());
    }

    #[test]
    fn test_capture_without_stream_fails() {
        let (mut orchestrator, _) = loaded();
        assert!(orchestrator.capture().is_none());
        assert_eq!(orchestrator.status(), "Error capturing faces. Please try again.");
    }

    #[test]
    fn test_capture_runs_alongside_tick() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        let (mut orchestrator, detector) = streaming(&devices);
        detector.returns(two_faces());

        let tick = orchestrator.tick().unwrap();
        let capture = orchestrator.capture().unwrap();
        assert!(orchestrator.capture().is_none());

        orchestrator.complete(capture.run());
        orchestrator.complete(tick.run());
        assert_eq!(orchestrator.cards().len(), 2);
        assert_eq!(orchestrator.surface().rects().count(), 2);
    }

    // --- Stop ---

    #[test]
    fn test_stop_releases_everything() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        let (mut orchestrator, detector) = streaming(&devices);
        detector.returns(two_faces());
        run_tick(&mut orchestrator);

        orchestrator.stop();

        assert!(devices.stopped.load(Ordering::SeqCst));
        assert!(orchestrator.stream().is_none());
        assert!(orchestrator.ticker().is_none());
        assert!(!orchestrator.is_detecting());
        assert!(orchestrator.surface().is_empty());
        assert_eq!(orchestrator.controls(), Controls::initial(true));
        assert_eq!(
            orchestrator.status(),
            "Camera stopped. Click \"Start Camera\" to begin again."
        );
    }

    #[test]
    fn test_stop_when_idle_is_safe() {
        let (mut orchestrator, _) = loaded();
        orchestrator.stop();
        orchestrator.stop();
        assert!(orchestrator.stream().is_none());
        assert_eq!(orchestrator.controls(), Controls::initial(true));
    }

    #[test]
    fn test_stop_keeps_captured_cards() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        let (mut orchestrator, detector) = streaming(&devices);
        detector.returns(two_faces());
        run_capture(&mut orchestrator);

        orchestrator.stop();
        assert_eq!(orchestrator.cards().len(), 2);
    }

    #[test]
    fn test_results_after_stop_are_discarded() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        let (mut orchestrator, detector) = streaming(&devices);
        detector.returns(two_faces());

        let tick = orchestrator.tick().unwrap();
        let capture = orchestrator.capture().unwrap();
        orchestrator.stop();
        orchestrator.complete(tick.run());
        orchestrator.complete(capture.run());

        assert!(orchestrator.surface().is_empty());
        assert!(orchestrator.cards().is_empty());
        assert_eq!(
            orchestrator.status(),
            "Camera stopped. Click \"Start Camera\" to begin again."
        );
    }

    #[test]
    fn test_restart_issues_new_ticker() {
        let devices = StubDevices::new(CameraBehaviour::Works);
        let (mut orchestrator, _) = streaming(&devices);
        let first = orchestrator.ticker().unwrap();

        orchestrator.stop();
        devices.stopped.store(false, Ordering::SeqCst);
        orchestrator.start_camera(&devices);

        let second = orchestrator.ticker().unwrap();
        assert_ne!(first.id(), second.id());
        assert!(orchestrator.tick().is_some());
    }
}
