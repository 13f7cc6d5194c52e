use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::{after, never, select, tick, Receiver};

use facecap_core::capture::acquisition::{self, AcquireRequest, Acquisition};
use facecap_core::capture::detection_request::{DetectionOutcome, Purpose};
use facecap_core::capture::detection_worker::DetectionWorker;
use facecap_core::capture::face_card::FaceCard;
use facecap_core::capture::orchestrator::{CaptureConfig, CaptureOrchestrator};
use facecap_core::detection::infrastructure::execution_provider::Acceleration;
use facecap_core::detection::infrastructure::model_loader::{self, ModelLoadMessage, ModelOptions};
use facecap_core::shared::constants::{
    DEFAULT_CONFIDENCE, IDEAL_FRAME_RATE, IDEAL_HEIGHT, IDEAL_WIDTH, MAX_FACES,
};
use facecap_core::video::domain::media_devices::CameraConstraints;
use facecap_core::video::domain::video_source::TrackState;
use facecap_core::video::infrastructure::ffmpeg_media_devices::FfmpegMediaDevices;

/// Live face detection on a webcam, reported on the terminal.
#[derive(Parser)]
#[command(name = "facecap")]
struct Cli {
    /// ONNX face detector to load instead of resolving the default model.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Where to download the default model when it is not cached.
    /// Overrides FACECAP_MODEL_URL.
    #[arg(long)]
    model_url: Option<String>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Maximum faces reported per frame.
    #[arg(long, default_value_t = MAX_FACES)]
    max_faces: usize,

    /// Inference backend: auto, required or cpu.
    #[arg(long, default_value = "auto")]
    acceleration: Acceleration,

    /// Capture device (path, index or name); platform default otherwise.
    #[arg(long)]
    device: Option<String>,

    /// Preferred capture width.
    #[arg(long, default_value_t = IDEAL_WIDTH)]
    width: u32,

    /// Preferred capture height.
    #[arg(long, default_value_t = IDEAL_HEIGHT)]
    height: u32,

    /// Preferred capture frame rate.
    #[arg(long, default_value_t = IDEAL_FRAME_RATE)]
    fps: u32,

    /// Video to loop when no camera is present (file path or URL).
    #[arg(long)]
    sample: Option<String>,

    /// Take a face capture this many seconds after the camera starts.
    #[arg(long)]
    capture_after: Option<f64>,

    /// Stop after this many seconds; runs until the stream ends otherwise.
    #[arg(long)]
    duration: Option<f64>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let timing = Timing {
        capture_after: seconds("Capture delay", cli.capture_after)?,
        duration: seconds("Duration", cli.duration)?,
    };

    let mut config = CaptureConfig {
        camera: CameraConstraints {
            ideal_width: cli.width,
            ideal_height: cli.height,
            ideal_frame_rate: cli.fps,
            device: cli.device.clone(),
            ..CameraConstraints::default()
        },
        ..CaptureConfig::default()
    };
    if let Some(ref sample) = cli.sample {
        config.sample_location = sample.clone();
    }

    let mut options = ModelOptions {
        path: cli.model.clone(),
        confidence: cli.confidence,
        max_faces: cli.max_faces,
        acceleration: cli.acceleration,
        ..ModelOptions::default()
    };
    if cli.model_url.is_some() {
        options.url = cli.model_url.clone();
    }

    let mut session = Headless::new(CaptureOrchestrator::new(config));
    session.run(model_loader::spawn(options), &timing)
}

/// Optional timers armed once a source is bound.
struct Timing {
    capture_after: Option<Duration>,
    duration: Option<Duration>,
}

enum Event {
    Model(Option<ModelLoadMessage>),
    Acquired(Option<Acquisition>),
    Tick,
    Outcome(Option<DetectionOutcome>),
    Capture,
    Deadline,
}

/// The orchestrator plus the channels that feed it.
struct Headless {
    orchestrator: CaptureOrchestrator,
    worker: DetectionWorker,
    devices: Arc<FfmpegMediaDevices>,
    acquisitions: Receiver<Acquisition>,
    last_status: String,
    ticker_id: Option<u64>,
    ticks: Receiver<Instant>,
}

impl Headless {
    fn new(orchestrator: CaptureOrchestrator) -> Self {
        let mut headless = Self {
            orchestrator,
            worker: DetectionWorker::spawn(),
            devices: Arc::new(FfmpegMediaDevices::new()),
            acquisitions: never(),
            last_status: String::new(),
            ticker_id: None,
            ticks: never(),
        };
        headless.report_status();
        headless
    }

    fn run(
        &mut self,
        mut models: Receiver<ModelLoadMessage>,
        timing: &Timing,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut capture_timer: Receiver<Instant> = never();
        let mut deadline: Receiver<Instant> = never();

        loop {
            self.sync_ticker();
            let ticks = self.ticks.clone();
            let acquisitions = self.acquisitions.clone();
            let outcomes = self.worker.outcomes().clone();

            let event = select! {
                recv(models) -> message => Event::Model(message.ok()),
                recv(acquisitions) -> acquired => Event::Acquired(acquired.ok()),
                recv(ticks) -> _ => Event::Tick,
                recv(outcomes) -> outcome => Event::Outcome(outcome.ok()),
                recv(capture_timer) -> _ => Event::Capture,
                recv(deadline) -> _ => Event::Deadline,
            };

            match event {
                Event::Model(None) => models = never(),
                Event::Model(Some(ModelLoadMessage::Progress(downloaded, total))) => {
                    self.orchestrator.model_progress(downloaded, total);
                }
                Event::Model(Some(ModelLoadMessage::Loaded(detector))) => {
                    self.orchestrator.model_loaded(Ok(detector));
                    self.report_status();
                    let request = self.orchestrator.begin_camera();
                    self.acquire(request);
                }
                Event::Acquired(None) => {
                    self.acquisitions = never();
                    return Err("video source could not be opened".into());
                }
                Event::Acquired(Some(acquired)) => {
                    let next = self.orchestrator.source_acquired(acquired);
                    if next.is_some() {
                        self.report_status();
                        self.acquire(next);
                    } else if self.orchestrator.stream().is_none() {
                        self.report_status();
                        return Err(self.orchestrator.status().into());
                    } else {
                        self.acquisitions = never();
                        if let Some(delay) = timing.capture_after {
                            capture_timer = after(delay);
                        }
                        if let Some(limit) = timing.duration {
                            deadline = after(limit);
                        }
                    }
                }
                Event::Model(Some(ModelLoadMessage::Failed(e))) => {
                    self.orchestrator.model_loaded(Err(e));
                    self.report_status();
                    return Err(self.orchestrator.status().into());
                }
                Event::Tick => {
                    if let Some(request) = self.orchestrator.tick() {
                        self.worker.submit(request);
                    }
                }
                Event::Outcome(None) => return Err("detection worker stopped".into()),
                Event::Outcome(Some(outcome)) => {
                    let captured = outcome.ticket.purpose == Purpose::Capture;
                    self.orchestrator.complete(outcome);
                    if captured {
                        self.report_status();
                        self.print_cards();
                    }
                }
                Event::Capture => {
                    capture_timer = never();
                    if let Some(request) = self.orchestrator.capture() {
                        self.worker.submit(request);
                    }
                }
                Event::Deadline => break,
            }

            self.report_status();
            if self.stream_ended() {
                log::info!("Video stream ended");
                break;
            }
        }

        self.orchestrator.stop();
        self.report_status();
        if self.orchestrator.dropped_ticks() > 0 {
            log::info!(
                "{} ticks dropped while detection was busy",
                self.orchestrator.dropped_ticks()
            );
        }
        Ok(())
    }

    fn acquire(&mut self, request: Option<AcquireRequest>) {
        self.acquisitions = match request {
            Some(r) => acquisition::spawn(r, self.devices.clone()),
            None => never(),
        };
    }

    /// Keeps the local timer in step with the orchestrator's ticker.
    fn sync_ticker(&mut self) {
        let ticker = self.orchestrator.ticker();
        let id = ticker.map(|t| t.id());
        if id == self.ticker_id {
            return;
        }
        self.ticker_id = id;
        self.ticks = match ticker {
            Some(t) => tick(t.period()),
            None => never(),
        };
    }

    fn stream_ended(&self) -> bool {
        self.orchestrator
            .stream()
            .map(|s| s.track_states().iter().all(|t| *t == TrackState::Ended))
            .unwrap_or(false)
    }

    fn report_status(&mut self) {
        let status = self.orchestrator.status();
        if status != self.last_status {
            eprintln!("{status}");
            self.last_status = status.to_string();
        }
    }

    /// Cards go to stdout so they can be piped apart from status lines.
    fn print_cards(&self) {
        for card in self.orchestrator.cards() {
            println!("{}", card_line(card));
        }
    }
}

fn card_line(card: &FaceCard) -> String {
    format!(
        "{}: {}x{} ({} byte JPEG)",
        card.label,
        card.width,
        card.height,
        card.jpeg.len()
    )
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if cli.max_faces == 0 {
        return Err("Max faces must be at least 1".into());
    }
    if let Some(ref path) = cli.model {
        if !path.exists() {
            return Err(format!("Model file not found: {}", path.display()).into());
        }
    }
    Ok(())
}

/// Converts an optional seconds argument, rejecting negative, NaN and
/// out-of-range values.
fn seconds(name: &str, value: Option<f64>) -> Result<Option<Duration>, Box<dyn std::error::Error>> {
    value
        .map(|secs| {
            Duration::try_from_secs_f64(secs)
                .map_err(|e| format!("{name} must be a non-negative number of seconds, got {secs}: {e}"))
        })
        .transpose()
        .map_err(Into::into)
}
