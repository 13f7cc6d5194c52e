use std::path::PathBuf;
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use crate::detection::domain::face_detector::{share, SharedDetector};
use crate::detection::infrastructure::execution_provider::Acceleration;
use crate::detection::infrastructure::model_resolver;
use crate::detection::infrastructure::onnx_blazeface_detector::OnnxBlazefaceDetector;
use crate::shared::constants::{
    BLAZEFACE_MODEL_NAME, DEFAULT_CONFIDENCE, MAX_FACES, MODEL_URL_ENV,
};

/// Where the detector model comes from and how it is configured.
#[derive(Debug, Clone)]
pub struct ModelOptions {
    pub name: String,
    pub url: Option<String>,
    pub bundled_dir: Option<PathBuf>,
    /// Explicit model file; skips resolution entirely when set.
    pub path: Option<PathBuf>,
    pub confidence: f64,
    pub max_faces: usize,
    pub acceleration: Acceleration,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            name: BLAZEFACE_MODEL_NAME.to_string(),
            url: std::env::var(MODEL_URL_ENV).ok().filter(|u| !u.is_empty()),
            bundled_dir: Some(PathBuf::from("models")),
            path: None,
            confidence: DEFAULT_CONFIDENCE,
            max_faces: MAX_FACES,
            acceleration: Acceleration::Auto,
        }
    }
}

pub enum ModelLoadMessage {
    Progress(u64, u64),
    Loaded(SharedDetector),
    Failed(String),
}

impl std::fmt::Debug for ModelLoadMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Progress(dl, total) => write!(f, "Progress({dl}, {total})"),
            Self::Loaded(_) => write!(f, "Loaded"),
            Self::Failed(e) => write!(f, "Failed({e})"),
        }
    }
}

/// Resolve and load the detector on a background thread.
///
/// The receiver yields any number of `Progress` messages followed by
/// exactly one `Loaded` or `Failed`. There is no retry.
pub fn spawn(options: ModelOptions) -> Receiver<ModelLoadMessage> {
    let (tx, rx) = crossbeam_channel::unbounded::<ModelLoadMessage>();

    thread::spawn(move || {
        let message = match load(&options, &tx) {
            Ok(detector) => ModelLoadMessage::Loaded(detector),
            Err(e) => {
                log::error!("Error initializing face detection: {e}");
                ModelLoadMessage::Failed(e.to_string())
            }
        };
        let _ = tx.send(message);
    });

    rx
}

fn load(
    options: &ModelOptions,
    tx: &Sender<ModelLoadMessage>,
) -> Result<SharedDetector, Box<dyn std::error::Error>> {
    let model_path = match options.path {
        Some(ref path) => path.clone(),
        None => {
            log::info!("Resolving model: {}", options.name);
            let tx_progress = tx.clone();
            model_resolver::resolve(
                &options.name,
                options.url.as_deref(),
                options.bundled_dir.as_deref(),
                Some(Box::new(move |downloaded, total| {
                    let _ = tx_progress.send(ModelLoadMessage::Progress(downloaded, total));
                })),
            )?
        }
    };

    log::info!("Loading detector from {}", model_path.display());
    let detector = OnnxBlazefaceDetector::new(
        &model_path,
        options.confidence,
        options.max_faces,
        options.acceleration,
    )?;
    Ok(share(Box::new(detector)))
}
