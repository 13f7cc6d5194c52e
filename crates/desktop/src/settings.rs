use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use facecap_core::detection::infrastructure::execution_provider::Acceleration;
use facecap_core::detection::infrastructure::model_loader::ModelOptions;
use facecap_core::video::domain::media_devices::CameraConstraints;
use facecap_core::capture::orchestrator::CaptureConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    System,
    Dark,
    Light,
}

impl Appearance {
    pub const ALL: &[Appearance] = &[Appearance::System, Appearance::Dark, Appearance::Light];
}

impl std::fmt::Display for Appearance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Appearance::System => write!(f, "System"),
            Appearance::Dark => write!(f, "Dark"),
            Appearance::Light => write!(f, "Light"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Auto,
    Required,
    Cpu,
}

impl From<Backend> for Acceleration {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Auto => Acceleration::Auto,
            Backend::Required => Acceleration::Required,
            Backend::Cpu => Acceleration::Cpu,
        }
    }
}

/// Persisted preferences. Missing keys fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Detection confidence threshold in percent.
    pub confidence: u32,
    pub max_faces: usize,
    pub backend: Backend,
    pub model_url: Option<String>,
    pub camera_device: Option<String>,
    pub sample_video: Option<String>,
    pub appearance: Appearance,
    pub high_contrast: bool,
    pub font_scale: f32,
}

impl Default for Settings {
    fn default() -> Self {
        let model = ModelOptions::default();
        Self {
            confidence: (model.confidence * 100.0).round() as u32,
            max_faces: model.max_faces,
            backend: Backend::Auto,
            model_url: None,
            camera_device: None,
            sample_video: None,
            appearance: Appearance::System,
            high_contrast: false,
            font_scale: 1.0,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceCap").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            self.save_to(&path);
        }
    }

    fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    log::warn!("Could not save settings to {}: {e}", path.display());
                }
            }
            Err(e) => log::warn!("Could not serialize settings: {e}"),
        }
    }

    pub fn model_options(&self) -> ModelOptions {
        let mut options = ModelOptions {
            confidence: self.confidence.min(100) as f64 / 100.0,
            max_faces: self.max_faces.max(1),
            acceleration: self.backend.into(),
            ..ModelOptions::default()
        };
        if self.model_url.is_some() {
            options.url = self.model_url.clone();
        }
        options
    }

    pub fn capture_config(&self) -> CaptureConfig {
        let mut config = CaptureConfig {
            camera: CameraConstraints {
                device: self.camera_device.clone(),
                ..CameraConstraints::default()
            },
            ..CaptureConfig::default()
        };
        if let Some(ref sample) = self.sample_video {
            config.sample_location = sample.clone();
        }
        config
    }
}
