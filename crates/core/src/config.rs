use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::infrastructure::jpeg_frame_encoder::DEFAULT_JPEG_QUALITY;
use crate::detection::domain::bucket::{BucketPalette, LabelSets};
use crate::shared::camera::{CameraDescriptor, Locator};
use crate::shared::constants::{APP_DIR_NAME, OBJECT_MODEL_NAME};

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("confidence must be within [0, 1], got {0}")]
    Confidence(f64),
    #[error("every_n_frames must be at least 1")]
    FrameSkip,
    #[error("jpeg_quality must be within 1..=100, got {0}")]
    Quality(u8),
    #[error("face_tolerance must be positive, got {0}")]
    Tolerance(f64),
    #[error("tick_interval_ms must be non-zero")]
    TickInterval,
    #[error("no cameras configured")]
    NoCameras,
    #[error("default camera {0:?} is not in the camera table")]
    UnknownDefaultCamera(String),
}

/// One entry of the camera table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Device index (`0`) or stream address (`"rtsp://..."`).
    pub source: Locator,
    pub name: String,
    #[serde(default)]
    pub location: String,
}

/// Static service configuration, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub cameras: BTreeMap<String, CameraConfig>,
    pub default_camera: String,
    /// Object detector ONNX file: a path, or a file name looked up in the
    /// model cache.
    pub model: PathBuf,
    pub confidence: f64,
    pub every_n_frames: u64,
    pub face_recognition: bool,
    pub known_faces_dir: PathBuf,
    pub face_tolerance: f64,
    pub labels: LabelSets,
    pub colors: BucketPalette,
    pub host: String,
    pub port: u16,
    pub jpeg_quality: u8,
    pub tick_interval_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let mut cameras = BTreeMap::new();
        cameras.insert(
            "cam-1".to_string(),
            CameraConfig {
                source: Locator::Device(0),
                name: "Main Gate".to_string(),
                location: "Centenary Gate".to_string(),
            },
        );
        Self {
            cameras,
            default_camera: "cam-1".to_string(),
            model: PathBuf::from(OBJECT_MODEL_NAME),
            confidence: 0.5,
            every_n_frames: 3,
            face_recognition: true,
            known_faces_dir: PathBuf::from("known_faces"),
            face_tolerance: 1.1,
            labels: LabelSets::default(),
            colors: BucketPalette::default(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            tick_interval_ms: 33,
        }
    }
}

impl ServiceConfig {
    /// Platform config file location (`<config dir>/GateWatch/config.json`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from `explicit` if given (must succeed), else from the platform
    /// config file if present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ConfigError::Confidence(self.confidence));
        }
        if self.every_n_frames < 1 {
            return Err(ConfigError::FrameSkip);
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Quality(self.jpeg_quality));
        }
        if !(self.face_tolerance > 0.0) {
            return Err(ConfigError::Tolerance(self.face_tolerance));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::TickInterval);
        }
        if self.cameras.is_empty() {
            return Err(ConfigError::NoCameras);
        }
        if !self.cameras.contains_key(&self.default_camera) {
            return Err(ConfigError::UnknownDefaultCamera(
                self.default_camera.clone(),
            ));
        }
        Ok(())
    }

    pub fn camera(&self, id: &str) -> Option<CameraDescriptor> {
        self.cameras.get(id).map(|c| CameraDescriptor {
            id: id.to_string(),
            locator: c.source.clone(),
            name: c.name.clone(),
            location: c.location.clone(),
        })
    }

    /// All cameras in id order.
    pub fn camera_descriptors(&self) -> Vec<CameraDescriptor> {
        self.cameras
            .keys()
            .filter_map(|id| self.camera(id))
            .collect()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
