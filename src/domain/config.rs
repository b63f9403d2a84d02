use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::engine::EngineKind;

pub use crate::domain::audio::CaptureConfig;

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Enable file logging with rotation.
    pub file_logging: bool,
    /// Maximum number of log files to keep.
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: true,
            max_files: 7,
        }
    }
}

/// Recognition engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine activated at startup.
    pub default_engine: EngineKind,
    /// Override for the turbo model file. Relative paths resolve against the
    /// models directory.
    pub turbo_model: PathBuf,
    /// Override for the lite model file.
    pub lite_model: PathBuf,
    /// Number of inference threads (0 = auto).
    pub threads: u32,
    /// Language code (e.g., "en", "zh"). None for auto-detection.
    pub language: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_engine: EngineKind::WhisperTurbo,
            turbo_model: PathBuf::from("ggml-large-v3-turbo.bin"),
            lite_model: PathBuf::from("ggml-tiny-q5_1.bin"),
            threads: 0,
            language: None,
        }
    }
}

impl EngineConfig {
    /// Resolve the model file for an engine kind against the models directory.
    pub fn model_path(&self, kind: EngineKind, models_dir: &Path) -> PathBuf {
        let configured = match kind {
            EngineKind::WhisperTurbo => &self.turbo_model,
            EngineKind::WhisperLite => &self.lite_model,
        };
        if configured.is_absolute() {
            configured.clone()
        } else {
            models_dir.join(configured)
        }
    }
}

/// Main configuration for the capture and recognition core.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CoreConfig {
    pub audio: CaptureConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

impl CoreConfig {
    /// Create a new CoreConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }
}
