use std::path::PathBuf;

use crate::domain::{CoreConfig, CoreError};

/// Configuration store port for persisting and loading the core config.
pub trait ConfigStore: Send + Sync {
    /// Load configuration from persistent storage.
    /// Creates default config if none exists.
    fn load(&self) -> Result<CoreConfig, CoreError>;

    /// Save configuration to persistent storage.
    fn save(&self, config: &CoreConfig) -> Result<(), CoreError>;

    /// Path to the configuration file.
    fn config_path(&self) -> PathBuf;

    /// Path to the application data directory.
    fn data_dir(&self) -> PathBuf;

    /// Path to the logs directory.
    fn logs_dir(&self) -> PathBuf;

    /// Path to the directory where model files live.
    fn models_dir(&self) -> PathBuf;
}
