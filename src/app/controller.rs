use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use crate::adapters::{CpalCaptureManager, TomlConfigStore, WhisperEngineFactory};
use crate::app::EngineCoordinator;
use crate::domain::{CoreConfig, CoreError};
use crate::infrastructure::init_logging;
use crate::ports::ConfigStore;

/// Application controller that orchestrates initialization and owns the
/// long-lived services: configuration, logging, the capture pipeline, and
/// the engine coordinator.
pub struct AppController {
    config: RwLock<CoreConfig>,
    config_store: Arc<TomlConfigStore>,
    capture: Arc<CpalCaptureManager>,
    coordinator: Arc<EngineCoordinator>,
    _log_guard: Option<WorkerGuard>,
}

impl AppController {
    /// Initialize the application controller.
    /// This sets up configuration, logging, capture, and the coordinator.
    pub fn new() -> Result<Self, CoreError> {
        // Step 1: Initialize config store
        let config_store = Arc::new(TomlConfigStore::new()?);

        // Step 2: Load configuration
        let config = config_store.load()?;

        // Step 3: Initialize logging
        let log_guard = init_logging(&config_store.logs_dir(), &config.logging)?;

        info!("EchoType core starting up");

        // Step 4: Capture pipeline and engine coordinator
        let capture = Arc::new(CpalCaptureManager::with_config(config.audio.clone())?);

        let factory = Arc::new(WhisperEngineFactory::new(
            config.engine.threads,
            config.engine.language.clone(),
        ));
        let coordinator = Arc::new(EngineCoordinator::new(
            factory,
            config.engine.clone(),
            config_store.models_dir(),
        ));

        info!(
            default_engine = ?config.engine.default_engine,
            "AppController initialized"
        );

        Ok(Self {
            config: RwLock::new(config),
            config_store,
            capture,
            coordinator,
            _log_guard: log_guard,
        })
    }

    /// Activate the engine named by the configuration. Separate from `new()`
    /// because model loading is slow and retried.
    pub async fn activate_default_engine(&self) -> Result<(), CoreError> {
        let kind = self.config.read().engine.default_engine;
        self.coordinator.switch_engine(kind).await
    }

    /// Get the current configuration.
    pub fn config(&self) -> CoreConfig {
        self.config.read().clone()
    }

    /// Update the configuration.
    ///
    /// Persists immediately; capture and engine settings take effect at the
    /// next startup.
    pub fn update_config(&self, config: CoreConfig) -> Result<(), CoreError> {
        self.config_store.save(&config)?;
        *self.config.write() = config;

        info!("Configuration updated");
        Ok(())
    }

    /// The capture pipeline.
    pub fn capture(&self) -> Arc<CpalCaptureManager> {
        Arc::clone(&self.capture)
    }

    /// The engine coordinator.
    pub fn coordinator(&self) -> Arc<EngineCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        self.config_store.data_dir()
    }

    /// Get the logs directory path.
    pub fn logs_dir(&self) -> PathBuf {
        self.config_store.logs_dir()
    }

    /// Get the models directory path.
    pub fn models_dir(&self) -> PathBuf {
        self.config_store.models_dir()
    }

    /// Get the config file path.
    pub fn config_path(&self) -> PathBuf {
        self.config_store.config_path()
    }
}
