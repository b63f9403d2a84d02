pub mod capture_cpal;
pub mod config_store;
pub mod engine_whisper;

pub use capture_cpal::CpalCaptureManager;
pub use config_store::TomlConfigStore;
pub use engine_whisper::{WhisperEngineFactory, WhisperLiteEngine, WhisperTurboEngine};
