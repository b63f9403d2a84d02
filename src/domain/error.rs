use thiserror::Error;

/// Domain-level errors for the capture and recognition core.
///
/// Every variant is recoverable at the caller boundary; nothing here is
/// process-fatal.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("No usable audio input device: {0}")]
    DeviceUnavailable(String),

    #[error("A capture session is already running")]
    AlreadyRecording,

    #[error("Unsupported audio format: {0}")]
    FormatUnsupported(String),

    #[error("No speech model is loaded")]
    ModelNotLoaded,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Model failed to load after {attempts} attempts")]
    ModelLoadFailed {
        attempts: u32,
        #[source]
        source: Box<CoreError>,
    },

    #[error("Invalid audio data: {0}")]
    InvalidAudioFormat(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(err: toml::de::Error) -> Self {
        CoreError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CoreError {
    fn from(err: toml::ser::Error) -> Self {
        CoreError::Config(err.to_string())
    }
}
