pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod transcription;

pub use audio::{
    AtomicCaptureState, AudioDevice, CaptureConfig, CaptureEvent, CaptureState, StopReason,
};
pub use config::{CoreConfig, EngineConfig, LoggingConfig};
pub use engine::{AtomicEngineState, EngineDescriptor, EngineKind, EngineState};
pub use error::CoreError;
pub use transcription::{AsrResult, AudioClip, TranscribeOptions};
