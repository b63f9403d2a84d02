#![forbid(unsafe_code)]

//! Microphone capture and local speech recognition core.
//!
//! The crate is organized hexagonally: `domain` holds types and errors,
//! `ports` the trait seams, `adapters` the cpal capture pipeline and the
//! whisper backends, `audio` the stateless DSP helpers they share, and `app`
//! the controller and engine coordinator that wire everything together.

pub mod adapters;
pub mod app;
pub mod audio;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use app::{AppController, EngineCoordinator};
pub use domain::{
    AsrResult, AudioClip, AudioDevice, CaptureConfig, CaptureEvent, CaptureState, CoreConfig,
    CoreError, EngineDescriptor, EngineKind, EngineState, StopReason, TranscribeOptions,
};
pub use ports::{AsrEngine, CaptureManager, ConfigStore, EngineFactory};
