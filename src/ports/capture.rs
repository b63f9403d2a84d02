use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::{AudioDevice, CaptureConfig, CaptureEvent, CaptureState, CoreError};

/// Port for microphone capture.
///
/// Implementations handle platform-specific device access and deliver
/// converted audio (mono float32 at the pipeline target rate) plus level and
/// silence observations.
#[async_trait]
pub trait CaptureManager: Send + Sync {
    /// Start capturing from the selected input device.
    ///
    /// Returns an error if already recording, if no device is available, or
    /// if the device's native format cannot be converted. On any failure the
    /// pipeline is back in `Idle`.
    async fn start(&self) -> Result<(), CoreError>;

    /// Stop capturing and return the finished session as WAV bytes.
    ///
    /// Idempotent: when idle this collects a clip finished by silence
    /// auto-stop if one is pending, and otherwise returns `Ok(None)`.
    /// A session that captured zero samples also yields `Ok(None)`.
    async fn stop(&self) -> Result<Option<Vec<u8>>, CoreError>;

    /// Current capture state.
    fn state(&self) -> CaptureState;

    /// The capture configuration the pipeline was built with.
    fn config(&self) -> CaptureConfig;

    /// List available audio input devices. An empty list is not an error.
    fn list_input_devices(&self) -> Result<Vec<AudioDevice>, CoreError>;

    /// Select an input device by ID, or the system default if `None`.
    /// Takes effect at the next `start()`.
    fn select_input_device(&self, device_id: Option<&str>) -> Result<(), CoreError>;

    /// Subscribe to capture events.
    fn subscribe(&self) -> broadcast::Receiver<CaptureEvent>;

    /// Duration of the in-progress session in seconds. 0.0 when idle.
    fn current_duration(&self) -> f32;

    /// Most recent input level in [0, 1]. 0.0 when idle.
    fn current_level(&self) -> f32;
}
