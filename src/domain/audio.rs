use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Capture state machine.
///
/// State transitions:
/// - Idle -> Recording (start_recording)
/// - Recording -> Idle (stop_recording or silence auto-stop)
///
/// A failed start rolls back to Idle; the pipeline is never left in a
/// half-open Recording state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CaptureState {
    /// Ready to record, no active capture.
    Idle = 0,
    /// Actively capturing audio.
    Recording = 1,
}

impl CaptureState {
    /// Check if recording can be started from this state.
    #[must_use]
    pub fn can_start_recording(&self) -> bool {
        matches!(self, CaptureState::Idle)
    }

    /// Check if recording can be stopped from this state.
    #[must_use]
    pub fn can_stop_recording(&self) -> bool {
        matches!(self, CaptureState::Recording)
    }
}

impl From<u8> for CaptureState {
    fn from(value: u8) -> Self {
        match value {
            1 => CaptureState::Recording,
            _ => CaptureState::Idle,
        }
    }
}

impl From<CaptureState> for u8 {
    fn from(state: CaptureState) -> Self {
        state as u8
    }
}

/// Atomic wrapper for CaptureState for lock-free reads.
#[derive(Debug)]
pub struct AtomicCaptureState(AtomicU8);

impl AtomicCaptureState {
    pub fn new(state: CaptureState) -> Self {
        Self(AtomicU8::new(state.into()))
    }

    pub fn load(&self) -> CaptureState {
        self.0.load(Ordering::Acquire).into()
    }

    pub fn store(&self, state: CaptureState) {
        self.0.store(state.into(), Ordering::Release);
    }

    /// Compare and swap, returns true if successful.
    pub fn compare_exchange(&self, current: CaptureState, new: CaptureState) -> bool {
        self.0
            .compare_exchange(current.into(), new.into(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for AtomicCaptureState {
    fn default() -> Self {
        Self::new(CaptureState::Idle)
    }
}

/// Audio capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Target sample rate in Hz. Whisper expects 16 kHz mono.
    pub sample_rate: u32,
    /// RMS level below which a block counts as silence (0.0-1.0).
    pub silence_threshold: f32,
    /// How much consecutive sub-threshold audio triggers auto-stop, in ms.
    pub silence_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            silence_threshold: 0.01,
            silence_duration_ms: 300,
        }
    }
}

impl CaptureConfig {
    /// Silence window expressed in samples at the target rate.
    ///
    /// Counting samples rather than callbacks keeps the auto-stop window
    /// independent of the device buffer size.
    pub fn silence_window_samples(&self) -> usize {
        (self.sample_rate as u64 * self.silence_duration_ms / 1000) as usize
    }
}

/// Why a recording session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// The caller invoked stop_recording.
    Manual,
    /// The silence tracker fired after a sustained quiet stretch.
    Silence,
}

/// Events emitted by the capture pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum CaptureEvent {
    /// Capture state changed.
    StateChanged {
        from: CaptureState,
        to: CaptureState,
    },
    /// Audio level update (for visualization).
    LevelUpdate {
        /// RMS level normalized to 0.0-1.0.
        level: f32,
    },
    /// A recording session finished.
    Stopped {
        reason: StopReason,
    },
}

/// Input audio device information.
///
/// An immutable snapshot; re-created on each enumeration and unrelated to any
/// live capture session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDevice {
    /// Unique device identifier.
    pub id: String,
    /// Human-readable device name.
    pub name: String,
    /// Whether this is the system default device.
    pub is_default: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_state_can_start_recording() {
        assert!(CaptureState::Idle.can_start_recording());
        assert!(!CaptureState::Recording.can_start_recording());
    }

    #[test]
    fn test_capture_state_can_stop_recording() {
        assert!(!CaptureState::Idle.can_stop_recording());
        assert!(CaptureState::Recording.can_stop_recording());
    }

    #[test]
    fn test_capture_state_roundtrip() {
        for state in [CaptureState::Idle, CaptureState::Recording] {
            let value: u8 = state.into();
            let recovered: CaptureState = value.into();
            assert_eq!(state, recovered);
        }
    }

    #[test]
    fn test_atomic_capture_state() {
        let atomic = AtomicCaptureState::new(CaptureState::Idle);
        assert_eq!(atomic.load(), CaptureState::Idle);

        atomic.store(CaptureState::Recording);
        assert_eq!(atomic.load(), CaptureState::Recording);

        // Successful CAS
        assert!(atomic.compare_exchange(CaptureState::Recording, CaptureState::Idle));
        assert_eq!(atomic.load(), CaptureState::Idle);

        // Failed CAS (wrong current value)
        assert!(!atomic.compare_exchange(CaptureState::Recording, CaptureState::Idle));
        assert_eq!(atomic.load(), CaptureState::Idle);
    }

    #[test]
    fn test_capture_config_default() {
        let config = CaptureConfig::default();
        assert_eq!(config.sample_rate, 16_000);
        assert!((config.silence_threshold - 0.01).abs() < f32::EPSILON);
        assert_eq!(config.silence_duration_ms, 300);
    }

    #[test]
    fn test_silence_window_samples() {
        let config = CaptureConfig::default();
        // 0.3 seconds at 16 kHz
        assert_eq!(config.silence_window_samples(), 4_800);
    }
}
