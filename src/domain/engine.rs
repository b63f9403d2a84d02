use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Identity of a recognition backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Accurate local model; accepts a context prompt.
    WhisperTurbo,
    /// Small quantized model tuned for latency; ignores context prompts.
    WhisperLite,
}

impl EngineKind {
    pub fn descriptor(&self) -> EngineDescriptor {
        match self {
            EngineKind::WhisperTurbo => EngineDescriptor {
                kind: EngineKind::WhisperTurbo,
                label: "Whisper Turbo",
                supports_context_prompt: true,
            },
            EngineKind::WhisperLite => EngineDescriptor {
                kind: EngineKind::WhisperLite,
                label: "Whisper Lite",
                supports_context_prompt: false,
            },
        }
    }
}

/// Descriptor for a recognition backend: identity, human label, and whether
/// the backend can take a free-text context prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineDescriptor {
    pub kind: EngineKind,
    pub label: &'static str,
    pub supports_context_prompt: bool,
}

/// Lifecycle state of the active engine.
///
/// Invariant: at most one engine across the coordinator is Loading or Loaded
/// at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EngineState {
    /// No engine resources held.
    Unloaded = 0,
    /// load() in flight.
    Loading = 1,
    /// Ready to transcribe.
    Loaded = 2,
}

impl From<u8> for EngineState {
    fn from(value: u8) -> Self {
        match value {
            1 => EngineState::Loading,
            2 => EngineState::Loaded,
            _ => EngineState::Unloaded,
        }
    }
}

impl From<EngineState> for u8 {
    fn from(state: EngineState) -> Self {
        state as u8
    }
}

/// Atomic wrapper for EngineState for lock-free reads.
#[derive(Debug)]
pub struct AtomicEngineState(AtomicU8);

impl AtomicEngineState {
    pub fn new(state: EngineState) -> Self {
        Self(AtomicU8::new(state.into()))
    }

    pub fn load(&self) -> EngineState {
        self.0.load(Ordering::Acquire).into()
    }

    pub fn store(&self, state: EngineState) {
        self.0.store(state.into(), Ordering::Release);
    }
}

impl Default for AtomicEngineState {
    fn default() -> Self {
        Self::new(EngineState::Unloaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_kind_descriptors() {
        let turbo = EngineKind::WhisperTurbo.descriptor();
        assert!(turbo.supports_context_prompt);
        assert_eq!(turbo.kind, EngineKind::WhisperTurbo);

        let lite = EngineKind::WhisperLite.descriptor();
        assert!(!lite.supports_context_prompt);
        assert_eq!(lite.label, "Whisper Lite");
    }

    #[test]
    fn test_engine_state_roundtrip() {
        for state in [EngineState::Unloaded, EngineState::Loading, EngineState::Loaded] {
            let value: u8 = state.into();
            let recovered: EngineState = value.into();
            assert_eq!(state, recovered);
        }
    }

    #[test]
    fn test_atomic_engine_state() {
        let atomic = AtomicEngineState::default();
        assert_eq!(atomic.load(), EngineState::Unloaded);

        atomic.store(EngineState::Loading);
        assert_eq!(atomic.load(), EngineState::Loading);

        atomic.store(EngineState::Loaded);
        assert_eq!(atomic.load(), EngineState::Loaded);
    }

    #[test]
    fn test_engine_kind_serde_names() {
        let json = serde_json_like(EngineKind::WhisperTurbo);
        assert_eq!(json, "whisper_turbo");
        assert_eq!(serde_json_like(EngineKind::WhisperLite), "whisper_lite");
    }

    fn serde_json_like(kind: EngineKind) -> String {
        // toml::Value gives us the serialized variant name without a JSON dep.
        toml::Value::try_from(kind)
            .map(|v| v.as_str().map(str::to_string))
            .ok()
            .flatten()
            .unwrap_or_default()
    }
}
