use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{
    AsrResult, AtomicEngineState, CoreError, EngineConfig, EngineKind, EngineState,
    TranscribeOptions,
};
use crate::ports::{AsrEngine, EngineFactory};

/// How many times a model load is attempted before a switch gives up.
const MAX_LOAD_ATTEMPTS: u32 = 3;

struct ActiveEngine {
    kind: EngineKind,
    engine: Arc<dyn AsrEngine>,
}

/// Owns the single active recognition engine and serializes engine switches.
///
/// All switch and transcribe entry points funnel through one async mutex, so
/// a transcription issued during a switch waits for the switch to settle and
/// then runs against whichever engine won. Observers poll the lock-free
/// `current_engine()` / `engine_state()` snapshots instead.
pub struct EngineCoordinator {
    factory: Arc<dyn EngineFactory>,
    engine_config: EngineConfig,
    models_dir: PathBuf,
    active: Mutex<Option<ActiveEngine>>,
    current_kind: RwLock<Option<EngineKind>>,
    state: AtomicEngineState,
}

impl EngineCoordinator {
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        engine_config: EngineConfig,
        models_dir: PathBuf,
    ) -> Self {
        Self {
            factory,
            engine_config,
            models_dir,
            active: Mutex::new(None),
            current_kind: RwLock::new(None),
            state: AtomicEngineState::default(),
        }
    }

    /// Kind of the currently active engine, if any.
    pub fn current_engine(&self) -> Option<EngineKind> {
        *self.current_kind.read()
    }

    /// Lifecycle state of the active engine.
    pub fn engine_state(&self) -> EngineState {
        self.state.load()
    }

    /// Whether the active engine is ready to transcribe.
    pub fn is_loaded(&self) -> bool {
        self.state.load() == EngineState::Loaded
    }

    /// Activate `to`, replacing the current engine.
    ///
    /// A no-op when `to` is already active and loaded. Otherwise the current
    /// engine is unloaded best-effort, the new one is constructed and its
    /// model load retried with a growing backoff. On exhaustion the
    /// coordinator is left with no active engine and the last load error is
    /// returned inside `ModelLoadFailed`.
    pub async fn switch_engine(&self, to: EngineKind) -> Result<(), CoreError> {
        let mut active = self.active.lock().await;

        if let Some(current) = active.as_ref() {
            if current.kind == to && current.engine.is_loaded() {
                debug!(engine = ?to, "Engine already active");
                return Ok(());
            }
        }

        if let Some(current) = active.take() {
            info!(from = ?current.kind, to = ?to, "Switching engine");
            *self.current_kind.write() = None;
            self.state.store(EngineState::Unloaded);
            current.engine.unload();
        } else {
            info!(to = ?to, "Activating engine");
        }

        let engine = self.factory.create(to);
        let model_path = self.engine_config.model_path(to, &self.models_dir);
        self.state.store(EngineState::Loading);

        let mut last_error: Option<CoreError> = None;
        for attempt in 1..=MAX_LOAD_ATTEMPTS {
            match engine.load(&model_path).await {
                Ok(()) => {
                    *active = Some(ActiveEngine { kind: to, engine });
                    *self.current_kind.write() = Some(to);
                    self.state.store(EngineState::Loaded);
                    info!(engine = ?to, attempt, "Engine ready");
                    return Ok(());
                }
                Err(e) => {
                    warn!(engine = ?to, attempt, error = %e, "Model load attempt failed");
                    last_error = Some(e);
                    if attempt < MAX_LOAD_ATTEMPTS {
                        let backoff = std::time::Duration::from_secs(u64::from(attempt) * 2);
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        self.state.store(EngineState::Unloaded);
        *self.current_kind.write() = None;

        Err(CoreError::ModelLoadFailed {
            attempts: MAX_LOAD_ATTEMPTS,
            source: Box::new(last_error.unwrap_or(CoreError::ModelNotLoaded)),
        })
    }

    /// Transcribe a WAV payload with the active engine.
    ///
    /// Waits out any in-flight switch, then runs outside the lock so a slow
    /// inference does not block subsequent switches. A failed transcription
    /// leaves the engine active and loaded.
    pub async fn transcribe(
        &self,
        wav: &[u8],
        options: &TranscribeOptions,
    ) -> Result<AsrResult, CoreError> {
        let engine = {
            let active = self.active.lock().await;
            match active.as_ref() {
                Some(current) => Arc::clone(&current.engine),
                None => return Err(CoreError::ModelNotLoaded),
            }
        };

        engine.transcribe(wav, options).await
    }

    /// Unload and drop the active engine, if any.
    pub async fn shutdown(&self) {
        let mut active = self.active.lock().await;
        if let Some(current) = active.take() {
            *self.current_kind.write() = None;
            self.state.store(EngineState::Unloaded);
            current.engine.unload();
            info!(engine = ?current.kind, "Engine shut down");
        }
    }
}
