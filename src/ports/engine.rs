use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{AsrResult, CoreError, EngineDescriptor, EngineKind, TranscribeOptions};

/// Port for a speech recognition backend.
///
/// Engines take complete WAV payloads (mono 16-bit PCM, as produced by the
/// capture pipeline) and return text. Loading is separated from construction
/// so the coordinator can retry it.
#[async_trait]
pub trait AsrEngine: Send + Sync {
    /// Static description of this backend.
    fn descriptor(&self) -> EngineDescriptor;

    /// Whether a model is loaded and the engine can transcribe.
    fn is_loaded(&self) -> bool;

    /// Load the model at `path`. Idempotent once loaded.
    ///
    /// Fails with `ModelNotFound` if the file does not exist and
    /// `ModelLoadFailed` if the backend rejects it.
    async fn load(&self, path: &Path) -> Result<(), CoreError>;

    /// Release the model and its memory. Safe to call when unloaded.
    fn unload(&self);

    /// Transcribe a WAV payload.
    ///
    /// Backends that do not support a context prompt ignore
    /// `options.context_prompt` silently. Fails with `ModelNotLoaded` if
    /// called before a successful `load()`.
    async fn transcribe(
        &self,
        wav: &[u8],
        options: &TranscribeOptions,
    ) -> Result<AsrResult, CoreError>;
}

/// Constructs engines by kind.
///
/// The coordinator goes through this seam so tests can substitute failing or
/// instrumented backends.
pub trait EngineFactory: Send + Sync {
    fn create(&self, kind: EngineKind) -> Arc<dyn AsrEngine>;
}
