use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::{convert, wav};
use crate::domain::{
    AsrResult, AtomicEngineState, CoreError, EngineDescriptor, EngineKind, EngineState,
    TranscribeOptions,
};
use crate::ports::{AsrEngine, EngineFactory};

/// Model context plus load-state bookkeeping shared by both whisper backends.
struct WhisperRuntime {
    context: RwLock<Option<Arc<WhisperContext>>>,
    state: AtomicEngineState,
    threads: u32,
    default_language: Option<String>,
}

impl WhisperRuntime {
    fn new(threads: u32, default_language: Option<String>) -> Self {
        let actual_threads = if threads == 0 {
            std::thread::available_parallelism()
                .map(|p| std::cmp::max(1, p.get() as u32 - 1))
                .unwrap_or(1)
        } else {
            threads
        };

        Self {
            context: RwLock::new(None),
            state: AtomicEngineState::default(),
            threads: actual_threads,
            default_language,
        }
    }

    fn is_loaded(&self) -> bool {
        self.state.load() == EngineState::Loaded
    }

    async fn load(&self, path: &Path, label: &'static str) -> Result<(), CoreError> {
        if self.is_loaded() {
            debug!(engine = label, "Model already loaded");
            return Ok(());
        }

        if !path.exists() {
            return Err(CoreError::ModelNotFound(
                path.to_string_lossy().to_string(),
            ));
        }

        self.state.store(EngineState::Loading);
        info!(engine = label, path = ?path, "Loading whisper model");

        let path_str = path.to_string_lossy().to_string();
        let loaded = tokio::task::spawn_blocking(move || {
            WhisperContext::new_with_params(&path_str, WhisperContextParameters::default())
                .map_err(|e| CoreError::TranscriptionFailed(format!("Failed to load model: {}", e)))
        })
        .await
        .map_err(|e| CoreError::TranscriptionFailed(format!("Task join error: {}", e)));

        match loaded {
            Ok(Ok(ctx)) => {
                *self.context.write() = Some(Arc::new(ctx));
                self.state.store(EngineState::Loaded);
                info!(engine = label, "Whisper model loaded");
                Ok(())
            }
            Ok(Err(e)) | Err(e) => {
                self.state.store(EngineState::Unloaded);
                Err(e)
            }
        }
    }

    fn unload(&self, label: &'static str) {
        let had_model = self.context.write().take().is_some();
        self.state.store(EngineState::Unloaded);
        if had_model {
            info!(engine = label, "Whisper model unloaded");
        }
    }

    /// Decode the WAV payload, run inference, and collect the text.
    async fn transcribe(
        &self,
        wav_bytes: &[u8],
        options: &TranscribeOptions,
        descriptor: &EngineDescriptor,
        sampling: SamplingStrategy,
        threads: u32,
    ) -> Result<AsrResult, CoreError> {
        let ctx = self
            .context
            .read()
            .clone()
            .ok_or(CoreError::ModelNotLoaded)?;

        let decoded = wav::decode(wav_bytes)?;
        if decoded.sample_rate != 16_000 {
            return Err(CoreError::InvalidAudioFormat(format!(
                "Expected 16kHz audio, got {}Hz",
                decoded.sample_rate
            )));
        }
        let samples = if decoded.channels > 1 {
            convert::downmix_to_mono(&decoded.samples, decoded.channels)
        } else {
            decoded.samples
        };

        if samples.is_empty() {
            return Ok(AsrResult::new(String::new(), None, 0));
        }

        let language = options
            .language
            .clone()
            .or_else(|| self.default_language.clone());
        let prompt = if descriptor.supports_context_prompt {
            options
                .context_prompt
                .as_deref()
                .and_then(shape_initial_prompt)
        } else {
            None
        };

        debug!(
            engine = descriptor.label,
            samples = samples.len(),
            duration_secs = samples.len() as f32 / 16_000.0,
            threads,
            has_prompt = prompt.is_some(),
            "Starting transcription"
        );

        let start = std::time::Instant::now();

        let result = tokio::task::spawn_blocking(move || {
            let mut params = FullParams::new(sampling);

            params.set_n_threads(threads as i32);
            params.set_print_progress(false);
            params.set_print_realtime(false);
            params.set_print_timestamps(false);

            if let Some(ref lang) = language {
                params.set_language(Some(lang));
            }
            if let Some(ref prompt) = prompt {
                params.set_initial_prompt(prompt);
            }

            let mut state = ctx.create_state().map_err(|e| {
                CoreError::TranscriptionFailed(format!("Failed to create whisper state: {}", e))
            })?;

            state
                .full(params, &samples)
                .map_err(|e| CoreError::TranscriptionFailed(format!("Inference failed: {}", e)))?;

            let num_segments = state.full_n_segments().map_err(|e| {
                CoreError::TranscriptionFailed(format!("Failed to get segment count: {}", e))
            })?;

            let mut text = String::new();
            for i in 0..num_segments {
                if let Ok(segment_text) = state.full_get_segment_text(i) {
                    text.push_str(&segment_text);
                }
            }

            let detected_language = state
                .full_lang_id_from_state()
                .ok()
                .and_then(|id| whisper_rs::get_lang_str(id).map(|s| s.to_string()));

            Ok::<(String, Option<String>), CoreError>((text.trim().to_string(), detected_language))
        })
        .await
        .map_err(|e| CoreError::TranscriptionFailed(format!("Task join error: {}", e)))??;

        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            engine = descriptor.label,
            text_len = result.0.len(),
            duration_ms,
            detected_language = ?result.1,
            "Transcription complete"
        );

        Ok(AsrResult::new(result.0, result.1, duration_ms))
    }
}

/// Condense free-text context into a short whisper initial prompt: the first
/// two lines joined, capped at 50 characters. Longer prompts start to hurt
/// accuracy rather than help it.
fn shape_initial_prompt(context: &str) -> Option<String> {
    let trimmed = context.trim();
    if trimmed.is_empty() {
        return None;
    }

    let keywords = trimmed
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(2)
        .collect::<Vec<_>>()
        .join(" ");

    Some(keywords.chars().take(50).collect())
}

/// Primary backend: the full turbo model with beam search and context-prompt
/// support.
pub struct WhisperTurboEngine {
    runtime: WhisperRuntime,
}

impl WhisperTurboEngine {
    pub fn new(threads: u32, default_language: Option<String>) -> Self {
        let runtime = WhisperRuntime::new(threads, default_language);
        info!(threads = runtime.threads, "WhisperTurboEngine created");
        Self { runtime }
    }
}

#[async_trait]
impl AsrEngine for WhisperTurboEngine {
    fn descriptor(&self) -> EngineDescriptor {
        EngineKind::WhisperTurbo.descriptor()
    }

    fn is_loaded(&self) -> bool {
        self.runtime.is_loaded()
    }

    async fn load(&self, path: &Path) -> Result<(), CoreError> {
        self.runtime.load(path, "whisper_turbo").await
    }

    fn unload(&self) {
        self.runtime.unload("whisper_turbo");
    }

    async fn transcribe(
        &self,
        wav_bytes: &[u8],
        options: &TranscribeOptions,
    ) -> Result<AsrResult, CoreError> {
        self.runtime
            .transcribe(
                wav_bytes,
                options,
                &self.descriptor(),
                SamplingStrategy::BeamSearch {
                    beam_size: 5,
                    patience: -1.0,
                },
                self.runtime.threads,
            )
            .await
    }
}

/// Secondary backend: a small quantized model tuned for latency. Greedy
/// sampling, few threads, and no context-prompt support.
pub struct WhisperLiteEngine {
    runtime: WhisperRuntime,
}

impl WhisperLiteEngine {
    /// Threads are capped low; the lite model gains little from more.
    const MAX_THREADS: u32 = 2;

    pub fn new(threads: u32, default_language: Option<String>) -> Self {
        let runtime = WhisperRuntime::new(threads, default_language);
        info!(
            threads = runtime.threads.min(Self::MAX_THREADS),
            "WhisperLiteEngine created"
        );
        Self { runtime }
    }
}

#[async_trait]
impl AsrEngine for WhisperLiteEngine {
    fn descriptor(&self) -> EngineDescriptor {
        EngineKind::WhisperLite.descriptor()
    }

    fn is_loaded(&self) -> bool {
        self.runtime.is_loaded()
    }

    async fn load(&self, path: &Path) -> Result<(), CoreError> {
        self.runtime.load(path, "whisper_lite").await
    }

    fn unload(&self) {
        self.runtime.unload("whisper_lite");
    }

    async fn transcribe(
        &self,
        wav_bytes: &[u8],
        options: &TranscribeOptions,
    ) -> Result<AsrResult, CoreError> {
        self.runtime
            .transcribe(
                wav_bytes,
                options,
                &self.descriptor(),
                SamplingStrategy::Greedy { best_of: 1 },
                self.runtime.threads.min(Self::MAX_THREADS),
            )
            .await
    }
}

/// Builds whisper backends from the engine configuration.
pub struct WhisperEngineFactory {
    threads: u32,
    language: Option<String>,
}

impl WhisperEngineFactory {
    pub fn new(threads: u32, language: Option<String>) -> Self {
        Self { threads, language }
    }
}

impl EngineFactory for WhisperEngineFactory {
    fn create(&self, kind: EngineKind) -> Arc<dyn AsrEngine> {
        match kind {
            EngineKind::WhisperTurbo => Arc::new(WhisperTurboEngine::new(
                self.threads,
                self.language.clone(),
            )),
            EngineKind::WhisperLite => Arc::new(WhisperLiteEngine::new(
                self.threads,
                self.language.clone(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_initial_prompt_takes_first_two_lines() {
        let context = "meeting notes\nproject alpha\nthird line ignored";
        let prompt = shape_initial_prompt(context).unwrap();
        assert_eq!(prompt, "meeting notes project alpha");
    }

    #[test]
    fn test_shape_initial_prompt_caps_length() {
        let context = "x".repeat(200);
        let prompt = shape_initial_prompt(&context).unwrap();
        assert_eq!(prompt.chars().count(), 50);
    }

    #[test]
    fn test_shape_initial_prompt_empty_is_none() {
        assert!(shape_initial_prompt("").is_none());
        assert!(shape_initial_prompt("   \n  ").is_none());
    }

    #[test]
    fn test_shape_initial_prompt_skips_blank_lines() {
        let prompt = shape_initial_prompt("\n\nfirst\n\nsecond\n").unwrap();
        assert_eq!(prompt, "first second");
    }

    #[test]
    fn test_engines_start_unloaded() {
        let turbo = WhisperTurboEngine::new(4, None);
        assert!(!turbo.is_loaded());
        assert_eq!(turbo.descriptor().kind, EngineKind::WhisperTurbo);
        assert!(turbo.descriptor().supports_context_prompt);

        let lite = WhisperLiteEngine::new(4, None);
        assert!(!lite.is_loaded());
        assert_eq!(lite.descriptor().kind, EngineKind::WhisperLite);
        assert!(!lite.descriptor().supports_context_prompt);
    }

    #[tokio::test]
    async fn test_load_missing_model_fails() {
        let turbo = WhisperTurboEngine::new(1, None);
        let err = turbo
            .load(Path::new("/nonexistent/model.bin"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ModelNotFound(_)));
        assert!(!turbo.is_loaded());
    }

    #[tokio::test]
    async fn test_transcribe_unloaded_fails() {
        let lite = WhisperLiteEngine::new(1, None);
        let wav = crate::audio::wav::encode(&[0.0; 160], 16_000);
        let err = lite
            .transcribe(&wav, &TranscribeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ModelNotLoaded));
    }

    #[test]
    fn test_factory_builds_matching_kind() {
        let factory = WhisperEngineFactory::new(1, Some("en".to_string()));
        let turbo = factory.create(EngineKind::WhisperTurbo);
        assert_eq!(turbo.descriptor().kind, EngineKind::WhisperTurbo);
        let lite = factory.create(EngineKind::WhisperLite);
        assert_eq!(lite.descriptor().kind, EngineKind::WhisperLite);
    }

    #[test]
    fn test_unload_when_unloaded_is_safe() {
        let turbo = WhisperTurboEngine::new(1, None);
        turbo.unload();
        turbo.unload();
        assert!(!turbo.is_loaded());
    }
}
