use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Captured audio that is securely zeroed on drop.
/// Session audio never touches disk and is cleared from memory once encoded.
#[derive(Debug, Zeroize)]
#[zeroize(drop)]
pub struct AudioClip {
    /// PCM audio samples, mono float32 in [-1, 1].
    samples: Vec<f32>,
    /// Sample rate in Hz.
    sample_rate: u32,
}

impl AudioClip {
    /// Create a new empty clip.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
        }
    }

    /// Create a clip from existing samples.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Append samples to the clip.
    pub fn push_samples(&mut self, samples: &[f32]) {
        self.samples.extend_from_slice(samples);
    }

    /// Get the samples as a slice.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Get the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Check if the clip is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Options for a single transcription call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscribeOptions {
    /// Target language (ISO 639-1 code, e.g., "en", "zh").
    /// None for auto-detection.
    pub language: Option<String>,
    /// Free-text context hint assembled by an outer collaborator.
    /// Backends that cannot use it ignore it silently.
    pub context_prompt: Option<String>,
}

/// Result of a transcription call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrResult {
    /// Transcribed text.
    pub text: String,
    /// Detected or declared language (ISO 639-1 code).
    pub language: Option<String>,
    /// Confidence in [0, 1]. 1.0 when the backend does not report one.
    pub confidence: f32,
    /// Wall-clock duration of the transcription call in milliseconds.
    pub duration_ms: u64,
}

impl AsrResult {
    pub fn new(text: String, language: Option<String>, duration_ms: u64) -> Self {
        Self {
            text,
            language,
            confidence: 1.0,
            duration_ms,
        }
    }
}
