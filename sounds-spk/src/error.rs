//! Error types for sounds-spk

use std::path::PathBuf;
use thiserror::Error;

/// Speech synthesis errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Voice directory not found: {0}")]
    VoiceDirectoryMissing(PathBuf),

    #[error("No usable voice samples in {dir} ({candidates} .wav candidates)")]
    NoUsableSamples { dir: PathBuf, candidates: usize },

    #[error("Synthesis failed: {0}")]
    SynthesisFailed(#[source] Box<SpeechError>),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl SpeechError {
    /// Innermost error, looking through `SynthesisFailed` wrappers
    pub fn root_cause(&self) -> &SpeechError {
        match self {
            SpeechError::SynthesisFailed(inner) => inner.root_cause(),
            other => other,
        }
    }
}
