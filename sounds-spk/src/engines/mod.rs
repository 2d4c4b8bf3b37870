//! TTS model implementations

pub mod command;
pub mod custom;

use crate::audio::{ConditioningSample, Tensor};
use crate::error::SpeechError;
use async_trait::async_trait;

/// How the model is told which voice to use
///
/// The two variants are the model's two calling conventions.
#[derive(Debug, Clone)]
pub enum VoiceConditioning {
    /// A voice the model knows by name
    NamedVoice(String),
    /// Reference clips, each `[1, frames]` at the canonical rate
    Samples(Vec<ConditioningSample>),
}

impl VoiceConditioning {
    pub fn describe(&self) -> String {
        match self {
            VoiceConditioning::NamedVoice(name) => format!("voice '{}'", name),
            VoiceConditioning::Samples(samples) => format!("{} voice sample(s)", samples.len()),
        }
    }
}

/// What a model call returns: one waveform or a batch of candidates
#[derive(Debug, Clone)]
pub enum ModelOutput {
    Single(Tensor),
    Batch(Vec<Tensor>),
}

impl ModelOutput {
    /// The waveform to keep; for a batch, the first one
    pub fn into_first(self) -> Option<Tensor> {
        match self {
            ModelOutput::Single(tensor) => Some(tensor),
            ModelOutput::Batch(tensors) => tensors.into_iter().next(),
        }
    }
}

impl From<Tensor> for ModelOutput {
    fn from(tensor: Tensor) -> Self {
        ModelOutput::Single(tensor)
    }
}

impl From<Vec<Tensor>> for ModelOutput {
    fn from(tensors: Vec<Tensor>) -> Self {
        ModelOutput::Batch(tensors)
    }
}

/// Trait for neural TTS models
#[async_trait]
pub trait TtsModel: Send + Sync {
    /// Synthesize `text` with the given voice conditioning and preset
    async fn synthesize(
        &self,
        text: &str,
        conditioning: &VoiceConditioning,
        preset: &str,
    ) -> Result<ModelOutput, SpeechError>;

    /// Check if the model can be used
    fn is_available(&self) -> bool;

    /// Get model name
    fn name(&self) -> &str;
}
