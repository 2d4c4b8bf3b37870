//! Custom TTS model implementation
//! Lets callers plug in their own synthesis function

use crate::engines::{ModelOutput, TtsModel, VoiceConditioning};
use crate::error::SpeechError;
use async_trait::async_trait;
use std::sync::Arc;

type SynthesizeFn = dyn Fn(&str, &VoiceConditioning, &str) -> Result<ModelOutput, SpeechError> + Send + Sync;

/// Closure-backed model
pub struct CustomTtsModel {
    name: String,
    synthesize_fn: Arc<SynthesizeFn>,
    is_available_fn: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl CustomTtsModel {
    /// Create a new custom model that is always available
    pub fn new<F>(name: impl Into<String>, synthesize_fn: F) -> Self
    where
        F: Fn(&str, &VoiceConditioning, &str) -> Result<ModelOutput, SpeechError> + Send + Sync + 'static,
    {
        Self::with_availability(name, synthesize_fn, || true)
    }

    pub fn with_availability<F1, F2>(name: impl Into<String>, synthesize_fn: F1, is_available_fn: F2) -> Self
    where
        F1: Fn(&str, &VoiceConditioning, &str) -> Result<ModelOutput, SpeechError> + Send + Sync + 'static,
        F2: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            synthesize_fn: Arc::new(synthesize_fn),
            is_available_fn: Arc::new(is_available_fn),
        }
    }
}

#[async_trait]
impl TtsModel for CustomTtsModel {
    async fn synthesize(
        &self,
        text: &str,
        conditioning: &VoiceConditioning,
        preset: &str,
    ) -> Result<ModelOutput, SpeechError> {
        if text.is_empty() {
            return Err(SpeechError::Model("Text cannot be empty".to_string()));
        }

        (self.synthesize_fn)(text, conditioning, preset)
    }

    fn is_available(&self) -> bool {
        (self.is_available_fn)()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
