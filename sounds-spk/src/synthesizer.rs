//! Synthesis with named-voice first and voice-sample fallback

use crate::audio::{VoiceConditioningLoader, Waveform};
use crate::config::{CANONICAL_SAMPLE_RATE, DEFAULT_MAX_VOICE_SAMPLES};
use crate::device::DeviceKind;
use crate::engines::{TtsModel, VoiceConditioning};
use crate::error::SpeechError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Builds the model for the chosen device
pub type ModelFactory = Arc<dyn Fn(DeviceKind) -> Result<Arc<dyn TtsModel>, SpeechError> + Send + Sync>;

/// One text to speak
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    text: String,
    preset: String,
    voice_id: String,
}

impl SynthesisRequest {
    pub fn new(
        text: impl Into<String>,
        preset: impl Into<String>,
        voice_id: impl Into<String>,
    ) -> Result<Self, SpeechError> {
        let text = text.into();
        if text.is_empty() {
            return Err(SpeechError::Config("Text cannot be empty".to_string()));
        }
        if text.contains('\0') {
            return Err(SpeechError::Config("Text contains null bytes".to_string()));
        }
        Ok(Self {
            text,
            preset: preset.into(),
            voice_id: voice_id.into(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn preset(&self) -> &str {
        &self.preset
    }

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }
}

/// Which calling convention produced the audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    NamedVoice,
    VoiceSamples,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::NamedVoice => f.write_str("named voice"),
            Strategy::VoiceSamples => f.write_str("voice samples"),
        }
    }
}

/// Raw model audio and how it was obtained
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub waveform: Waveform,
    pub strategy: Strategy,
}

/// Drives the two synthesis attempts
///
/// The primary attempt asks for the named voice. Any failure there moves to
/// the fallback, which loads conditioning clips and calls the model with them.
/// A fallback failure is final; nothing is retried.
pub struct SynthesisOrchestrator {
    factory: ModelFactory,
    loader: VoiceConditioningLoader,
    max_voice_samples: usize,
    model_sample_rate: u32,
}

impl SynthesisOrchestrator {
    pub fn new(factory: ModelFactory, loader: VoiceConditioningLoader) -> Self {
        Self {
            factory,
            loader,
            max_voice_samples: DEFAULT_MAX_VOICE_SAMPLES,
            model_sample_rate: CANONICAL_SAMPLE_RATE,
        }
    }

    pub fn with_max_voice_samples(mut self, max_voice_samples: usize) -> Self {
        self.max_voice_samples = max_voice_samples;
        self
    }

    pub fn with_model_sample_rate(mut self, model_sample_rate: u32) -> Self {
        self.model_sample_rate = model_sample_rate;
        self
    }

    /// Build the model for `device` and synthesize `request`
    pub async fn synthesize(
        &self,
        request: &SynthesisRequest,
        device: DeviceKind,
        voice_dir: &Path,
    ) -> Result<Synthesis, SpeechError> {
        let model = (self.factory)(device).map_err(|e| SpeechError::SynthesisFailed(Box::new(e)))?;
        self.synthesize_with(model.as_ref(), request, voice_dir).await
    }

    /// Synthesize `request` on an already built model
    pub async fn synthesize_with(
        &self,
        model: &dyn TtsModel,
        request: &SynthesisRequest,
        voice_dir: &Path,
    ) -> Result<Synthesis, SpeechError> {
        let primary = VoiceConditioning::NamedVoice(request.voice_id().to_string());
        let cause = match self.attempt(model, request, &primary).await {
            Ok(waveform) => {
                return Ok(Synthesis {
                    waveform,
                    strategy: Strategy::NamedVoice,
                })
            }
            Err(e) => e,
        };
        warn!("Named voice synthesis failed or unsupported: {}", cause);

        let samples = self
            .loader
            .load(voice_dir, self.max_voice_samples)
            .map_err(|e| SpeechError::SynthesisFailed(Box::new(e)))?;
        let fallback = VoiceConditioning::Samples(samples);

        match self.attempt(model, request, &fallback).await {
            Ok(waveform) => Ok(Synthesis {
                waveform,
                strategy: Strategy::VoiceSamples,
            }),
            Err(e) => Err(SpeechError::SynthesisFailed(Box::new(e))),
        }
    }

    async fn attempt(
        &self,
        model: &dyn TtsModel,
        request: &SynthesisRequest,
        conditioning: &VoiceConditioning,
    ) -> Result<Waveform, SpeechError> {
        info!(
            "Synthesizing with {} on {} (preset={})",
            conditioning.describe(),
            model.name(),
            request.preset()
        );
        let output = model
            .synthesize(request.text(), conditioning, request.preset())
            .await?;
        let tensor = output
            .into_first()
            .ok_or_else(|| SpeechError::Model("Model returned no audio".to_string()))?;
        Ok(Waveform::new(tensor, self.model_sample_rate))
    }
}
