//! sounds-spk: cached neural text-to-speech
//!
//! Provides:
//! - A content-addressed cache so a text is only ever synthesized once
//! - Compute device selection (MPS, CUDA, CPU)
//! - Named-voice synthesis with a voice-sample fallback
//! - Post-processing to mono, playback rate and a clipping-free peak

pub mod audio;
pub mod cache;
pub mod config;
pub mod device;
pub mod engines;
pub mod error;
pub mod pipeline;
pub mod player;
pub mod synthesizer;

pub use audio::{AudioIo, AudioPostProcessor, ConditioningSample, VoiceConditioningLoader, WavAudioIo, Waveform};
pub use cache::{CacheKey, CacheStore};
pub use config::SpeechConfig;
pub use device::{BackendProbe, DeviceKind, DeviceSelector, SystemProbe};
pub use engines::{ModelOutput, TtsModel, VoiceConditioning};
pub use error::SpeechError;
pub use pipeline::{SpeakOutcome, SpeakSource, SpeechPipeline};
pub use player::{PlaybackOutcome, Player, ReportOnlyPlayer, SystemPlayer};
pub use synthesizer::{ModelFactory, Strategy, SynthesisOrchestrator, SynthesisRequest};
