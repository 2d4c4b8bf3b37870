//! Configuration for speech synthesis

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Phrase spoken when no text is given
pub const DEFAULT_PHRASE: &str = "Ciao, sono Sounds, assistente di Arte Registrazioni";

/// Named voice tried by the primary synthesis attempt
pub const DEFAULT_VOICE: &str = "sounds";

/// Preset passed to the model when `TTS_PRESET` is unset
pub const DEFAULT_PRESET: &str = "ultra_fast";

/// Rate conditioning samples are brought to, and the model's nominal output rate
pub const CANONICAL_SAMPLE_RATE: u32 = 22_050;

/// Rate of the files written to the cache
pub const OUTPUT_SAMPLE_RATE: u32 = 44_100;

/// Highest absolute sample value allowed in a persisted waveform
pub const PEAK_CEILING: f32 = 0.99;

/// Number of conditioning clips read from the voice directory
pub const DEFAULT_MAX_VOICE_SAMPLES: usize = 3;

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    /// Voice name for the primary (named voice) attempt
    pub voice: String,

    /// Opaque quality/speed preset forwarded to the model
    pub preset: String,

    /// Directory holding conditioning `.wav` clips for the fallback attempt
    pub voice_dir: PathBuf,

    /// Try accelerated backends before falling back to CPU
    pub use_accelerated: bool,

    /// Directory for synthesized audio, one file per distinct text
    pub cache_dir: PathBuf,

    /// External model program
    pub model_command: PathBuf,

    /// Maximum number of conditioning clips
    pub max_voice_samples: usize,

    /// Rate conditioning clips are resampled to
    pub conditioning_sample_rate: u32,

    /// Rate the model output is assumed to have
    pub model_sample_rate: u32,

    /// Rate of the persisted audio
    pub output_sample_rate: u32,

    /// Peak normalization ceiling
    pub peak_ceiling: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            voice: DEFAULT_VOICE.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            voice_dir: default_voice_dir(),
            use_accelerated: true,
            cache_dir: PathBuf::from("cache"),
            model_command: PathBuf::from("tortoise-tts"),
            max_voice_samples: DEFAULT_MAX_VOICE_SAMPLES,
            conditioning_sample_rate: CANONICAL_SAMPLE_RATE,
            model_sample_rate: CANONICAL_SAMPLE_RATE,
            output_sample_rate: OUTPUT_SAMPLE_RATE,
            peak_ceiling: PEAK_CEILING,
        }
    }
}

impl SpeechConfig {
    /// Build configuration from the process environment
    ///
    /// Recognized variables: `VOICE_DIR`, `USE_MPS`, `TTS_PRESET`,
    /// `TTS_CACHE_DIR` and `TTS_MODEL_CMD`. An empty value counts as unset for
    /// every variable except `USE_MPS`, so `TTS_PRESET=""` selects `ultra_fast`
    /// rather than passing an empty preset to the model.
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("VOICE_DIR").filter(|v| !v.is_empty()) {
            let candidate = expand_tilde(&raw);
            if candidate.is_dir() {
                config.voice_dir = candidate;
            } else {
                warn!(
                    "VOICE_DIR '{}' not found, using default {}",
                    raw,
                    config.voice_dir.display()
                );
            }
        }

        // Only the literal "1" enables acceleration; unset keeps the default
        if let Some(flag) = lookup("USE_MPS") {
            config.use_accelerated = flag == "1";
        }

        if let Some(preset) = lookup("TTS_PRESET").filter(|v| !v.is_empty()) {
            config.preset = preset;
        }

        if let Some(dir) = lookup("TTS_CACHE_DIR").filter(|v| !v.is_empty()) {
            config.cache_dir = expand_tilde(&dir);
        }

        if let Some(cmd) = lookup("TTS_MODEL_CMD").filter(|v| !v.is_empty()) {
            config.model_command = expand_tilde(&cmd);
        }

        config
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.voice.is_empty() {
            return Err("Voice name cannot be empty".to_string());
        }

        if self.voice.len() > 256 {
            return Err("Voice name too long (max 256 chars)".to_string());
        }

        if self.preset.is_empty() {
            return Err("Preset cannot be empty".to_string());
        }

        if self.preset.chars().any(|c| c == '\0' || c.is_control()) {
            return Err("Preset contains invalid characters".to_string());
        }

        if self.cache_dir.as_os_str().is_empty() {
            return Err("Cache directory cannot be empty".to_string());
        }

        if self.model_command.as_os_str().is_empty() {
            return Err("Model command cannot be empty".to_string());
        }

        if self.max_voice_samples == 0 {
            return Err("At least one voice sample must be allowed".to_string());
        }

        if self.max_voice_samples > 64 {
            return Err("Too many voice samples (max 64)".to_string());
        }

        for (name, rate) in [
            ("Conditioning", self.conditioning_sample_rate),
            ("Model", self.model_sample_rate),
            ("Output", self.output_sample_rate),
        ] {
            if rate == 0 || rate > 384_000 {
                return Err(format!("{} sample rate must be between 1 and 384000 Hz", name));
            }
        }

        if !(self.peak_ceiling > 0.0 && self.peak_ceiling <= 1.0) {
            return Err("Peak ceiling must be in (0.0, 1.0]".to_string());
        }

        Ok(())
    }
}

/// Built-in voice directory: `voices/sounds` next to the executable
pub fn default_voice_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default()
        .join("voices")
        .join("sounds")
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}
