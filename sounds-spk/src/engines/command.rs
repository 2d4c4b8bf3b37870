//! Model backed by an external synthesis program
//!
//! The program is invoked as
//!
//! ```text
//! <program> --text <text> --preset <preset> --device <cpu|mps|cuda> --output <file.wav>
//!           (--voice <name> | --voice-sample <clip.wav> ...)
//! ```
//!
//! and must write a WAV file to `--output`. Conditioning clips are handed over
//! as temporary WAV files at their own rate.

use crate::audio::io::AudioIo;
use crate::device::DeviceKind;
use crate::engines::{ModelOutput, TtsModel, VoiceConditioning};
use crate::error::SpeechError;
use crate::synthesizer::ModelFactory;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info};

const MAX_TEXT_LENGTH: usize = 100_000;

/// External-program TTS model
pub struct CommandTtsModel {
    program: PathBuf,
    device: DeviceKind,
    io: Arc<dyn AudioIo>,
}

impl CommandTtsModel {
    /// Create a model running `program` on `device`
    ///
    /// A bare program name is looked up on `PATH`.
    pub fn new(program: impl AsRef<Path>, device: DeviceKind, io: Arc<dyn AudioIo>) -> Result<Self, SpeechError> {
        let program = program.as_ref();
        let resolved = if program.components().count() > 1 {
            if !program.is_file() {
                return Err(SpeechError::Model(format!(
                    "Model program not found at: {}",
                    program.display()
                )));
            }
            program.to_path_buf()
        } else {
            find_executable(program).ok_or_else(|| {
                SpeechError::Model(format!(
                    "Model program '{}' not found on PATH. Install it or set TTS_MODEL_CMD",
                    program.display()
                ))
            })?
        };

        info!("Loading model {} (device={})", resolved.display(), device);
        Ok(Self {
            program: resolved,
            device,
            io,
        })
    }

    pub fn device(&self) -> DeviceKind {
        self.device
    }
}

#[async_trait]
impl TtsModel for CommandTtsModel {
    async fn synthesize(
        &self,
        text: &str,
        conditioning: &VoiceConditioning,
        preset: &str,
    ) -> Result<ModelOutput, SpeechError> {
        if text.is_empty() {
            return Err(SpeechError::Model("Text cannot be empty".to_string()));
        }

        if text.len() > MAX_TEXT_LENGTH {
            return Err(SpeechError::Model(format!("Text too long (max {} bytes)", MAX_TEXT_LENGTH)));
        }

        // Arguments are passed without a shell; only control characters go
        let sanitized: String = text
            .chars()
            .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
            .collect();

        let workdir = tempfile::Builder::new()
            .prefix("sounds-model-")
            .tempdir()
            .map_err(|e| SpeechError::Model(format!("Failed to create work directory: {}", e)))?;
        let output_path = workdir.path().join("output.wav");

        let mut cmd = Command::new(&self.program);
        cmd.arg("--text")
            .arg(&sanitized)
            .arg("--preset")
            .arg(preset)
            .arg("--device")
            .arg(self.device.as_str())
            .arg("--output")
            .arg(&output_path);

        match conditioning {
            VoiceConditioning::NamedVoice(name) => {
                cmd.arg("--voice").arg(name);
            }
            VoiceConditioning::Samples(samples) => {
                if samples.is_empty() {
                    return Err(SpeechError::Model("No voice samples given".to_string()));
                }
                for (i, sample) in samples.iter().enumerate() {
                    let clip = workdir.path().join(format!("voice_sample_{}.wav", i));
                    self.io.save(&clip, &sample.waveform, sample.sample_rate)?;
                    cmd.arg("--voice-sample").arg(&clip);
                }
            }
        }

        debug!("Running {} with {}", self.program.display(), conditioning.describe());
        let output = cmd
            .output()
            .await
            .map_err(|e| SpeechError::Model(format!("Failed to execute {}: {}", self.program.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::Model(format!(
                "Synthesis exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let (samples, rate) = self
            .io
            .load(&output_path)
            .map_err(|e| SpeechError::Model(format!("Unreadable model output: {}", e)))?;
        debug!("Model produced {} frames @ {} Hz", samples.ncols(), rate);

        Ok(ModelOutput::Single(samples.into_dyn()))
    }

    fn is_available(&self) -> bool {
        self.program.is_file()
    }

    fn name(&self) -> &str {
        "command"
    }
}

/// Locate `command` in `PATH`
pub(crate) fn find_executable(command: &Path) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(command))
        .find(|candidate| candidate.is_file())
}

/// Factory building a [`CommandTtsModel`] for whichever device gets selected
pub fn command_model_factory(program: PathBuf, io: Arc<dyn AudioIo>) -> ModelFactory {
    Arc::new(move |device: DeviceKind| -> Result<Arc<dyn TtsModel>, SpeechError> {
        let model = CommandTtsModel::new(&program, device, io.clone())?;
        Ok(Arc::new(model))
    })
}
