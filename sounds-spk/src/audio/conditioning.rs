//! Loading of voice conditioning clips

use crate::audio::io::AudioIo;
use crate::audio::ConditioningSample;
use crate::config::CANONICAL_SAMPLE_RATE;
use crate::error::SpeechError;
use ndarray::{Array2, Axis};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reads reference clips from a directory and brings them to a common layout
///
/// Clips come out mono as `[1, frames]` at the canonical rate.
pub struct VoiceConditioningLoader {
    io: Arc<dyn AudioIo>,
    target_rate: u32,
}

impl VoiceConditioningLoader {
    pub fn new(io: Arc<dyn AudioIo>) -> Self {
        Self::with_rate(io, CANONICAL_SAMPLE_RATE)
    }

    pub fn with_rate(io: Arc<dyn AudioIo>, target_rate: u32) -> Self {
        Self { io, target_rate }
    }

    /// Load up to `max_samples` clips from `directory`
    ///
    /// Candidates are the `.wav` files (any case), sorted by file name. A clip
    /// that fails to decode or resample is skipped with a warning.
    pub fn load(&self, directory: &Path, max_samples: usize) -> Result<Vec<ConditioningSample>, SpeechError> {
        if !directory.is_dir() {
            return Err(SpeechError::VoiceDirectoryMissing(directory.to_path_buf()));
        }

        let candidates = list_wav_files(directory, max_samples)?;
        if candidates.is_empty() {
            return Err(SpeechError::NoUsableSamples {
                dir: directory.to_path_buf(),
                candidates: 0,
            });
        }

        let mut samples = Vec::with_capacity(candidates.len());
        for path in &candidates {
            match self.load_one(path) {
                Ok(sample) => {
                    debug!("Loaded voice sample {} ({} frames)", path.display(), sample.frames());
                    samples.push(sample);
                }
                Err(e) => {
                    warn!("Skipping voice sample {}: {}", path.display(), e);
                }
            }
        }

        if samples.is_empty() {
            return Err(SpeechError::NoUsableSamples {
                dir: directory.to_path_buf(),
                candidates: candidates.len(),
            });
        }

        info!(
            "Prepared {} voice sample(s) from {}",
            samples.len(),
            directory.display()
        );
        Ok(samples)
    }

    fn load_one(&self, path: &Path) -> Result<ConditioningSample, SpeechError> {
        let (waveform, sample_rate) = self.io.load(path)?;
        let mut waveform = downmix_keep_channel(waveform)?;

        if sample_rate != self.target_rate {
            waveform = self.io.resample(&waveform, sample_rate, self.target_rate)?;
        }

        Ok(ConditioningSample {
            waveform,
            sample_rate: self.target_rate,
        })
    }
}

impl Default for VoiceConditioningLoader {
    fn default() -> Self {
        Self::new(Arc::new(crate::audio::io::WavAudioIo))
    }
}

/// Sorted `.wav` files in `directory`, at most `limit` of them
pub fn list_wav_files(directory: &Path, limit: usize) -> Result<Vec<PathBuf>, SpeechError> {
    // Names are compared as raw OS strings so non-UTF-8 names still sort and load
    let mut names: Vec<OsString> = std::fs::read_dir(directory)?
        .flatten()
        .filter(|entry| entry.file_type().map(|t| !t.is_dir()).unwrap_or(false))
        .map(|entry| entry.file_name())
        .filter(|name| name.to_string_lossy().to_lowercase().ends_with(".wav"))
        .collect();

    names.sort();
    Ok(names
        .into_iter()
        .take(limit)
        .map(|name| directory.join(name))
        .collect())
}

/// Average channels into one, keeping the channel axis (`[1, frames]`)
fn downmix_keep_channel(waveform: Array2<f32>) -> Result<Array2<f32>, SpeechError> {
    if waveform.nrows() <= 1 {
        return Ok(waveform);
    }
    waveform
        .mean_axis(Axis(0))
        .map(|mono| mono.insert_axis(Axis(0)))
        .ok_or_else(|| SpeechError::Audio("Cannot average an empty clip".to_string()))
}
