//! Post-processing of model output into a playable mono waveform

use crate::audio::io::AudioIo;
use crate::audio::{Tensor, Waveform};
use crate::config::PEAK_CEILING;
use crate::error::SpeechError;
use ndarray::{Array1, Array2, Axis, Ix1};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns raw model output into mono audio at the playback rate with a safe peak
pub struct AudioPostProcessor {
    io: Arc<dyn AudioIo>,
    peak_ceiling: f32,
}

impl AudioPostProcessor {
    pub fn new(io: Arc<dyn AudioIo>) -> Self {
        Self::with_ceiling(io, PEAK_CEILING)
    }

    pub fn with_ceiling(io: Arc<dyn AudioIo>, peak_ceiling: f32) -> Self {
        Self { io, peak_ceiling }
    }

    /// Downmix, resample and limit the peak
    ///
    /// `source_rate` is taken as the rate of `waveform` regardless of the rate
    /// it carries. Never fails: when resampling does not work the audio is kept
    /// at `source_rate`.
    pub fn process(&self, waveform: Waveform, source_rate: u32, target_rate: u32) -> Waveform {
        let mut mono = to_mono(waveform.samples);
        mono.mapv_inplace(|s| if s.is_finite() { s } else { 0.0 });

        let framed = mono.clone().insert_axis(Axis(0));
        let (mut mono, rate) = match self.io.resample(&framed, source_rate, target_rate) {
            Ok(resampled) if resampled.nrows() == 1 => (resampled.row(0).to_owned(), target_rate),
            Ok(resampled) => {
                warn!(
                    "Resampler returned {} channels, keeping audio at {} Hz",
                    resampled.nrows(),
                    source_rate
                );
                (mono, source_rate)
            }
            Err(e) => {
                warn!("Resampling {} -> {} Hz failed, keeping {} Hz: {}", source_rate, target_rate, source_rate, e);
                (mono, source_rate)
            }
        };

        let gain = normalize_peak(&mut mono, self.peak_ceiling);
        if gain < 1.0 {
            debug!("Peak normalized with gain {:.4}", gain);
        }

        Waveform::mono(mono, rate)
    }

    /// Write a processed waveform with the `[1, frames]` layout the encoder expects
    pub fn save(&self, path: &Path, waveform: &Waveform) -> Result<(), SpeechError> {
        let framed = to_mono(waveform.samples.clone()).insert_axis(Axis(0));
        self.io.save(path, &framed, waveform.sample_rate)
    }
}

/// Collapse any tensor shape to one channel
///
/// `[T]` passes through, `[1, T]` is flattened, `[N, T]` is averaged over
/// channels. Higher ranks treat every leading axis as channels; a scalar
/// becomes a single sample.
pub fn to_mono(samples: Tensor) -> Array1<f32> {
    match samples.ndim() {
        0 => Array1::from_elem(1, samples.iter().copied().next().unwrap_or(0.0)),
        1 => samples
            .into_dimensionality::<Ix1>()
            .unwrap_or_else(|_| Array1::zeros(0)),
        _ => {
            let frames = samples.shape().last().copied().unwrap_or(0);
            if frames == 0 {
                return Array1::zeros(0);
            }
            let channels = samples.len() / frames;
            let rows = match Array2::from_shape_vec((channels, frames), samples.iter().copied().collect()) {
                Ok(rows) => rows,
                Err(_) => return Array1::zeros(frames),
            };
            if channels == 1 {
                rows.row(0).to_owned()
            } else {
                rows.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(frames))
            }
        }
    }
}

/// Scale `samples` down so the peak equals `ceiling`, if it is above it
///
/// Returns the applied gain (1.0 when untouched).
pub fn normalize_peak(samples: &mut Array1<f32>, ceiling: f32) -> f32 {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak > ceiling {
        let gain = ceiling / peak;
        samples.mapv_inplace(|s| s * gain);
        gain
    } else {
        1.0
    }
}
