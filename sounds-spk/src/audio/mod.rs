//! Waveform types and audio processing stages

pub mod conditioning;
pub mod io;
pub mod postprocess;

use ndarray::{Array1, Array2, ArrayD};

pub use conditioning::VoiceConditioningLoader;
pub use io::{AudioIo, WavAudioIo};
pub use postprocess::AudioPostProcessor;

/// Raw model output: `[T]`, `[1, T]` or `[channels, T]`
pub type Tensor = ArrayD<f32>;

/// Audio samples with their rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Tensor,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Tensor, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// Single-channel waveform stored flat (`[T]`)
    pub fn mono(samples: Array1<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into_dyn(),
            sample_rate,
        }
    }

    /// Number of channels; flat tensors count as one
    pub fn channels(&self) -> usize {
        match self.samples.ndim() {
            0 | 1 => 1,
            _ => self.samples.shape()[0],
        }
    }

    /// Samples per channel
    pub fn frames(&self) -> usize {
        self.samples.shape().last().copied().unwrap_or(1)
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }
}

/// Reference clip used to steer the voice
///
/// Always `[1, samples]`: consumers slice by channel, so the channel axis is
/// kept even for mono audio.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditioningSample {
    pub waveform: Array2<f32>,
    pub sample_rate: u32,
}

impl ConditioningSample {
    pub fn frames(&self) -> usize {
        self.waveform.ncols()
    }
}
