//! Audio file decoding, encoding and resampling

use crate::error::SpeechError;
use ndarray::Array2;
use rubato::{FftFixedInOut, Resampler};
use std::path::Path;
use tracing::debug;

const RESAMPLE_CHUNK: usize = 1024;

/// Decode, resample and encode primitives
///
/// Tensors are `[channels, frames]`.
pub trait AudioIo: Send + Sync {
    /// Decode a file into samples in [-1, 1] and its sample rate
    fn load(&self, path: &Path) -> Result<(Array2<f32>, u32), SpeechError>;

    /// Resample every channel from `src_rate` to `dst_rate`
    fn resample(&self, samples: &Array2<f32>, src_rate: u32, dst_rate: u32) -> Result<Array2<f32>, SpeechError>;

    /// Encode samples to a file
    fn save(&self, path: &Path, samples: &Array2<f32>, sample_rate: u32) -> Result<(), SpeechError>;
}

/// WAV backend: `hound` for the container, `rubato` for rate conversion
///
/// Reads 8/16/24/32-bit integer and 32-bit float files; writes 32-bit float.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavAudioIo;

impl AudioIo for WavAudioIo {
    fn load(&self, path: &Path) -> Result<(Array2<f32>, u32), SpeechError> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels as usize;
        if channels == 0 {
            return Err(SpeechError::Audio(format!("{} declares zero channels", path.display())));
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                    return Err(SpeechError::Audio(format!(
                        "Unsupported bits per sample: {}",
                        spec.bits_per_sample
                    )));
                }
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let frames = interleaved.len() / channels;
        let mut interleaved = interleaved;
        interleaved.truncate(frames * channels);

        // Interleaved data is [frames, channels]; transpose to channel-major
        let samples = Array2::from_shape_vec((frames, channels), interleaved)
            .map_err(|e| SpeechError::Audio(format!("Malformed sample data: {}", e)))?
            .reversed_axes();

        debug!(
            "Decoded {}: {} channel(s), {} frames @ {} Hz",
            path.display(),
            channels,
            frames,
            spec.sample_rate
        );
        Ok((samples, spec.sample_rate))
    }

    fn resample(&self, samples: &Array2<f32>, src_rate: u32, dst_rate: u32) -> Result<Array2<f32>, SpeechError> {
        if src_rate == 0 || dst_rate == 0 {
            return Err(SpeechError::Audio(format!(
                "Cannot resample between {} Hz and {} Hz",
                src_rate, dst_rate
            )));
        }
        if src_rate == dst_rate {
            return Ok(samples.clone());
        }

        let channels = samples.nrows();
        let frames = samples.ncols();
        if channels == 0 {
            return Err(SpeechError::Audio("Cannot resample zero channels".to_string()));
        }
        if frames == 0 {
            return Ok(Array2::zeros((channels, 0)));
        }

        let mut resampler =
            FftFixedInOut::<f32>::new(src_rate as usize, dst_rate as usize, RESAMPLE_CHUNK, channels)
                .map_err(|e| SpeechError::Audio(format!("Resampler init failed: {}", e)))?;

        let input: Vec<Vec<f32>> = samples.outer_iter().map(|row| row.to_vec()).collect();
        let chunk_size = resampler.input_frames_max();
        let delay = resampler.output_delay();
        let expected = (frames as f64 * dst_rate as f64 / src_rate as f64).round() as usize;
        let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(delay + expected); channels];

        // Keep feeding (zeros once the input runs out) until the delayed tail is flushed
        let mut pos = 0;
        while output[0].len() < delay + expected {
            let start = pos.min(frames);
            let end = (pos + chunk_size).min(frames);
            let block: Vec<Vec<f32>> = input
                .iter()
                .map(|channel| {
                    let mut padded = channel[start..end].to_vec();
                    padded.resize(chunk_size, 0.0);
                    padded
                })
                .collect();

            let result = resampler
                .process(&block, None)
                .map_err(|e| SpeechError::Audio(format!("Resampling failed: {}", e)))?;
            if result.first().map_or(true, Vec::is_empty) {
                return Err(SpeechError::Audio("Resampler produced no output".to_string()));
            }
            for (out, chunk) in output.iter_mut().zip(result) {
                out.extend_from_slice(&chunk);
            }
            pos += chunk_size;
        }

        // Drop the filter delay, then the output of the zero padding
        let mut flat = Vec::with_capacity(expected * channels);
        for channel in output {
            flat.extend_from_slice(&channel[delay..delay + expected]);
        }

        Array2::from_shape_vec((channels, expected), flat)
            .map_err(|e| SpeechError::Audio(format!("Malformed resampler output: {}", e)))
    }

    fn save(&self, path: &Path, samples: &Array2<f32>, sample_rate: u32) -> Result<(), SpeechError> {
        let channels = samples.nrows();
        if channels == 0 || channels > u16::MAX as usize {
            return Err(SpeechError::Audio(format!("Cannot write {} channels", channels)));
        }

        let spec = hound::WavSpec {
            channels: channels as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for frame in samples.columns() {
            for &sample in frame {
                writer.write_sample(sample)?;
            }
        }
        writer.finalize()?;

        debug!(
            "Wrote {} frames @ {} Hz to {}",
            samples.ncols(),
            sample_rate,
            path.display()
        );
        Ok(())
    }
}
