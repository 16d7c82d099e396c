//! WAV concatenation and duration measurement.

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::SynthesisError;

/// Summary of a written WAV file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavSummary {
    pub spec: WavSpec,
    /// Samples per channel.
    pub frames: u64,
}

impl WavSummary {
    pub fn duration_secs(&self) -> f64 {
        self.frames as f64 / self.spec.sample_rate as f64
    }
}

fn open(path: &Path) -> Result<WavReader<std::io::BufReader<std::fs::File>>, SynthesisError> {
    WavReader::open(path).map_err(|source| wav_error(path, source))
}

fn wav_error(path: &Path, source: hound::Error) -> SynthesisError {
    SynthesisError::Wav {
        path: path.to_path_buf(),
        source,
    }
}

fn describe(spec: &WavSpec) -> String {
    let format = match spec.sample_format {
        SampleFormat::Int => "int",
        SampleFormat::Float => "float",
    };
    format!(
        "{}ch {}Hz {}-bit {}",
        spec.channels, spec.sample_rate, spec.bits_per_sample, format
    )
}

/// Concatenate WAV files sample-for-sample into `output`.
///
/// All inputs must share channel count, sample rate and sample format.
/// No resampling or cross-fade is applied.
pub fn concatenate(inputs: &[PathBuf], output: &Path) -> Result<WavSummary, SynthesisError> {
    let first = inputs.first().ok_or(SynthesisError::NoSentences)?;
    let spec = open(first)?.spec();

    let mut writer = WavWriter::create(output, spec).map_err(|e| wav_error(output, e))?;
    let mut frames = 0u64;

    for (index, path) in inputs.iter().enumerate() {
        let mut reader = open(path)?;
        let segment_spec = reader.spec();
        if segment_spec != spec {
            return Err(SynthesisError::IncompatibleSegments {
                index,
                expected: describe(&spec),
                found: describe(&segment_spec),
            });
        }

        frames += u64::from(reader.duration());
        match spec.sample_format {
            SampleFormat::Float => {
                for sample in reader.samples::<f32>() {
                    let sample = sample.map_err(|e| wav_error(path, e))?;
                    writer.write_sample(sample).map_err(|e| wav_error(output, e))?;
                }
            }
            SampleFormat::Int => {
                for sample in reader.samples::<i32>() {
                    let sample = sample.map_err(|e| wav_error(path, e))?;
                    writer.write_sample(sample).map_err(|e| wav_error(output, e))?;
                }
            }
        }
    }

    writer.finalize().map_err(|e| wav_error(output, e))?;

    Ok(WavSummary { spec, frames })
}

/// Duration of a WAV file in seconds.
pub fn duration_secs(path: &Path) -> Result<f64, SynthesisError> {
    let reader = open(path)?;
    let summary = WavSummary {
        spec: reader.spec(),
        frames: u64::from(reader.duration()),
    };
    Ok(summary.duration_secs())
}
