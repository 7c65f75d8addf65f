//! WAV file loading and writing through `hound`.

use std::path::Path;

use centercut_lib::dsp::pcm::{float_to_int, int_to_float};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::error::CliError;

/// A decoded WAV file as interleaved floats in [-1, 1].
pub struct WavAudio {
    pub spec: WavSpec,
    pub samples: Vec<f32>,
}

impl WavAudio {
    pub fn channels(&self) -> usize {
        self.spec.channels as usize
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels().max(1)
    }
}

pub fn read_wav(path: &Path) -> Result<WavAudio, CliError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| int_to_float(value, bits) as f32))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    debug!(
        "read {}: {} Hz, {} channel(s), {} bits {:?}, {} samples",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        spec.sample_format,
        samples.len()
    );
    Ok(WavAudio { spec, samples })
}

/// Write interleaved floats using `spec`'s sample format and width.
pub fn write_wav(path: &Path, spec: WavSpec, samples: &[f32]) -> Result<(), CliError> {
    let mut writer = WavWriter::create(path, spec)?;
    match spec.sample_format {
        SampleFormat::Float => {
            for &sample in samples {
                writer.write_sample(sample)?;
            }
        }
        SampleFormat::Int => {
            for &sample in samples {
                writer.write_sample(float_to_int(sample as f64, spec.bits_per_sample))?;
            }
        }
    }
    writer.finalize()?;
    debug!("wrote {} samples to {}", samples.len(), path.display());
    Ok(())
}

/// Format of the float stereo files the mixer writes.
pub fn float_stereo_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_files_round_trip_through_pcm_quantization() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("int.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let samples = [0.5, -0.5, 1.0, -1.0, 1.5 / 32_768.0, 0.0];
        write_wav(&path, spec, &samples).expect("write");

        let raw: Vec<i32> = WavReader::open(&path)
            .expect("reader")
            .samples::<i32>()
            .collect::<Result<_, _>>()
            .expect("samples");
        assert_eq!(raw, vec![16_384, -16_384, 32_767, -32_768, 2, 0]);

        let audio = read_wav(&path).expect("read");
        assert_eq!(audio.frames(), 3);
        assert_eq!(audio.samples[0], 0.5);
        assert_eq!(audio.samples[3], -1.0);
    }
}
