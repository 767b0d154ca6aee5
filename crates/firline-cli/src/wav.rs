//! WAV file reading and writing.

use hound::{SampleFormat, WavReader, WavWriter};
use std::path::Path;

/// Deinterleaved stereo audio.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoAudio {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count of the source file.
    pub source_channels: u16,
}

impl StereoAudio {
    /// Frames per channel.
    pub fn len(&self) -> usize {
        self.left.len()
    }
}

/// Read a WAV file as stereo.
///
/// Mono files are duplicated to both channels. Files with more than two
/// channels keep the first two.
pub fn read_stereo(path: &Path) -> anyhow::Result<StereoAudio> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        anyhow::bail!("{} has no audio channels", path.display());
    }

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let (left, right) = if channels == 1 {
        (samples.clone(), samples)
    } else {
        samples
            .chunks_exact(channels)
            .map(|frame| (frame[0], frame[1]))
            .unzip()
    };

    Ok(StereoAudio {
        left,
        right,
        sample_rate: spec.sample_rate,
        source_channels: spec.channels,
    })
}

/// Write stereo audio as 32-bit float WAV.
pub fn write_stereo_f32(
    path: &Path,
    left: &[f32],
    right: &[f32],
    sample_rate: u32,
) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for (&l, &r) in left.iter().zip(right) {
        writer.write_sample(l)?;
        writer.write_sample(r)?;
    }
    writer.finalize()?;
    Ok(())
}
