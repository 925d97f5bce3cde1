//! WAV output for rendered channels.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Writes planar `channels` as an interleaved WAV file.
///
/// `bits_per_sample` of 32 writes IEEE float; 16 and 24 write PCM.
pub fn write_planar(
    path: &Path,
    channels: &[Vec<f32>],
    sample_rate: u32,
    bits_per_sample: u16,
) -> anyhow::Result<()> {
    if !matches!(bits_per_sample, 16 | 24 | 32) {
        anyhow::bail!("Unsupported bit depth {bits_per_sample} (expected 16, 24 or 32)");
    }
    if channels.is_empty() {
        anyhow::bail!("Nothing to write: no channels");
    }

    let spec = WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample,
        sample_format: if bits_per_sample == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };
    let mut writer = WavWriter::create(path, spec)?;
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);

    if bits_per_sample == 32 {
        for i in 0..frames {
            for channel in channels {
                writer.write_sample(channel[i])?;
            }
        }
    } else {
        let max_val = (1i32 << (bits_per_sample - 1)) as f32;
        for i in 0..frames {
            for channel in channels {
                let int_sample = (channel[i] * max_val).clamp(-max_val, max_val - 1.0) as i32;
                writer.write_sample(int_sample)?;
            }
        }
    }

    writer.finalize()?;
    Ok(())
}
