//! WAV output for stitched tracks.

use std::path::Path;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;

use super::stitcher::AudioTrack;
use super::util::f32_to_i16;

/// Write a track as 16-bit PCM WAV.
///
/// # Arguments
/// * `track` - Stitched audio
/// * `path` - Destination file (overwritten)
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn write_wav(track: &AudioTrack, path: &Path) -> Result<()> {
    let spec = WavSpec { channels: track.channels, sample_rate: track.sample_rate, bits_per_sample: 16, sample_format: SampleFormat::Int };

    let mut writer = WavWriter::create(path, spec).with_context(|| format!("Failed to create {}", path.display()))?;
    for &sample in &track.samples {
        writer.write_sample(f32_to_i16(sample))?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;

    info!("💾 Saved {:.2}s of audio to {}", track.duration_secs(), path.display());
    Ok(())
}
