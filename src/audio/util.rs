//! Shared audio helpers for stitching and encoding.

/// Number of interleaved samples in `ms` milliseconds of silence.
///
/// # Arguments
/// * `ms` - Duration in milliseconds
/// * `sample_rate` - Frames per second
/// * `channels` - Interleaved channel count
///
/// # Returns
/// Whole frames times channels, rounded down.
pub fn silence_len(ms: u32, sample_rate: u32, channels: u16) -> usize {
    let frames = (u64::from(sample_rate) * u64::from(ms) / 1000) as usize;
    frames * channels as usize
}

/// Playback duration of interleaved samples, in seconds.
pub fn duration_secs(sample_count: usize, sample_rate: u32, channels: u16) -> f64 {
    if sample_rate == 0 || channels == 0 {
        return 0.0;
    }
    sample_count as f64 / channels as f64 / sample_rate as f64
}

/// Convert an f32 sample in [-1, 1] to 16-bit PCM, clamping out-of-range values.
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
