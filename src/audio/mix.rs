use std::path::Path;

use crate::{
    audio::chunk::AudioChunk,
    foundation::core::{Fps, FrameSpan},
    foundation::error::{MontageError, MontageResult},
};

/// Convert a frame count to the nearest sample count at `sample_rate`.
pub fn frame_to_sample(frame_delta: u64, fps: Fps, sample_rate: u32) -> u64 {
    let num = u128::from(frame_delta) * u128::from(sample_rate) * u128::from(fps.den);
    let den = u128::from(fps.num).max(1);
    ((num + (den / 2)) / den) as u64
}

/// Frame containing `sample` (floor).
pub fn sample_to_frame(sample: u64, fps: Fps, sample_rate: u32) -> u64 {
    let num = u128::from(sample) * u128::from(fps.num);
    let den = (u128::from(sample_rate) * u128::from(fps.den)).max(1);
    (num / den) as u64
}

/// Where a clip's audio lands inside a mix window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipWindow {
    /// First sample to fetch, relative to the clip's own start.
    pub clip_sample: u64,
    /// Frame offset into the output chunk.
    pub out_offset: usize,
    pub len: usize,
}

/// Intersect a clip's span with the timeline window `[window_start, window_start + window_len)`.
pub fn clip_window(
    span: FrameSpan,
    window_start: u64,
    window_len: usize,
    fps: Fps,
    sample_rate: u32,
) -> Option<ClipWindow> {
    let clip_start = frame_to_sample(span.start.0, fps, sample_rate);
    let clip_end = frame_to_sample(span.end.0.saturating_add(1), fps, sample_rate);
    let window_end = window_start.saturating_add(window_len as u64);

    let lo = clip_start.max(window_start);
    let hi = clip_end.min(window_end);
    if lo >= hi {
        return None;
    }
    Some(ClipWindow {
        clip_sample: lo - clip_start,
        out_offset: (lo - window_start) as usize,
        len: (hi - lo) as usize,
    })
}

/// Write interleaved `f32` PCM as raw little-endian `.f32le`.
pub fn write_f32le(chunk: &AudioChunk, out_path: &Path) -> MontageResult<()> {
    if let Some(parent) = out_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            MontageError::evaluation(format!(
                "failed to create audio output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let bytes: Vec<u8> = chunk
        .samples()
        .iter()
        .flat_map(|s| s.to_le_bytes())
        .collect();
    std::fs::write(out_path, bytes).map_err(|e| {
        MontageError::evaluation(format!(
            "failed to write audio file '{}': {e}",
            out_path.display()
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
