use std::path::Path;

use async_trait::async_trait;
use hound::{SampleFormat, WavReader};

use crate::{
    accessor::AudioFileAccessor,
    audio::chunk::{AudioChunk, AudioFormat},
    foundation::error::{MontageError, MontageResult},
};

/// Reads PCM and float WAV files from disk with `hound`, on a blocking task.
#[derive(Clone, Copy, Debug, Default)]
pub struct WavAudioAccessor;

#[async_trait]
impl AudioFileAccessor for WavAudioAccessor {
    async fn get_audio(
        &self,
        path: &Path,
        start_seconds: Option<f64>,
        duration_seconds: Option<f64>,
    ) -> MontageResult<AudioChunk> {
        let owned = path.to_path_buf();
        run_blocking(move || {
            read_wav_range(&owned, |rate| {
                let rate = f64::from(rate);
                let start = (start_seconds.unwrap_or(0.0).max(0.0) * rate).round() as u64;
                let len = duration_seconds.map(|d| (d.max(0.0) * rate).round() as usize);
                (start, len)
            })
        })
        .await
    }

    async fn get_audio_by_sample(
        &self,
        path: &Path,
        start_sample: u64,
        sample_count: usize,
        sample_rate: u32,
    ) -> MontageResult<AudioChunk> {
        let owned = path.to_path_buf();
        run_blocking(move || {
            read_wav_range(&owned, |rate| {
                if rate == sample_rate || sample_rate == 0 {
                    return (start_sample, Some(sample_count));
                }
                let ratio = f64::from(rate) / f64::from(sample_rate);
                let start = (start_sample as f64 * ratio).round() as u64;
                let len = (sample_count as f64 * ratio).round() as usize;
                (start, Some(len))
            })
        })
        .await
    }
}

async fn run_blocking<F>(f: F) -> MontageResult<AudioChunk>
where
    F: FnOnce() -> MontageResult<AudioChunk> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| MontageError::media(format!("wav read task failed: {e}")))?
}

/// Read frames `[start, start + len)` (to the end when `len` is `None`) in the file's
/// native format. `range` maps the file's sample rate to that window.
#[tracing::instrument(level = "debug", skip(range))]
fn read_wav_range(
    path: &Path,
    range: impl FnOnce(u32) -> (u64, Option<usize>),
) -> MontageResult<AudioChunk> {
    let mut reader = WavReader::open(path)
        .map_err(|e| MontageError::media(format!("open wav '{}': {e}", path.display())))?;
    let spec = reader.spec();
    let format = AudioFormat::new(spec.sample_rate, spec.channels)?;
    let (start, len) = range(spec.sample_rate);

    let total = u64::from(reader.duration());
    let start = start.min(total);
    let available = (total - start) as usize;
    let frames = len.map_or(available, |l| l.min(available));

    reader
        .seek(start as u32)
        .map_err(|e| MontageError::media(format!("seek wav '{}': {e}", path.display())))?;
    let take = frames * format.channel_count();

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, _) => collect(reader.samples::<f32>().take(take), |v| v),
        (SampleFormat::Int, 8) => collect(reader.samples::<i8>().take(take), |v| {
            f32::from(v) / 128.0
        }),
        (SampleFormat::Int, 16) => collect(reader.samples::<i16>().take(take), |v| {
            f32::from(v) / 32_768.0
        }),
        (SampleFormat::Int, bits @ (24 | 32)) => {
            let scale = (1u64 << (bits - 1)) as f32;
            collect(reader.samples::<i32>().take(take), |v| v as f32 / scale)
        }
        (SampleFormat::Int, bits) => {
            return Err(MontageError::media(format!(
                "unsupported wav bit depth {bits} in '{}'",
                path.display()
            )));
        }
    }
    .map_err(|e| MontageError::media(format!("read wav '{}': {e}", path.display())))?;

    AudioChunk::from_interleaved(format, samples)
}

fn collect<S>(
    samples: impl Iterator<Item = hound::Result<S>>,
    to_f32: impl Fn(S) -> f32,
) -> hound::Result<Vec<f32>> {
    samples.map(|s| s.map(&to_f32)).collect()
}

#[cfg(test)]
#[path = "../../tests/unit/accessor/wav.rs"]
mod tests;
