use crate::foundation::error::{MontageError, MontageResult};

/// Sample rate and channel layout of an [`AudioChunk`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16) -> MontageResult<Self> {
        let format = Self {
            sample_rate,
            channels,
        };
        format.validate()?;
        Ok(format)
    }

    pub fn validate(self) -> MontageResult<()> {
        if self.sample_rate == 0 {
            return Err(MontageError::validation("audio sample_rate must be > 0"));
        }
        if self.channels == 0 {
            return Err(MontageError::validation("audio channels must be > 0"));
        }
        Ok(())
    }

    pub fn channel_count(self) -> usize {
        usize::from(self.channels)
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

/// A block of interleaved `f32` PCM in `[-1, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioChunk {
    format: AudioFormat,
    samples: Vec<f32>,
}

impl AudioChunk {
    /// `len` frames of silence.
    pub fn silent(format: AudioFormat, len: usize) -> Self {
        Self {
            format,
            samples: vec![0.0; len * format.channel_count()],
        }
    }

    pub fn from_interleaved(format: AudioFormat, samples: Vec<f32>) -> MontageResult<Self> {
        format.validate()?;
        if samples.len() % format.channel_count() != 0 {
            return Err(MontageError::validation(format!(
                "interleaved sample count {} is not a multiple of {} channels",
                samples.len(),
                format.channels
            )));
        }
        Ok(Self { format, samples })
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Frames per channel.
    pub fn len(&self) -> usize {
        self.samples.len() / self.format.channel_count().max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn frames(&self) -> std::slice::ChunksExact<'_, f32> {
        self.samples.chunks_exact(self.format.channel_count().max(1))
    }

    pub fn frames_mut(&mut self) -> std::slice::ChunksExactMut<'_, f32> {
        let channels = self.format.channel_count().max(1);
        self.samples.chunks_exact_mut(channels)
    }

    /// Multiply every sample by `gain` and clamp to `[-1, 1]`.
    pub fn apply_gain(&mut self, gain: f32) {
        for s in &mut self.samples {
            *s = (*s * gain).clamp(-1.0, 1.0);
        }
    }

    /// Multiply every sample by `gain` without clamping, for intermediate mix buses.
    pub fn scale(&mut self, gain: f32) {
        for s in &mut self.samples {
            *s *= gain;
        }
    }

    pub fn clamp_in_place(&mut self) {
        for s in &mut self.samples {
            *s = s.clamp(-1.0, 1.0);
        }
    }

    /// Add `other` into `self` starting at frame `offset`. Samples past the end are dropped.
    pub fn mix_in(&mut self, other: &AudioChunk, offset: usize) -> MontageResult<()> {
        if other.format != self.format {
            return Err(MontageError::evaluation(format!(
                "cannot mix {:?} into {:?}",
                other.format, self.format
            )));
        }
        let channels = self.format.channel_count();
        let start = offset.saturating_mul(channels);
        if start >= self.samples.len() {
            return Ok(());
        }
        for (dst, src) in self.samples[start..].iter_mut().zip(&other.samples) {
            *dst += *src;
        }
        Ok(())
    }

    /// Resample and remap into exactly `len` frames of `target`.
    ///
    /// Resampling is linear. Channels map mono to all, all to mono by averaging, and
    /// otherwise by index modulo the source channel count. Missing frames stay silent.
    pub fn convert_to(&self, target: AudioFormat, len: usize) -> AudioChunk {
        let mut out = AudioChunk::silent(target, len);
        let src_frames = self.len();
        let src_channels = self.format.channel_count();
        if src_frames == 0 || src_channels == 0 || target.sample_rate == 0 {
            return out;
        }

        let same_rate = self.format.sample_rate == target.sample_rate;
        let step = f64::from(self.format.sample_rate) / f64::from(target.sample_rate);

        for (i, dst) in out.frames_mut().enumerate() {
            let (f0, f1, frac) = if same_rate {
                if i >= src_frames {
                    break;
                }
                (i, i, 0.0f32)
            } else {
                let pos = (i as f64) * step;
                let f0 = pos.floor() as usize;
                if f0 >= src_frames {
                    break;
                }
                let f1 = (f0 + 1).min(src_frames - 1);
                (f0, f1, (pos - f0 as f64) as f32)
            };

            for (c, sample) in dst.iter_mut().enumerate() {
                let v0 = self.remapped(f0, c, target.channels);
                let v1 = self.remapped(f1, c, target.channels);
                *sample = v0 + (v1 - v0) * frac;
            }
        }
        out
    }

    fn remapped(&self, frame: usize, dst_channel: usize, dst_channels: u16) -> f32 {
        let src_channels = self.format.channel_count();
        let base = frame * src_channels;
        let px = &self.samples[base..base + src_channels];
        if src_channels == usize::from(dst_channels) {
            px[dst_channel]
        } else if src_channels == 1 {
            px[0]
        } else if dst_channels == 1 {
            px.iter().sum::<f32>() / src_channels as f32
        } else {
            px[dst_channel % src_channels]
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/chunk.rs"]
mod tests;
