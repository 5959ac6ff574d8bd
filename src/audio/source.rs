use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    accessor::{FileAccessors, ProjectInfo},
    animation::keyframe::KeyframeParameter,
    audio::{
        chunk::{AudioChunk, AudioFormat},
        effect::{AudioEffectContext, AudioEffectInstance, apply_audio_effects},
        mix::{frame_to_sample, sample_to_frame},
    },
    foundation::core::{Fps, FrameIndex, FrameSpan},
    foundation::error::{MontageError, MontageResult},
};

/// A request for one block of a clip's audio.
#[derive(Clone, Debug)]
pub struct GetAudioContext {
    /// Exact format of the returned chunk.
    pub format: AudioFormat,
    /// Offset of the first requested sample within the clip's own audio timeline.
    pub start_sample_position: u64,
    /// Exact number of frames returned.
    pub required_length: usize,
    pub fps: Fps,
    pub accessors: FileAccessors,
    pub project: ProjectInfo,
    pub cancel: CancellationToken,
}

impl GetAudioContext {
    pub fn new(format: AudioFormat, fps: Fps, accessors: FileAccessors, project: ProjectInfo) -> Self {
        Self {
            format,
            start_sample_position: 0,
            required_length: 0,
            fps,
            accessors,
            project,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn check_cancelled(&self) -> MontageResult<()> {
        if self.cancel.is_cancelled() {
            return Err(MontageError::Cancelled);
        }
        Ok(())
    }

    /// Same request, narrowed to `len` frames starting at `start_sample`.
    pub fn window(&self, start_sample: u64, len: usize) -> Self {
        Self {
            start_sample_position: start_sample,
            required_length: len,
            ..self.clone()
        }
    }
}

/// Anything that can hand out audio for a [`GetAudioContext`]. Never fails; problems
/// degrade to silence.
#[async_trait]
pub trait AudioSource: Send + Sync {
    async fn get_audio_chunk(&self, ctx: &GetAudioContext) -> AudioChunk;
}

/// Volume and effect chain carried by every audio-bearing clip.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioTrack {
    /// Percent, 100 = unity.
    pub volume: KeyframeParameter<f64>,
    #[serde(default)]
    pub effects: Vec<AudioEffectInstance>,
}

impl Default for AudioTrack {
    fn default() -> Self {
        Self {
            volume: KeyframeParameter::constant(100.0),
            effects: Vec::new(),
        }
    }
}

impl AudioTrack {
    pub fn split(&self, at: FrameIndex) -> (Self, Self) {
        let (v1, v2) = self.volume.split(at);
        let (e1, e2): (Vec<_>, Vec<_>) = self.effects.iter().map(|e| e.split(at)).unzip();
        let (e1, e2) = (
            e1.into_iter().flatten().collect(),
            e2.into_iter().flatten().collect(),
        );
        (
            Self {
                volume: v1,
                effects: e1,
            },
            Self {
                volume: v2,
                effects: e2,
            },
        )
    }
}

/// Borrowed view of one clip's audio: where it comes from and how it is shaped.
#[derive(Clone, Copy, Debug)]
pub struct ClipAudio<'a> {
    pub clip_id: &'a str,
    pub span: FrameSpan,
    pub media: Option<&'a str>,
    /// Clip-local start offset into the media, in seconds. Video audio has none.
    pub start_seconds: Option<&'a KeyframeParameter<f64>>,
    /// Media frames skipped before the clip's first frame.
    pub source_offset: u64,
    pub track: &'a AudioTrack,
}

#[async_trait]
impl<'a> AudioSource for ClipAudio<'a> {
    async fn get_audio_chunk(&self, ctx: &GetAudioContext) -> AudioChunk {
        let chunk = self.fetch(ctx).await;
        let effect_ctx = AudioEffectContext {
            owner_id: self.clip_id,
            span: self.span,
            request: ctx,
        };
        apply_audio_effects(chunk, &self.track.effects, &effect_ctx)
    }
}

impl ClipAudio<'_> {
    async fn fetch(&self, ctx: &GetAudioContext) -> AudioChunk {
        let silence = AudioChunk::silent(ctx.format, ctx.required_length);
        if ctx.required_length == 0 || ctx.format.validate().is_err() || ctx.cancel.is_cancelled() {
            return silence;
        }
        let (Some(media), Some(accessor)) = (self.media, ctx.accessors.audio.as_ref()) else {
            return silence;
        };

        let rate = f64::from(ctx.format.sample_rate);
        let offset = self
            .start_seconds
            .map(|p| p.get(FrameIndex(0)))
            .unwrap_or(0.0);
        let media_sample = frame_to_sample(self.source_offset, ctx.fps, ctx.format.sample_rate)
            + ctx.start_sample_position;
        let start_seconds = (offset + media_sample as f64 / rate).max(0.0);
        let duration_seconds = ctx.required_length as f64 / rate;

        let path = ctx.project.resolve(media);
        let fetched = match accessor
            .get_audio(&path, Some(start_seconds), Some(duration_seconds))
            .await
        {
            Ok(chunk) => chunk,
            Err(err) => {
                tracing::warn!(
                    clip = self.clip_id,
                    path = %path.display(),
                    error = %err,
                    "audio fetch failed; using silence"
                );
                return silence;
            }
        };

        let mut out = fetched.convert_to(ctx.format, ctx.required_length);
        let local = sample_to_frame(ctx.start_sample_position, ctx.fps, ctx.format.sample_rate);
        let volume = self.track.volume.get(FrameIndex(local));
        out.apply_gain((volume / 100.0) as f32);
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/source.rs"]
mod tests;
