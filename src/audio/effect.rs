use crate::{
    animation::keyframe::KeyframeParameter,
    audio::{
        chunk::AudioChunk,
        mix::{frame_to_sample, sample_to_frame},
        source::GetAudioContext,
    },
    foundation::core::{FrameIndex, FrameSpan},
};

/// What an audio effect knows about the chunk it is processing.
#[derive(Clone, Copy, Debug)]
pub struct AudioEffectContext<'a> {
    /// Id of the clip or layer owning the chain.
    pub owner_id: &'a str,
    /// Frame span of the owner; `request.start_sample_position` is relative to its start.
    pub span: FrameSpan,
    pub request: &'a GetAudioContext,
}

impl AudioEffectContext<'_> {
    /// Owner-local frame at the first sample of the chunk.
    pub fn local_frame(&self) -> FrameIndex {
        FrameIndex(sample_to_frame(
            self.request.start_sample_position,
            self.request.fps,
            self.request.format.sample_rate,
        ))
    }

    /// Length of the owner span in samples.
    pub fn span_samples(&self) -> u64 {
        frame_to_sample(
            self.span.len_frames(),
            self.request.fps,
            self.request.format.sample_rate,
        )
    }
}

/// A chunk-to-chunk transform in an audio effect chain. Effects never fail.
pub trait AudioEffect: Send + Sync {
    fn is_active(&self) -> bool;
    fn process(&self, chunk: AudioChunk, ctx: &AudioEffectContext<'_>) -> AudioChunk;
}

impl<T: AudioEffect + ?Sized> AudioEffect for Box<T> {
    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn process(&self, chunk: AudioChunk, ctx: &AudioEffectContext<'_>) -> AudioChunk {
        (**self).process(chunk, ctx)
    }
}

/// Run the active effects of a chain over `chunk`, in order.
pub fn apply_audio_effects<E: AudioEffect>(
    chunk: AudioChunk,
    effects: &[E],
    ctx: &AudioEffectContext<'_>,
) -> AudioChunk {
    effects
        .iter()
        .filter(|e| e.is_active())
        .fold(chunk, |chunk, effect| effect.process(chunk, ctx))
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AudioEffectKind {
    /// Percent gain, 100 = unity.
    Gain { volume: KeyframeParameter<f64> },
    /// Stereo balance in `[-1, 1]`; negative favors the left channel.
    Pan { pan: KeyframeParameter<f64> },
    /// Linear ramp up over the first `frames` of the owner span.
    FadeIn { frames: u64 },
    /// Linear ramp down over the last `frames` of the owner span.
    FadeOut { frames: u64 },
    Invert,
}

impl AudioEffectKind {
    /// Halves for a cut at owner-local frame `at`. A fade stays only on the half that
    /// keeps the edge it ramps, so no ramp lands on the cut.
    pub fn split(&self, at: FrameIndex) -> (Option<Self>, Option<Self>) {
        match self {
            Self::Gain { volume } => {
                let (a, b) = volume.split(at);
                (Some(Self::Gain { volume: a }), Some(Self::Gain { volume: b }))
            }
            Self::Pan { pan } => {
                let (a, b) = pan.split(at);
                (Some(Self::Pan { pan: a }), Some(Self::Pan { pan: b }))
            }
            Self::FadeIn { .. } => (Some(self.clone()), None),
            Self::FadeOut { .. } => (None, Some(self.clone())),
            Self::Invert => (Some(self.clone()), Some(self.clone())),
        }
    }

    fn run(&self, mut chunk: AudioChunk, ctx: &AudioEffectContext<'_>) -> AudioChunk {
        match self {
            Self::Gain { volume } => {
                let gain = (volume.get(ctx.local_frame()) / 100.0).max(0.0) as f32;
                chunk.apply_gain(gain);
            }
            Self::Pan { pan } => {
                if chunk.format().channels != 2 {
                    return chunk;
                }
                let p = pan.get(ctx.local_frame()).clamp(-1.0, 1.0) as f32;
                let left = (1.0 - p).min(1.0);
                let right = (1.0 + p).min(1.0);
                for frame in chunk.frames_mut() {
                    frame[0] *= left;
                    frame[1] *= right;
                }
            }
            Self::FadeIn { frames } => {
                let ramp = frame_to_sample(*frames, ctx.request.fps, ctx.request.format.sample_rate);
                if ramp == 0 {
                    return chunk;
                }
                let start = ctx.request.start_sample_position;
                for (i, frame) in chunk.frames_mut().enumerate() {
                    let pos = start + i as u64;
                    if pos >= ramp {
                        break;
                    }
                    let g = pos as f32 / ramp as f32;
                    frame.iter_mut().for_each(|s| *s *= g);
                }
            }
            Self::FadeOut { frames } => {
                let ramp = frame_to_sample(*frames, ctx.request.fps, ctx.request.format.sample_rate);
                if ramp == 0 {
                    return chunk;
                }
                let total = ctx.span_samples();
                let start = ctx.request.start_sample_position;
                for (i, frame) in chunk.frames_mut().enumerate() {
                    let remaining = total.saturating_sub(start + i as u64);
                    if remaining >= ramp {
                        continue;
                    }
                    let g = remaining as f32 / ramp as f32;
                    frame.iter_mut().for_each(|s| *s *= g);
                }
            }
            Self::Invert => {
                chunk.samples_mut().iter_mut().for_each(|s| *s = -*s);
            }
        }
        chunk
    }
}

fn default_active() -> bool {
    true
}

/// A configured effect in a clip's or layer's audio chain.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioEffectInstance {
    pub id: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub effect: AudioEffectKind,
}

impl AudioEffectInstance {
    pub fn new(id: impl Into<String>, effect: AudioEffectKind) -> Self {
        Self {
            id: id.into(),
            is_active: true,
            effect,
        }
    }

    pub fn split(&self, at: FrameIndex) -> (Option<Self>, Option<Self>) {
        let (a, b) = self.effect.split(at);
        let half = |effect| Self {
            id: self.id.clone(),
            is_active: self.is_active,
            effect,
        };
        (a.map(half), b.map(half))
    }
}

impl AudioEffect for AudioEffectInstance {
    fn is_active(&self) -> bool {
        self.is_active
    }

    fn process(&self, chunk: AudioChunk, ctx: &AudioEffectContext<'_>) -> AudioChunk {
        self.effect.run(chunk, ctx)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/effect.rs"]
mod tests;
