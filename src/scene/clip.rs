use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    accessor::SeekHint,
    animation::keyframe::{KeyframeParameter, SampleCtx},
    audio::{
        effect::AudioEffectInstance,
        source::{AudioTrack, ClipAudio},
    },
    effects::{pipeline::apply_effects, visual::VisualEffectInstance},
    foundation::core::{FrameIndex, FrameSpan, Resolution, Rgba8Premul},
    foundation::error::{MontageError, MontageResult},
    render::{
        compositor::{RenderContext, Renderable},
        image::{RasterImage, SharedImage},
        intervener::Camera,
        node::{LayerTarget, RenderNode},
    },
    scene::props::VisualProps,
};

/// A still image file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageClip {
    pub source: String,
    #[serde(default)]
    pub visual: VisualProps,
}

/// A video file. Its sound comes from `audio_source` when set, otherwise from `source`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VideoClip {
    pub source: String,
    #[serde(default)]
    pub audio_source: Option<String>,
    /// Frames of media skipped before the clip's first frame.
    #[serde(default)]
    pub source_offset: u64,
    #[serde(default)]
    pub visual: VisualProps,
    #[serde(default)]
    pub audio: AudioTrack,
}

fn zero_seconds() -> KeyframeParameter<f64> {
    KeyframeParameter::constant(0.0)
}

/// An audio file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioClip {
    pub source: String,
    /// Offset into the file, in seconds, at the clip's first frame.
    #[serde(default = "zero_seconds")]
    pub start_seconds: KeyframeParameter<f64>,
    /// Frames of media skipped before the clip's first frame, on top of `start_seconds`.
    /// A cut advances it on the second half.
    #[serde(default)]
    pub source_offset: u64,
    #[serde(default)]
    pub audio: AudioTrack,
}

/// A flat rectangle of straight-alpha `color`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SolidClip {
    pub color: [u8; 4],
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub visual: VisualProps,
}

/// A virtual camera controlling the layers beneath it.
///
/// `visual.position_*` is the look-at point, `visual.scale` the zoom, `visual.rotation`
/// the roll and `visual.opacity` the opacity of the shot.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraClip {
    #[serde(default)]
    pub target: LayerTarget,
    #[serde(default)]
    pub visual: VisualProps,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClipKind {
    Image(ImageClip),
    Video(VideoClip),
    Audio(AudioClip),
    Solid(SolidClip),
    Camera(CameraClip),
}

impl ClipKind {
    fn split(&self, at: FrameIndex) -> (Self, Self) {
        match self {
            Self::Image(c) => {
                let (v1, v2) = c.visual.split(at);
                (
                    Self::Image(ImageClip {
                        source: c.source.clone(),
                        visual: v1,
                    }),
                    Self::Image(ImageClip {
                        source: c.source.clone(),
                        visual: v2,
                    }),
                )
            }
            Self::Video(c) => {
                let (v1, v2) = c.visual.split(at);
                let (a1, a2) = c.audio.split(at);
                (
                    Self::Video(VideoClip {
                        visual: v1,
                        audio: a1,
                        ..c.clone()
                    }),
                    Self::Video(VideoClip {
                        source_offset: c.source_offset + at.0,
                        visual: v2,
                        audio: a2,
                        ..c.clone()
                    }),
                )
            }
            Self::Audio(c) => {
                let (s1, s2) = c.start_seconds.split(at);
                let (a1, a2) = c.audio.split(at);
                (
                    Self::Audio(AudioClip {
                        source: c.source.clone(),
                        start_seconds: s1,
                        source_offset: c.source_offset,
                        audio: a1,
                    }),
                    Self::Audio(AudioClip {
                        source: c.source.clone(),
                        start_seconds: s2,
                        source_offset: c.source_offset + at.0,
                        audio: a2,
                    }),
                )
            }
            Self::Solid(c) => {
                let (v1, v2) = c.visual.split(at);
                (
                    Self::Solid(SolidClip {
                        visual: v1,
                        ..c.clone()
                    }),
                    Self::Solid(SolidClip {
                        visual: v2,
                        ..c.clone()
                    }),
                )
            }
            Self::Camera(c) => {
                let (v1, v2) = c.visual.split(at);
                (
                    Self::Camera(CameraClip {
                        target: c.target,
                        visual: v1,
                    }),
                    Self::Camera(CameraClip {
                        target: c.target,
                        visual: v2,
                    }),
                )
            }
        }
    }
}

fn default_active() -> bool {
    true
}

/// A frame-ranged, placeable unit of content within a layer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClipObject {
    pub id: String,
    pub span: FrameSpan,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(flatten)]
    pub kind: ClipKind,
}

impl ClipObject {
    pub fn new(id: impl Into<String>, span: FrameSpan, kind: ClipKind) -> Self {
        Self {
            id: id.into(),
            span,
            is_active: true,
            kind,
        }
    }

    pub fn start(&self) -> FrameIndex {
        self.span.start
    }

    pub fn end(&self) -> FrameIndex {
        self.span.end
    }

    /// `start <= frame <= end`.
    pub fn is_exist_from_frame(&self, frame: FrameIndex) -> bool {
        self.span.contains(frame)
    }

    pub fn visual(&self) -> Option<&VisualProps> {
        match &self.kind {
            ClipKind::Image(c) => Some(&c.visual),
            ClipKind::Video(c) => Some(&c.visual),
            ClipKind::Solid(c) => Some(&c.visual),
            ClipKind::Camera(c) => Some(&c.visual),
            ClipKind::Audio(_) => None,
        }
    }

    pub fn visual_mut(&mut self) -> Option<&mut VisualProps> {
        match &mut self.kind {
            ClipKind::Image(c) => Some(&mut c.visual),
            ClipKind::Video(c) => Some(&mut c.visual),
            ClipKind::Solid(c) => Some(&mut c.visual),
            ClipKind::Camera(c) => Some(&mut c.visual),
            ClipKind::Audio(_) => None,
        }
    }

    pub fn audio_track(&self) -> Option<&AudioTrack> {
        match &self.kind {
            ClipKind::Video(c) => Some(&c.audio),
            ClipKind::Audio(c) => Some(&c.audio),
            _ => None,
        }
    }

    pub fn audio_track_mut(&mut self) -> Option<&mut AudioTrack> {
        match &mut self.kind {
            ClipKind::Video(c) => Some(&mut c.audio),
            ClipKind::Audio(c) => Some(&mut c.audio),
            _ => None,
        }
    }

    /// The clip's audio as an [`AudioSource`](crate::AudioSource), for audio-bearing kinds.
    pub fn audio_source(&self) -> Option<ClipAudio<'_>> {
        match &self.kind {
            ClipKind::Audio(c) => Some(ClipAudio {
                clip_id: &self.id,
                span: self.span,
                media: Some(c.source.as_str()),
                start_seconds: Some(&c.start_seconds),
                source_offset: c.source_offset,
                track: &c.audio,
            }),
            ClipKind::Video(c) => Some(ClipAudio {
                clip_id: &self.id,
                span: self.span,
                media: Some(c.audio_source.as_deref().unwrap_or(c.source.as_str())),
                start_seconds: None,
                source_offset: c.source_offset,
                track: &c.audio,
            }),
            _ => None,
        }
    }

    pub fn is_intervener(&self) -> bool {
        matches!(self.kind, ClipKind::Camera(_))
    }

    /// The camera this clip represents at `frame`, sampled at the clip-local frame.
    pub fn camera_at(&self, frame: FrameIndex) -> Option<Camera> {
        let ClipKind::Camera(c) = &self.kind else {
            return None;
        };
        if !self.is_active || !self.is_exist_from_frame(frame) {
            return None;
        }
        Some(Camera {
            view: c.visual.transform_at(self.sample_ctx(frame)),
            target: c.target,
        })
    }

    fn sample_ctx(&self, frame: FrameIndex) -> SampleCtx {
        SampleCtx {
            clip_local: self.span.local(frame),
            clip_len: Some(self.span.len_frames()),
        }
    }

    /// Split into `[start, s-1]` and `[s, end]`. Requires `start < s < end`.
    pub fn split_at_frame(&self, s: FrameIndex) -> MontageResult<(Self, Self)> {
        if !(self.span.start < s && s < self.span.end) {
            return Err(MontageError::validation(format!(
                "split frame {} must lie strictly inside [{}, {}] of clip '{}'",
                s.0, self.span.start.0, self.span.end.0, self.id
            )));
        }
        Ok(self.cut(s))
    }

    /// Clone-then-rebase cut shared by clip and layer splits. Caller guarantees
    /// `start < s <= end`.
    pub(crate) fn cut(&self, s: FrameIndex) -> (Self, Self) {
        let (k1, k2) = self.kind.split(FrameIndex(s.0 - self.span.start.0));
        let first = Self {
            id: format!("{}.1", self.id),
            span: FrameSpan {
                start: self.span.start,
                end: FrameIndex(s.0 - 1),
            },
            is_active: self.is_active,
            kind: k1,
        };
        let second = Self {
            id: format!("{}.2", self.id),
            span: FrameSpan {
                start: s,
                end: self.span.end,
            },
            is_active: self.is_active,
            kind: k2,
        };
        (first, second)
    }

    fn visual_or_err(&mut self) -> MontageResult<&mut VisualProps> {
        let id = self.id.clone();
        self.visual_mut()
            .ok_or_else(|| MontageError::validation(format!("clip '{id}' has no visual effects")))
    }

    fn audio_or_err(&mut self) -> MontageResult<&mut AudioTrack> {
        let id = self.id.clone();
        self.audio_track_mut()
            .ok_or_else(|| MontageError::validation(format!("clip '{id}' has no audio")))
    }

    pub fn add_effect(&mut self, effect: VisualEffectInstance) -> MontageResult<()> {
        self.visual_or_err()?.add_effect(effect)
    }

    pub fn remove_effect(&mut self, id: &str) -> MontageResult<VisualEffectInstance> {
        self.visual_or_err()?.remove_effect(id)
    }

    pub fn set_effect_active(&mut self, id: &str, active: bool) -> MontageResult<()> {
        self.visual_or_err()?.set_effect_active(id, active)
    }

    pub fn add_audio_effect(&mut self, effect: AudioEffectInstance) -> MontageResult<()> {
        let track = self.audio_or_err()?;
        if track.effects.iter().any(|e| e.id == effect.id) {
            return Err(MontageError::validation(format!(
                "audio effect id '{}' already exists",
                effect.id
            )));
        }
        track.effects.push(effect);
        Ok(())
    }

    pub fn remove_audio_effect(&mut self, id: &str) -> MontageResult<AudioEffectInstance> {
        let track = self.audio_or_err()?;
        let idx = track
            .effects
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| MontageError::validation(format!("unknown audio effect id '{id}'")))?;
        Ok(track.effects.remove(idx))
    }

    async fn fetch_image(&self, ctx: &RenderContext) -> Option<(SharedImage, &VisualProps)> {
        let local = self.span.local(ctx.frame);
        match &self.kind {
            ClipKind::Image(c) => {
                let accessor = ctx.accessors.image.as_ref()?;
                let path = ctx.project.resolve(&c.source);
                match accessor.get_bitmap(&path).await {
                    Ok(img) => Some((img, &c.visual)),
                    Err(err) => {
                        tracing::warn!(clip = %self.id, path = %path.display(), error = %err, "image unavailable");
                        None
                    }
                }
            }
            ClipKind::Video(c) => {
                let accessor = ctx.accessors.video.as_ref()?;
                let path = ctx.project.resolve(&c.source);
                let time = ctx.fps.frames_to_secs(c.source_offset + local.0);
                match accessor.get_bitmap(&path, time, SeekHint::Playback).await {
                    Ok(img) => Some((img, &c.visual)),
                    Err(err) => {
                        tracing::warn!(clip = %self.id, path = %path.display(), time, error = %err, "video frame unavailable");
                        None
                    }
                }
            }
            ClipKind::Solid(c) => {
                let [r, g, b, a] = c.color;
                let fill = Rgba8Premul::from_straight_rgba(r, g, b, a);
                match RasterImage::filled(Resolution::new(c.width, c.height), fill) {
                    Ok(img) => Some((Arc::new(img), &c.visual)),
                    Err(err) => {
                        tracing::warn!(clip = %self.id, error = %err, "solid skipped");
                        None
                    }
                }
            }
            ClipKind::Audio(_) | ClipKind::Camera(_) => None,
        }
    }
}

#[async_trait]
impl Renderable for ClipObject {
    async fn render_node(&self, ctx: &RenderContext) -> MontageResult<Option<RenderNode>> {
        if !self.is_active || !self.is_exist_from_frame(ctx.frame) {
            return Ok(None);
        }
        let Some((image, visual)) = self.fetch_image(ctx).await else {
            return Ok(None);
        };
        ctx.check_cancelled()?;

        let logical_size = image.resolution().as_vec2();
        let image = apply_effects(
            image,
            &visual.effects,
            ctx,
            self.span.start,
            self.span.end,
            logical_size,
        );
        Ok(Some(RenderNode::leaf(
            image,
            logical_size,
            visual.transform_at(self.sample_ctx(ctx.frame)),
            visual.blend,
        )))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/clip.rs"]
mod tests;
