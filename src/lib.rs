//! Montage is a non-linear timeline compositing and audio-mixing engine.
//!
//! A [`TimelineObject`] stacks [`LayerObject`]s of non-overlapping [`ClipObject`]s. Every
//! clip property is a [`KeyframeParameter`] sampled at the clip-local frame.
//!
//! - [`render_frame`] builds a [`RenderNode`] tree for one frame and composites it on the
//!   CPU into premultiplied RGBA8
//! - [`TimelineObject::mix_audio`] mixes a window of timeline samples into an [`AudioChunk`]
//!
//! Media is read through injected [`FileAccessors`]; nothing in the engine touches
//! decoders directly.
#![forbid(unsafe_code)]

mod accessor;
mod animation;
mod audio;
/// Engine configuration loaded from JSON.
pub mod config;
mod effects;
mod foundation;
mod render;
mod scene;

pub use crate::foundation::core::{
    Affine, Fps, FrameIndex, FrameSpan, Point, Resolution, Rgba8Premul, Vec2,
};
pub use crate::foundation::error::{MontageError, MontageResult};

pub use crate::accessor::{
    AudioFileAccessor, DiskImageAccessor, FileAccessors, ImageFileAccessor, ProjectInfo,
    SeekHint, VideoFileAccessor, WavAudioAccessor, decode_image_bytes,
};
pub use crate::animation::{
    ease::Ease,
    interp::{Interpolation, Lerp},
    keyframe::{KeyframeParameter, KeyframePoint, SampleCtx},
};
pub use crate::audio::{
    chunk::{AudioChunk, AudioFormat},
    effect::{
        AudioEffect, AudioEffectContext, AudioEffectInstance, AudioEffectKind,
        apply_audio_effects,
    },
    mix::{ClipWindow, clip_window, frame_to_sample, sample_to_frame, write_f32le},
    source::{AudioSource, AudioTrack, ClipAudio, GetAudioContext},
};
pub use crate::config::EngineConfig;
pub use crate::effects::{
    blur::gaussian_blur,
    pipeline::apply_effects,
    visual::{EffectContext, VisualEffect, VisualEffectInstance, VisualEffectKind},
};
pub use crate::render::{
    blend::BlendMode,
    compositor::{RenderContext, Renderable, paint_node, paint_nodes, render_frame},
    image::{DisplaySurface, RasterImage, SharedImage},
    intervener::{Camera, LayerIntervener},
    node::{LayerTarget, RenderNode, Transform},
};
pub use crate::scene::{
    clip::{AudioClip, CameraClip, ClipKind, ClipObject, ImageClip, SolidClip, VideoClip},
    layer::LayerObject,
    props::VisualProps,
    timeline::TimelineObject,
};
