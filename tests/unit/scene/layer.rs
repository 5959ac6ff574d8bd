use super::*;

use std::{path::Path, sync::Arc};

use async_trait::async_trait;

use crate::{
    accessor::{AudioFileAccessor, FileAccessors, ProjectInfo},
    audio::{chunk::AudioFormat, effect::AudioEffectKind, source::AudioTrack},
    foundation::core::{Fps, Resolution},
    render::node::LayerTarget,
    scene::{
        clip::{AudioClip, CameraClip, ClipKind, SolidClip},
        props::VisualProps,
    },
};

fn f(v: u64) -> FrameIndex {
    FrameIndex(v)
}

fn solid(id: &str, start: u64, end: u64) -> ClipObject {
    ClipObject::new(
        id,
        FrameSpan::new(f(start), f(end)).unwrap(),
        ClipKind::Solid(SolidClip {
            color: [255, 255, 255, 255],
            width: 2,
            height: 2,
            visual: VisualProps::default(),
        }),
    )
}

fn layer_with(clips: &[(&str, u64, u64)]) -> LayerObject {
    let mut layer = LayerObject::new("L", "layer");
    for (id, s, e) in clips {
        layer.add_clip(solid(id, *s, *e)).unwrap();
    }
    layer
}

#[test]
fn placement_rules_around_an_existing_clip() {
    let layer = layer_with(&[("a", 50, 100)]);

    assert!(layer.can_place_object_at("b", f(0), f(49)));
    assert!(layer.can_place_object_at("b", f(101), f(150)));
    assert!(layer.can_place_object_at("a", f(50), f(100)));

    for (s, e) in [(40, 60), (90, 110), (60, 80), (40, 110)] {
        assert!(!layer.can_place_object_at("b", f(s), f(e)), "[{s},{e}]");
    }

    assert!(!layer.can_place_object_at("a", f(100), f(50)));
    assert!(!layer.can_place_object_at("b", f(100), f(50)));
}

#[test]
fn add_clip_rejects_overlap_and_duplicate_ids() {
    let mut layer = layer_with(&[("a", 50, 100)]);
    assert!(layer.add_clip(solid("b", 90, 120)).is_err());
    assert!(layer.add_clip(solid("a", 200, 210)).is_err());
    layer.add_clip(solid("b", 101, 120)).unwrap();
    assert_eq!(layer.clips.len(), 2);
}

#[test]
fn move_and_resize_validate_and_leave_layer_unchanged_on_error() {
    let mut layer = layer_with(&[("a", 0, 9), ("b", 20, 29)]);
    let before = layer.clone();

    assert!(layer.move_clip("a", f(15)).is_err());
    assert!(layer.resize_clip("a", f(0), f(20)).is_err());
    assert!(layer.resize_clip("a", f(9), f(0)).is_err());
    assert!(layer.move_clip("missing", f(0)).is_err());
    assert_eq!(layer, before);

    layer.move_clip("a", f(10)).unwrap();
    assert_eq!(layer.clip("a").unwrap().span, FrameSpan::new(f(10), f(19)).unwrap());
    layer.resize_clip("b", f(20), f(40)).unwrap();
    assert_eq!(layer.clip("b").unwrap().span.end, f(40));
}

#[test]
fn remove_and_lookup() {
    let mut layer = layer_with(&[("a", 0, 9), ("b", 20, 29)]);
    assert_eq!(layer.clip_at(f(25)).unwrap().id, "b");
    assert!(layer.clip_at(f(15)).is_none());
    assert_eq!(layer.end_frame(), Some(f(29)));

    assert_eq!(layer.remove_clip("b").unwrap().id, "b");
    assert!(layer.remove_clip("b").is_err());
    assert_eq!(layer.end_frame(), Some(f(9)));
}

#[test]
fn split_partitions_and_cuts_spanning_clips() {
    let layer = layer_with(&[("before", 0, 9), ("span", 10, 30), ("after", 40, 50)]);
    let (first, second) = layer.split_at_frame(f(20));

    let ids = |l: &LayerObject| l.clips.iter().map(|c| c.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&first), ["before", "span.1"]);
    assert_eq!(ids(&second), ["span.2", "after"]);
    assert_eq!(first.clip("span.1").unwrap().span, FrameSpan::new(f(10), f(19)).unwrap());
    assert_eq!(second.clip("span.2").unwrap().span, FrameSpan::new(f(20), f(30)).unwrap());
    assert_eq!(first.id, "L.1");
    assert_eq!(second.id, "L.2");
}

#[test]
fn split_at_a_clip_boundary_moves_clips_whole() {
    let layer = layer_with(&[("a", 10, 19), ("b", 20, 29)]);
    let (first, second) = layer.split_at_frame(f(20));
    assert_eq!(first.clips.len(), 1);
    assert_eq!(second.clips.len(), 1);
    assert_eq!(second.clips[0].id, "b");
}

#[test]
fn split_cuts_a_clip_ending_exactly_at_the_frame() {
    let layer = layer_with(&[("a", 10, 20)]);
    let (first, second) = layer.split_at_frame(f(20));
    assert_eq!(first.clips[0].span, FrameSpan::new(f(10), f(19)).unwrap());
    assert_eq!(second.clips[0].span, FrameSpan::new(f(20), f(20)).unwrap());
}

#[test]
fn split_copies_volume_and_effects_independently() {
    let mut layer = layer_with(&[("a", 0, 9)]);
    layer.volume = KeyframeParameter::constant(40.0);
    layer
        .add_audio_effect(AudioEffectInstance::new("inv", AudioEffectKind::Invert))
        .unwrap();
    let (mut first, second) = layer.split_at_frame(f(5));

    first.remove_audio_effect("inv").unwrap();
    first.volume.set_constant(10.0);
    assert_eq!(second.audio_effects.len(), 1);
    assert_eq!(second.volume.get(f(0)), 40.0);
    assert_eq!(layer.audio_effects.len(), 1);
}

#[test]
fn intervener_lookup_honors_activity() {
    let mut layer = LayerObject::new("cam", "camera");
    layer
        .add_clip(ClipObject::new(
            "c",
            FrameSpan::new(f(0), f(9)).unwrap(),
            ClipKind::Camera(CameraClip {
                target: LayerTarget::Count(1),
                visual: VisualProps::default(),
            }),
        ))
        .unwrap();
    assert_eq!(layer.intervener_at(f(3)).unwrap().target, LayerTarget::Count(1));
    assert!(layer.intervener_at(f(10)).is_none());
    layer.is_active = false;
    assert!(layer.intervener_at(f(3)).is_none());
}

fn render_ctx(frame: u64) -> RenderContext {
    RenderContext::new(
        f(frame),
        ProjectInfo::new(".", Fps::default(), Resolution::new(8, 8)),
        FileAccessors::new(),
    )
}

#[tokio::test]
async fn content_node_renders_the_visible_clip_only() {
    let layer = layer_with(&[("a", 0, 9), ("b", 20, 29)]);
    assert!(layer.content_node(&render_ctx(5)).await.unwrap().is_some());
    assert!(layer.content_node(&render_ctx(15)).await.unwrap().is_none());

    let mut off = layer.clone();
    off.is_active = false;
    assert!(off.content_node(&render_ctx(5)).await.unwrap().is_none());
}

/// Every sample equals `value`.
struct Level(f32);

#[async_trait]
impl AudioFileAccessor for Level {
    async fn get_audio(
        &self,
        _path: &Path,
        _start_seconds: Option<f64>,
        duration_seconds: Option<f64>,
    ) -> MontageResult<AudioChunk> {
        let frames = (duration_seconds.unwrap_or(0.0) * 3000.0).round() as usize;
        AudioChunk::from_interleaved(AudioFormat::new(3_000, 1)?, vec![self.0; frames])
    }

    async fn get_audio_by_sample(
        &self,
        _path: &Path,
        _start_sample: u64,
        sample_count: usize,
        _sample_rate: u32,
    ) -> MontageResult<AudioChunk> {
        AudioChunk::from_interleaved(AudioFormat::new(3_000, 1)?, vec![self.0; sample_count])
    }
}

fn audio_clip(id: &str, start: u64, end: u64) -> ClipObject {
    ClipObject::new(
        id,
        FrameSpan::new(f(start), f(end)).unwrap(),
        ClipKind::Audio(AudioClip {
            source: format!("{id}.wav"),
            start_seconds: KeyframeParameter::constant(0.0),
            source_offset: 0,
            audio: AudioTrack::default(),
        }),
    )
}

// 30 fps at 3000 Hz: 100 samples per frame.
fn mix_ctx(start: u64, len: usize) -> GetAudioContext {
    GetAudioContext::new(
        AudioFormat::new(3_000, 1).unwrap(),
        Fps::default(),
        FileAccessors::new().with_audio(Arc::new(Level(0.5))),
        ProjectInfo::default(),
    )
    .window(start, len)
}

#[tokio::test]
async fn layer_mix_places_clips_at_their_offsets() {
    let mut layer = LayerObject::new("L", "audio");
    layer.add_clip(audio_clip("a", 1, 1)).unwrap();
    layer.add_clip(audio_clip("b", 3, 3)).unwrap();

    let out = layer.mix_audio(&mix_ctx(0, 500)).await.unwrap();
    let s = out.samples();
    assert_eq!(s[99], 0.0);
    assert_eq!(s[100], 0.5);
    assert_eq!(s[199], 0.5);
    assert_eq!(s[200], 0.0);
    assert_eq!(s[300], 0.5);
    assert_eq!(s[399], 0.5);
    assert_eq!(s[400], 0.0);
}

#[tokio::test]
async fn layer_volume_and_effects_apply_to_the_bus() {
    let mut layer = LayerObject::new("L", "audio");
    layer.add_clip(audio_clip("a", 0, 9)).unwrap();
    layer.volume = KeyframeParameter::constant(50.0);
    layer
        .add_audio_effect(AudioEffectInstance::new("inv", AudioEffectKind::Invert))
        .unwrap();

    let out = layer.mix_audio(&mix_ctx(0, 10)).await.unwrap();
    assert!(out.samples().iter().all(|s| (*s + 0.25).abs() < 1e-6));
}

#[tokio::test]
async fn inactive_layers_and_clips_are_silent() {
    let mut layer = LayerObject::new("L", "audio");
    let mut muted = audio_clip("a", 0, 9);
    muted.is_active = false;
    layer.add_clip(muted).unwrap();
    let out = layer.mix_audio(&mix_ctx(0, 10)).await.unwrap();
    assert!(out.samples().iter().all(|s| *s == 0.0));

    let mut off = LayerObject::new("L2", "audio");
    off.add_clip(audio_clip("b", 0, 9)).unwrap();
    off.is_active = false;
    let out = off.mix_audio(&mix_ctx(0, 10)).await.unwrap();
    assert!(out.samples().iter().all(|s| *s == 0.0));
}
