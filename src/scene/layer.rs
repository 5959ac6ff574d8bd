use futures::future::join_all;

use crate::{
    animation::keyframe::KeyframeParameter,
    audio::{
        chunk::AudioChunk,
        effect::{AudioEffectContext, AudioEffectInstance, apply_audio_effects},
        mix::{clip_window, sample_to_frame},
        source::{AudioSource, GetAudioContext},
    },
    foundation::core::{FrameIndex, FrameSpan},
    foundation::error::{MontageError, MontageResult},
    render::{
        compositor::{RenderContext, Renderable},
        intervener::Camera,
        node::RenderNode,
    },
    scene::clip::ClipObject,
};

fn unity() -> KeyframeParameter<f64> {
    KeyframeParameter::constant(100.0)
}

fn default_active() -> bool {
    true
}

/// An ordered, non-overlapping set of clips at one stacking position.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayerObject {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub clips: Vec<ClipObject>,
    /// Percent, 100 = unity. Sampled at the timeline frame.
    #[serde(default = "unity")]
    pub volume: KeyframeParameter<f64>,
    #[serde(default)]
    pub audio_effects: Vec<AudioEffectInstance>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl LayerObject {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            clips: Vec::new(),
            volume: unity(),
            audio_effects: Vec::new(),
            is_active: true,
        }
    }

    pub fn clip(&self, id: &str) -> Option<&ClipObject> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn clip_mut(&mut self, id: &str) -> Option<&mut ClipObject> {
        self.clips.iter_mut().find(|c| c.id == id)
    }

    pub(crate) fn clip_index(&self, id: &str) -> MontageResult<usize> {
        self.clips.iter().position(|c| c.id == id).ok_or_else(|| {
            MontageError::validation(format!("layer '{}' has no clip '{id}'", self.id))
        })
    }

    pub fn clips_at(&self, frame: FrameIndex) -> impl Iterator<Item = &ClipObject> {
        self.clips.iter().filter(move |c| c.is_exist_from_frame(frame))
    }

    pub fn clip_at(&self, frame: FrameIndex) -> Option<&ClipObject> {
        self.clips_at(frame).next()
    }

    /// Last frame covered by any clip.
    pub fn end_frame(&self) -> Option<FrameIndex> {
        self.clips.iter().map(|c| c.span.end).max()
    }

    /// Whether the clip `candidate_id` may occupy `[start, end]`.
    ///
    /// The candidate never conflicts with itself. Bounds are inclusive, so adjacent ranges
    /// are allowed.
    pub fn can_place_object_at(&self, candidate_id: &str, start: FrameIndex, end: FrameIndex) -> bool {
        if start > end {
            return false;
        }
        let range = FrameSpan { start, end };
        self.clips
            .iter()
            .filter(|c| c.id != candidate_id)
            .all(|c| !c.span.overlaps(range))
    }

    fn ensure_placeable(&self, candidate_id: &str, start: FrameIndex, end: FrameIndex) -> MontageResult<()> {
        if self.can_place_object_at(candidate_id, start, end) {
            return Ok(());
        }
        Err(MontageError::validation(format!(
            "clip '{candidate_id}' cannot be placed at [{}, {}] on layer '{}'",
            start.0, end.0, self.id
        )))
    }

    pub fn add_clip(&mut self, clip: ClipObject) -> MontageResult<()> {
        if self.clip(&clip.id).is_some() {
            return Err(MontageError::validation(format!(
                "clip id '{}' already exists on layer '{}'",
                clip.id, self.id
            )));
        }
        self.ensure_placeable(&clip.id, clip.span.start, clip.span.end)?;
        self.clips.push(clip);
        Ok(())
    }

    pub fn remove_clip(&mut self, id: &str) -> MontageResult<ClipObject> {
        let idx = self.clip_index(id)?;
        Ok(self.clips.remove(idx))
    }

    /// Move a clip so it starts at `new_start`, keeping its length.
    pub fn move_clip(&mut self, id: &str, new_start: FrameIndex) -> MontageResult<()> {
        let idx = self.clip_index(id)?;
        let moved = self.clips[idx].span.moved_to(new_start);
        self.ensure_placeable(id, moved.start, moved.end)?;
        self.clips[idx].span = moved;
        Ok(())
    }

    pub fn resize_clip(&mut self, id: &str, start: FrameIndex, end: FrameIndex) -> MontageResult<()> {
        let idx = self.clip_index(id)?;
        let span = FrameSpan::new(start, end)?;
        self.ensure_placeable(id, start, end)?;
        self.clips[idx].span = span;
        Ok(())
    }

    pub fn add_audio_effect(&mut self, effect: AudioEffectInstance) -> MontageResult<()> {
        if self.audio_effects.iter().any(|e| e.id == effect.id) {
            return Err(MontageError::validation(format!(
                "audio effect id '{}' already exists on layer '{}'",
                effect.id, self.id
            )));
        }
        self.audio_effects.push(effect);
        Ok(())
    }

    pub fn remove_audio_effect(&mut self, id: &str) -> MontageResult<AudioEffectInstance> {
        let idx = self
            .audio_effects
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| MontageError::validation(format!("unknown audio effect id '{id}'")))?;
        Ok(self.audio_effects.remove(idx))
    }

    /// Partition the layer at frame `s` into two layers.
    ///
    /// Clips ending before `s` go to the first layer, clips starting at or after `s` go to
    /// the second, and clips covering both `s - 1` and `s` are cut in two. Both layers get
    /// their own copies of the volume and audio effects.
    pub fn split_at_frame(&self, s: FrameIndex) -> (Self, Self) {
        let mut first = self.empty_copy(format!("{}.1", self.id));
        let mut second = self.empty_copy(format!("{}.2", self.id));

        for clip in &self.clips {
            if clip.span.end < s {
                first.clips.push(clip.clone());
            } else if clip.span.start >= s {
                second.clips.push(clip.clone());
            } else {
                let (a, b) = clip.cut(s);
                first.clips.push(a);
                second.clips.push(b);
            }
        }
        (first, second)
    }

    fn empty_copy(&self, id: String) -> Self {
        Self {
            id,
            name: self.name.clone(),
            clips: Vec::new(),
            volume: self.volume.clone(),
            audio_effects: self.audio_effects.clone(),
            is_active: self.is_active,
        }
    }

    /// The active camera on this layer at `frame`, if any.
    pub fn intervener_at(&self, frame: FrameIndex) -> Option<Camera> {
        if !self.is_active {
            return None;
        }
        self.clips_at(frame).find_map(|c| c.camera_at(frame))
    }

    /// Render this layer's visible content at `ctx.frame`. Clips are built concurrently.
    pub async fn content_node(&self, ctx: &RenderContext) -> MontageResult<Option<RenderNode>> {
        if !self.is_active {
            return Ok(None);
        }
        let rendered = join_all(self.clips_at(ctx.frame).map(|c| c.render_node(ctx))).await;
        let mut nodes = rendered
            .into_iter()
            .filter_map(Result::transpose)
            .collect::<MontageResult<Vec<_>>>()?;
        Ok(match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(RenderNode::group(nodes)),
        })
    }

    /// Mix this layer's audio for the timeline window described by `ctx`
    /// (`start_sample_position` is a timeline sample).
    pub async fn mix_audio(&self, ctx: &GetAudioContext) -> MontageResult<AudioChunk> {
        let mut bus = AudioChunk::silent(ctx.format, ctx.required_length);
        if !self.is_active || ctx.required_length == 0 {
            return Ok(bus);
        }
        let rate = ctx.format.sample_rate;

        let placed: Vec<_> = self
            .clips
            .iter()
            .filter(|c| c.is_active)
            .filter_map(|c| {
                let source = c.audio_source()?;
                let window = clip_window(
                    c.span,
                    ctx.start_sample_position,
                    ctx.required_length,
                    ctx.fps,
                    rate,
                )?;
                Some((window, source))
            })
            .collect();

        let chunks = join_all(placed.iter().map(|(window, source)| async move {
            source
                .get_audio_chunk(&ctx.window(window.clip_sample, window.len))
                .await
        }))
        .await;
        for ((window, _), chunk) in placed.iter().zip(&chunks) {
            bus.mix_in(chunk, window.out_offset)?;
        }

        let frame = sample_to_frame(ctx.start_sample_position, ctx.fps, rate);
        bus.scale((self.volume.get(FrameIndex(frame)) / 100.0).max(0.0) as f32);

        let span = FrameSpan {
            start: FrameIndex(0),
            end: self.end_frame().unwrap_or_default(),
        };
        let effect_ctx = AudioEffectContext {
            owner_id: &self.id,
            span,
            request: ctx,
        };
        Ok(apply_audio_effects(bus, &self.audio_effects, &effect_ctx))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/layer.rs"]
mod tests;
