use std::{collections::HashSet, path::PathBuf};

use async_trait::async_trait;
use futures::future::join_all;

use crate::{
    accessor::ProjectInfo,
    animation::keyframe::KeyframeParameter,
    audio::{chunk::AudioChunk, mix::sample_to_frame, source::GetAudioContext},
    foundation::core::{Fps, FrameIndex, Resolution},
    foundation::error::{MontageError, MontageResult},
    render::{
        compositor::{RenderContext, Renderable},
        intervener::LayerIntervener,
        node::RenderNode,
    },
    scene::{clip::ClipObject, layer::LayerObject},
};

fn unity() -> KeyframeParameter<f64> {
    KeyframeParameter::constant(100.0)
}

/// The root of a project: stacked layers, index 0 painted first.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimelineObject {
    #[serde(default)]
    pub fps: Fps,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub layers: Vec<LayerObject>,
    /// Master volume in percent.
    #[serde(default = "unity")]
    pub volume: KeyframeParameter<f64>,
    #[serde(default)]
    pub selection_start: FrameIndex,
    #[serde(default)]
    pub selection_end: FrameIndex,
}

impl Default for TimelineObject {
    fn default() -> Self {
        Self::new(Fps::default(), Resolution::default())
    }
}

impl TimelineObject {
    pub fn new(fps: Fps, resolution: Resolution) -> Self {
        Self {
            fps,
            resolution,
            layers: Vec::new(),
            volume: unity(),
            selection_start: FrameIndex(0),
            selection_end: FrameIndex(0),
        }
    }

    pub fn layer(&self, id: &str) -> Option<&LayerObject> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: &str) -> Option<&mut LayerObject> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    fn layer_index(&self, id: &str) -> MontageResult<usize> {
        self.layers
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| MontageError::validation(format!("unknown layer id '{id}'")))
    }

    fn ensure_new_layer_id(&self, id: &str) -> MontageResult<()> {
        if self.layer(id).is_some() {
            return Err(MontageError::validation(format!("layer id '{id}' already exists")));
        }
        Ok(())
    }

    /// Push a layer on top of the stack.
    pub fn add_layer(&mut self, layer: LayerObject) -> MontageResult<()> {
        self.ensure_new_layer_id(&layer.id)?;
        self.layers.push(layer);
        Ok(())
    }

    pub fn insert_layer(&mut self, index: usize, layer: LayerObject) -> MontageResult<()> {
        if index > self.layers.len() {
            return Err(MontageError::validation(format!(
                "layer index {index} out of range (len {})",
                self.layers.len()
            )));
        }
        self.ensure_new_layer_id(&layer.id)?;
        self.layers.insert(index, layer);
        Ok(())
    }

    pub fn remove_layer(&mut self, id: &str) -> MontageResult<LayerObject> {
        let idx = self.layer_index(id)?;
        Ok(self.layers.remove(idx))
    }

    /// Replace clip `clip_id` on layer `layer_id` by its two halves, in place.
    pub fn split_clip(&mut self, layer_id: &str, clip_id: &str, frame: FrameIndex) -> MontageResult<()> {
        let li = self.layer_index(layer_id)?;
        let layer = &mut self.layers[li];
        let ci = layer.clip_index(clip_id)?;
        let (first, second) = layer.clips[ci].split_at_frame(frame)?;
        for half in [&first, &second] {
            if half.id != clip_id && layer.clip(&half.id).is_some() {
                return Err(MontageError::validation(format!(
                    "split would duplicate clip id '{}' on layer '{layer_id}'",
                    half.id
                )));
            }
        }
        layer.clips.splice(ci..=ci, [first, second]);
        Ok(())
    }

    pub fn set_selection(&mut self, start: FrameIndex, end: FrameIndex) -> MontageResult<()> {
        if start > end {
            return Err(MontageError::validation(format!(
                "selection start {} is after end {}",
                start.0, end.0
            )));
        }
        self.selection_start = start;
        self.selection_end = end;
        Ok(())
    }

    /// Number of frames up to and including the last clip's end; 0 when empty.
    pub fn duration(&self) -> u64 {
        self.layers
            .iter()
            .filter_map(LayerObject::end_frame)
            .max()
            .map_or(0, |end| end.0 + 1)
    }

    /// Active clips on active layers covering `frame`, in paint order.
    pub fn visible_clips(&self, frame: FrameIndex) -> Vec<&ClipObject> {
        self.layers
            .iter()
            .filter(|l| l.is_active)
            .flat_map(|l| l.clips_at(frame))
            .filter(|c| c.is_active)
            .collect()
    }

    /// Check structural invariants of a loaded project.
    pub fn validate(&self) -> MontageResult<()> {
        Fps::new(self.fps.num, self.fps.den)?;
        self.resolution.validate()?;
        if self.selection_start > self.selection_end {
            return Err(MontageError::validation("selection start is after selection end"));
        }

        let mut layer_ids = HashSet::new();
        for layer in &self.layers {
            if !layer_ids.insert(layer.id.as_str()) {
                return Err(MontageError::validation(format!(
                    "duplicate layer id '{}'",
                    layer.id
                )));
            }
            let mut clip_ids = HashSet::new();
            for clip in &layer.clips {
                if clip.span.start > clip.span.end {
                    return Err(MontageError::validation(format!(
                        "clip '{}' has an inverted span",
                        clip.id
                    )));
                }
                if !clip_ids.insert(clip.id.as_str()) {
                    return Err(MontageError::validation(format!(
                        "duplicate clip id '{}' on layer '{}'",
                        clip.id, layer.id
                    )));
                }
                if !layer.can_place_object_at(&clip.id, clip.span.start, clip.span.end) {
                    return Err(MontageError::validation(format!(
                        "clip '{}' overlaps another clip on layer '{}'",
                        clip.id, layer.id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> MontageResult<Self> {
        let timeline: Self = serde_json::from_str(json)?;
        timeline.validate()?;
        Ok(timeline)
    }

    pub fn to_json(&self) -> MontageResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Project settings for media rooted at `root`.
    pub fn project_info(&self, root: impl Into<PathBuf>) -> ProjectInfo {
        ProjectInfo::new(root, self.fps, self.resolution)
    }

    /// Mix timeline samples `[start_sample_position, start_sample_position + required_length)`.
    ///
    /// Layers are mixed concurrently and summed, then the master volume is applied and the
    /// result clamped to `[-1, 1]`.
    #[tracing::instrument(
        skip(self, ctx),
        fields(start = ctx.start_sample_position, len = ctx.required_length)
    )]
    pub async fn mix_audio(&self, ctx: &GetAudioContext) -> MontageResult<AudioChunk> {
        ctx.format.validate()?;
        ctx.check_cancelled()?;

        let buses = join_all(self.layers.iter().map(|l| l.mix_audio(ctx))).await;
        ctx.check_cancelled()?;

        let mut out = AudioChunk::silent(ctx.format, ctx.required_length);
        for bus in buses {
            out.mix_in(&bus?, 0)?;
        }

        let frame = sample_to_frame(ctx.start_sample_position, ctx.fps, ctx.format.sample_rate);
        out.scale((self.volume.get(FrameIndex(frame)) / 100.0).max(0.0) as f32);
        out.clamp_in_place();
        tracing::debug!(layers = self.layers.len(), "mixed audio window");
        Ok(out)
    }
}

#[async_trait]
impl Renderable for TimelineObject {
    async fn render_node(&self, ctx: &RenderContext) -> MontageResult<Option<RenderNode>> {
        let rendered = join_all(self.layers.iter().map(|l| l.content_node(ctx))).await;
        let mut slots = rendered.into_iter().collect::<MontageResult<Vec<_>>>()?;

        for (i, layer) in self.layers.iter().enumerate() {
            let Some(camera) = layer.intervener_at(ctx.frame) else {
                continue;
            };
            let targets: Vec<RenderNode> = slots[camera.layer_target().range_below(i)]
                .iter_mut()
                .filter_map(Option::take)
                .collect();
            slots[i] = Some(camera.apply_control(targets, ctx).await?);
        }

        let nodes: Vec<RenderNode> = slots.into_iter().flatten().collect();
        if nodes.is_empty() {
            return Ok(None);
        }
        Ok(Some(RenderNode::group(nodes)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/timeline.rs"]
mod tests;
