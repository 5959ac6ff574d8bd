use crate::{
    effects::visual::{EffectContext, VisualEffect},
    foundation::core::{FrameIndex, Vec2},
    render::{compositor::RenderContext, image::SharedImage},
};

/// Fold the active effects of a clip's chain over `input`, in order.
///
/// With no active effect the input handle itself is returned. Inactive effects are never
/// invoked.
pub fn apply_effects<E: VisualEffect>(
    input: SharedImage,
    effects: &[E],
    ctx: &RenderContext,
    clip_start: FrameIndex,
    clip_end: FrameIndex,
    logical_size: Vec2,
) -> SharedImage {
    let mut active = effects.iter().filter(|e| e.is_active()).peekable();
    if active.peek().is_none() {
        return input;
    }

    let effect_ctx = EffectContext {
        frame: ctx.frame,
        relative_frame: FrameIndex(ctx.frame.0.saturating_sub(clip_start.0)),
        clip_length: clip_end.0.saturating_sub(clip_start.0) + 1,
        logical_size,
        fps: ctx.fps,
    };

    active.fold(input, |image, effect| effect.apply(image, &effect_ctx))
}

#[cfg(test)]
#[path = "../../tests/unit/effects/pipeline.rs"]
mod tests;
