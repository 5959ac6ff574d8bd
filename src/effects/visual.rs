use std::sync::Arc;

use crate::{
    animation::keyframe::{KeyframeParameter, SampleCtx},
    effects::blur::gaussian_blur,
    foundation::core::{FrameIndex, Fps, Vec2},
    foundation::math::{mul_div255_u8, unit_to_u8_scale},
    render::image::{RasterImage, SharedImage},
};

/// Per-clip view of a render request handed to each visual effect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectContext {
    /// Timeline frame being rendered.
    pub frame: FrameIndex,
    /// `frame - clip_start`.
    pub relative_frame: FrameIndex,
    /// `clip_end - clip_start + 1`.
    pub clip_length: u64,
    pub logical_size: Vec2,
    pub fps: Fps,
}

impl EffectContext {
    pub fn sample_ctx(&self) -> SampleCtx {
        SampleCtx {
            clip_local: self.relative_frame,
            clip_len: Some(self.clip_length),
        }
    }
}

/// An image-to-image transform in a clip's effect chain.
///
/// Effects never fail: one that cannot process its input logs and returns the input.
pub trait VisualEffect: Send + Sync {
    fn is_active(&self) -> bool;
    fn apply(&self, input: SharedImage, ctx: &EffectContext) -> SharedImage;
}

impl<T: VisualEffect + ?Sized> VisualEffect for Box<T> {
    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn apply(&self, input: SharedImage, ctx: &EffectContext) -> SharedImage {
        (**self).apply(input, ctx)
    }
}

/// Built-in visual effects. Animated amounts are sampled at the clip-relative frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VisualEffectKind {
    /// Multiply the image by `amount` in `[0, 1]`.
    Opacity { amount: KeyframeParameter<f64> },
    /// Scale color by `1 + amount`; `amount` in `[-1, 1]`.
    Brightness { amount: KeyframeParameter<f64> },
    Grayscale,
    Invert,
    /// Blend toward a flat straight-alpha color by `amount` in `[0, 1]`.
    Tint {
        rgb: [u8; 3],
        amount: KeyframeParameter<f64>,
    },
    Blur { radius_px: u32, sigma: f32 },
}

impl VisualEffectKind {
    /// Split every animated parameter at a clip-relative frame.
    pub fn split(&self, at: FrameIndex) -> (Self, Self) {
        match self {
            Self::Opacity { amount } => {
                let (a, b) = amount.split(at);
                (Self::Opacity { amount: a }, Self::Opacity { amount: b })
            }
            Self::Brightness { amount } => {
                let (a, b) = amount.split(at);
                (Self::Brightness { amount: a }, Self::Brightness { amount: b })
            }
            Self::Tint { rgb, amount } => {
                let (a, b) = amount.split(at);
                (
                    Self::Tint { rgb: *rgb, amount: a },
                    Self::Tint { rgb: *rgb, amount: b },
                )
            }
            Self::Grayscale | Self::Invert | Self::Blur { .. } => (self.clone(), self.clone()),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Opacity { .. } => "opacity",
            Self::Brightness { .. } => "brightness",
            Self::Grayscale => "grayscale",
            Self::Invert => "invert",
            Self::Tint { .. } => "tint",
            Self::Blur { .. } => "blur",
        }
    }

    fn run(&self, input: SharedImage, ctx: &EffectContext) -> SharedImage {
        let sample = ctx.sample_ctx();
        match self {
            Self::Opacity { amount } => {
                let a = amount.sample(sample).clamp(0.0, 1.0);
                if a >= 1.0 {
                    return input;
                }
                let k = unit_to_u8_scale(a as f32);
                map_pixels(input, |px| {
                    for c in px.iter_mut() {
                        *c = mul_div255_u8(u16::from(*c), k);
                    }
                })
            }
            Self::Brightness { amount } => {
                let factor = (1.0 + amount.sample(sample).clamp(-1.0, 1.0)) as f32;
                map_pixels(input, |px| {
                    let a = f32::from(px[3]);
                    for c in &mut px[..3] {
                        *c = (f32::from(*c) * factor).round().clamp(0.0, a) as u8;
                    }
                })
            }
            Self::Grayscale => map_pixels(input, |px| {
                let y = (77 * u32::from(px[0]) + 150 * u32::from(px[1]) + 29 * u32::from(px[2])
                    + 128)
                    >> 8;
                let y = y.min(u32::from(px[3])) as u8;
                px[0] = y;
                px[1] = y;
                px[2] = y;
            }),
            Self::Invert => map_pixels(input, |px| {
                let a = px[3];
                for c in &mut px[..3] {
                    *c = a.saturating_sub(*c);
                }
            }),
            Self::Tint { rgb, amount } => {
                let t = amount.sample(sample).clamp(0.0, 1.0) as f32;
                if t <= 0.0 {
                    return input;
                }
                let rgb = *rgb;
                map_pixels(input, |px| {
                    let a = u16::from(px[3]);
                    for (c, tint) in px[..3].iter_mut().zip(rgb) {
                        let target = f32::from(mul_div255_u8(u16::from(tint), a));
                        let cur = f32::from(*c);
                        *c = (cur + (target - cur) * t).round().clamp(0.0, 255.0) as u8;
                    }
                })
            }
            Self::Blur { radius_px, sigma } => match gaussian_blur(&input, *radius_px, *sigma) {
                Ok(out) => Arc::new(out),
                Err(err) => {
                    tracing::warn!(error = %err, "blur skipped; passing input through");
                    input
                }
            },
        }
    }
}

fn map_pixels(input: SharedImage, mut f: impl FnMut(&mut [u8])) -> SharedImage {
    let mut img: RasterImage = Arc::unwrap_or_clone(input);
    for px in img.data.chunks_exact_mut(4) {
        f(px);
    }
    Arc::new(img)
}

fn default_active() -> bool {
    true
}

/// A configured effect in a clip's ordered chain.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VisualEffectInstance {
    pub id: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub effect: VisualEffectKind,
}

impl VisualEffectInstance {
    pub fn new(id: impl Into<String>, effect: VisualEffectKind) -> Self {
        Self {
            id: id.into(),
            is_active: true,
            effect,
        }
    }

    pub fn split(&self, at: FrameIndex) -> (Self, Self) {
        let (a, b) = self.effect.split(at);
        (
            Self {
                effect: a,
                ..self.clone()
            },
            Self {
                effect: b,
                ..self.clone()
            },
        )
    }
}

impl VisualEffect for VisualEffectInstance {
    fn is_active(&self) -> bool {
        self.is_active
    }

    fn apply(&self, input: SharedImage, ctx: &EffectContext) -> SharedImage {
        tracing::trace!(id = %self.id, effect = self.effect.name(), "visual effect");
        self.effect.run(input, ctx)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/visual.rs"]
mod tests;
