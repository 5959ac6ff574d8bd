use crate::{
    animation::keyframe::{KeyframeParameter, SampleCtx},
    effects::visual::VisualEffectInstance,
    foundation::core::{FrameIndex, Vec2},
    foundation::error::{MontageError, MontageResult},
    render::{blend::BlendMode, node::Transform},
};

fn zero() -> KeyframeParameter<f64> {
    KeyframeParameter::constant(0.0)
}

fn one() -> KeyframeParameter<f64> {
    KeyframeParameter::constant(1.0)
}

/// Animated placement, blending and effect chain shared by every visual clip kind.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VisualProps {
    /// Pixels right of the canvas center, in project space.
    #[serde(default = "zero")]
    pub position_x: KeyframeParameter<f64>,
    /// Pixels below the canvas center, in project space.
    #[serde(default = "zero")]
    pub position_y: KeyframeParameter<f64>,
    /// 1.0 = 100%.
    #[serde(default = "one")]
    pub scale: KeyframeParameter<f64>,
    /// Degrees, clockwise.
    #[serde(default = "zero")]
    pub rotation: KeyframeParameter<f64>,
    /// 0..1.
    #[serde(default = "one")]
    pub opacity: KeyframeParameter<f64>,
    #[serde(default)]
    pub blend: BlendMode,
    #[serde(default)]
    pub effects: Vec<VisualEffectInstance>,
}

impl Default for VisualProps {
    fn default() -> Self {
        Self {
            position_x: zero(),
            position_y: zero(),
            scale: one(),
            rotation: zero(),
            opacity: one(),
            blend: BlendMode::Normal,
            effects: Vec::new(),
        }
    }
}

impl VisualProps {
    pub fn transform_at(&self, ctx: SampleCtx) -> Transform {
        Transform {
            position: Vec2::new(self.position_x.sample(ctx), self.position_y.sample(ctx)),
            scale: self.scale.sample(ctx),
            rotation: self.rotation.sample(ctx),
            alpha: self.opacity.sample(ctx).clamp(0.0, 1.0),
        }
    }

    /// Split every animated parameter, including effect parameters, at a clip-relative frame.
    pub fn split(&self, at: FrameIndex) -> (Self, Self) {
        let (px1, px2) = self.position_x.split(at);
        let (py1, py2) = self.position_y.split(at);
        let (s1, s2) = self.scale.split(at);
        let (r1, r2) = self.rotation.split(at);
        let (o1, o2) = self.opacity.split(at);
        let (e1, e2): (Vec<_>, Vec<_>) = self.effects.iter().map(|e| e.split(at)).unzip();
        (
            Self {
                position_x: px1,
                position_y: py1,
                scale: s1,
                rotation: r1,
                opacity: o1,
                blend: self.blend,
                effects: e1,
            },
            Self {
                position_x: px2,
                position_y: py2,
                scale: s2,
                rotation: r2,
                opacity: o2,
                blend: self.blend,
                effects: e2,
            },
        )
    }

    pub fn effect(&self, id: &str) -> Option<&VisualEffectInstance> {
        self.effects.iter().find(|e| e.id == id)
    }

    pub fn add_effect(&mut self, effect: VisualEffectInstance) -> MontageResult<()> {
        if self.effect(&effect.id).is_some() {
            return Err(MontageError::validation(format!(
                "effect id '{}' already exists",
                effect.id
            )));
        }
        self.effects.push(effect);
        Ok(())
    }

    pub fn remove_effect(&mut self, id: &str) -> MontageResult<VisualEffectInstance> {
        let idx = self
            .effects
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| MontageError::validation(format!("unknown effect id '{id}'")))?;
        Ok(self.effects.remove(idx))
    }

    pub fn set_effect_active(&mut self, id: &str, active: bool) -> MontageResult<()> {
        let effect = self
            .effects
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| MontageError::validation(format!("unknown effect id '{id}'")))?;
        effect.is_active = active;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/props.rs"]
mod tests;
