use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    foundation::core::{Affine, Point, Vec2},
    foundation::error::MontageResult,
    render::{
        blend::BlendMode,
        compositor::{RenderContext, paint_nodes},
        image::RasterImage,
        node::{LayerTarget, RenderNode, Transform},
    },
};

/// A clip that, instead of drawing content, takes over the rendered output of the layers
/// beneath it.
#[async_trait]
pub trait LayerIntervener: Send + Sync {
    fn layer_target(&self) -> LayerTarget;

    /// Consume the already-rendered nodes of the targeted layers and return the node that
    /// replaces them in this intervener's slot.
    async fn apply_control(
        &self,
        targets: Vec<RenderNode>,
        ctx: &RenderContext,
    ) -> MontageResult<RenderNode>;
}

/// A virtual camera sampled at one frame.
///
/// `view.position` is the point of the project looked at (offset from center),
/// `view.scale` the zoom, `view.rotation` the roll in degrees and `view.alpha` the opacity
/// of the resulting shot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub view: Transform,
    pub target: LayerTarget,
}

impl Camera {
    /// Transform that maps the baked project surface into the camera's view.
    pub fn shot_transform(&self) -> Transform {
        let zoom = self.view.scale;
        let pan = self.view.position * zoom;
        let unroll = Affine::rotate((-self.view.rotation).to_radians());
        let offset: Vec2 = (unroll * Point::new(pan.x, pan.y)).to_vec2();
        Transform {
            position: -offset,
            scale: zoom,
            rotation: -self.view.rotation,
            alpha: self.view.alpha,
        }
    }
}

#[async_trait]
impl LayerIntervener for Camera {
    fn layer_target(&self) -> LayerTarget {
        self.target
    }

    async fn apply_control(
        &self,
        targets: Vec<RenderNode>,
        ctx: &RenderContext,
    ) -> MontageResult<RenderNode> {
        ctx.check_cancelled()?;
        let mut baked = RasterImage::transparent(ctx.project_resolution)?;
        paint_nodes(&mut baked, &targets, Vec2::new(1.0, 1.0));

        let mut node = RenderNode::leaf(
            Arc::new(baked),
            ctx.project_resolution.as_vec2(),
            self.shot_transform(),
            BlendMode::Normal,
        );
        node.layer_target = Some(self.target);
        Ok(node)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/intervener.rs"]
mod tests;
