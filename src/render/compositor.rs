use std::sync::Arc;

use async_trait::async_trait;
use kurbo::Rect;
use tokio_util::sync::CancellationToken;

use crate::{
    accessor::{FileAccessors, ProjectInfo},
    foundation::core::{Affine, FrameIndex, Fps, Point, Resolution, Rgba8Premul, Vec2},
    foundation::error::{MontageError, MontageResult},
    render::{
        blend::BlendMode,
        image::{RasterImage, SharedImage},
        node::{RenderNode, Transform},
    },
};

/// Everything a render request carries down the scene graph.
#[derive(Clone, Debug)]
pub struct RenderContext {
    pub frame: FrameIndex,
    pub fps: Fps,
    pub project_resolution: Resolution,
    pub render_resolution: Resolution,
    pub clear: Rgba8Premul,
    pub accessors: FileAccessors,
    pub project: ProjectInfo,
    pub cancel: CancellationToken,
}

impl RenderContext {
    /// A request rendering `frame` at project resolution onto a transparent surface.
    pub fn new(frame: FrameIndex, project: ProjectInfo, accessors: FileAccessors) -> Self {
        Self {
            frame,
            fps: project.fps,
            project_resolution: project.resolution,
            render_resolution: project.resolution,
            clear: Rgba8Premul::transparent(),
            accessors,
            project,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_render_resolution(mut self, resolution: Resolution) -> Self {
        self.render_resolution = resolution;
        self
    }

    pub fn with_clear(mut self, clear: Rgba8Premul) -> Self {
        self.clear = clear;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn at_frame(&self, frame: FrameIndex) -> Self {
        Self {
            frame,
            ..self.clone()
        }
    }

    pub fn check_cancelled(&self) -> MontageResult<()> {
        if self.cancel.is_cancelled() {
            return Err(MontageError::Cancelled);
        }
        Ok(())
    }

    /// Render-to-project scale per axis.
    pub fn scale_factors(&self) -> Vec2 {
        Vec2::new(
            f64::from(self.render_resolution.width) / f64::from(self.project_resolution.width),
            f64::from(self.render_resolution.height) / f64::from(self.project_resolution.height),
        )
    }
}

/// Anything that can produce a render tree for a frame.
#[async_trait]
pub trait Renderable: Send + Sync {
    /// `Ok(None)` when nothing is visible at `ctx.frame`.
    async fn render_node(&self, ctx: &RenderContext) -> MontageResult<Option<RenderNode>>;
}

/// Build `root`'s tree for `ctx.frame` and composite it onto a fresh surface.
///
/// Cancellation is observed before the tree is requested, while it is being built, and
/// again before drawing. A cancelled request returns [`MontageError::Cancelled`] and draws
/// nothing.
#[tracing::instrument(skip(root, ctx), fields(frame = ctx.frame.0))]
pub async fn render_frame<R>(root: &R, ctx: &RenderContext) -> MontageResult<SharedImage>
where
    R: Renderable + ?Sized,
{
    ctx.project_resolution.validate()?;
    ctx.render_resolution.validate()?;
    ctx.check_cancelled()?;

    let tree = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => return Err(MontageError::Cancelled),
        tree = root.render_node(ctx) => tree?,
    };
    ctx.check_cancelled()?;

    let mut surface = RasterImage::filled(ctx.render_resolution, ctx.clear)?;
    if let Some(tree) = &tree {
        paint_node(&mut surface, tree, ctx.scale_factors());
        tracing::debug!(images = tree.image_count(), "composited frame");
    }
    Ok(Arc::new(surface))
}

/// Paint `node` and then its children, in pre-order, each with only its own transform.
pub fn paint_node(surface: &mut RasterImage, node: &RenderNode, scale: Vec2) {
    if let Some(image) = &node.image {
        draw_image(
            surface,
            image,
            node.logical_size,
            &node.transform,
            node.blend,
            scale,
        );
    }
    for child in &node.children {
        paint_node(surface, child, scale);
    }
}

pub fn paint_nodes(surface: &mut RasterImage, nodes: &[RenderNode], scale: Vec2) {
    for node in nodes {
        paint_node(surface, node, scale);
    }
}

/// Affine mapping image pixels onto the surface for a node.
pub(crate) fn node_affine(
    surface: Resolution,
    image: Resolution,
    logical_size: Vec2,
    transform: &Transform,
    scale: Vec2,
) -> Option<Affine> {
    let drawn_w = logical_size.x * transform.scale * scale.x;
    let drawn_h = logical_size.y * transform.scale * scale.y;
    if !(drawn_w.is_finite() && drawn_h.is_finite()) || drawn_w <= 0.0 || drawn_h <= 0.0 {
        return None;
    }
    let img = image.as_vec2();
    let center = surface.as_vec2() * 0.5
        + Vec2::new(
            transform.position.x * scale.x,
            transform.position.y * scale.y,
        );

    Some(
        Affine::translate(center)
            * Affine::rotate(transform.rotation.to_radians())
            * Affine::scale_non_uniform(drawn_w / img.x, drawn_h / img.y)
            * Affine::translate(-img * 0.5),
    )
}

fn draw_image(
    surface: &mut RasterImage,
    image: &RasterImage,
    logical_size: Vec2,
    transform: &Transform,
    blend: BlendMode,
    scale: Vec2,
) {
    let alpha = transform.alpha.clamp(0.0, 1.0) as f32;
    if alpha <= 0.0 || image.width == 0 || image.height == 0 {
        return;
    }
    let Some(affine) = node_affine(
        surface.resolution(),
        image.resolution(),
        logical_size,
        transform,
        scale,
    ) else {
        return;
    };
    let inv = affine.inverse();

    let img_w = f64::from(image.width);
    let img_h = f64::from(image.height);
    let bbox = affine.transform_rect_bbox(Rect::new(0.0, 0.0, img_w, img_h));
    let x0 = bbox.x0.floor().max(0.0) as u32;
    let y0 = bbox.y0.floor().max(0.0) as u32;
    let x1 = bbox.x1.ceil().min(f64::from(surface.width)).max(0.0) as u32;
    let y1 = bbox.y1.ceil().min(f64::from(surface.height)).max(0.0) as u32;

    let kernel = blend.kernel();
    let stride = surface.width as usize * 4;
    let src_stride = image.width as usize * 4;

    for y in y0..y1 {
        let row = y as usize * stride;
        for x in x0..x1 {
            let p = inv * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            if p.x < 0.0 || p.y < 0.0 || p.x >= img_w || p.y >= img_h {
                continue;
            }
            let si = (p.y as usize) * src_stride + (p.x as usize) * 4;
            let src = [
                image.data[si],
                image.data[si + 1],
                image.data[si + 2],
                image.data[si + 3],
            ];
            let di = row + x as usize * 4;
            let dst = [
                surface.data[di],
                surface.data[di + 1],
                surface.data[di + 2],
                surface.data[di + 3],
            ];
            surface.data[di..di + 4].copy_from_slice(&kernel(dst, src, alpha));
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
