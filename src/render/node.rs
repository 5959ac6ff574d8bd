use std::ops::Range;

use crate::{
    foundation::core::Vec2,
    render::{blend::BlendMode, image::SharedImage},
};

/// Placement of a node on the output surface, in project pixels.
///
/// `position` is an offset from the canvas center; `rotation` is in degrees about the
/// node's own center.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transform {
    pub position: Vec2,
    pub scale: f64,
    pub rotation: f64,
    pub alpha: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            scale: 1.0,
            rotation: 0.0,
            alpha: 1.0,
        }
    }
}

/// Which layers beneath an intervener it takes control of.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerTarget {
    #[default]
    AllBelow,
    Count(usize),
}

impl LayerTarget {
    /// Layer indices targeted by an intervener sitting at `layer_index` (index 0 is the bottom).
    pub fn range_below(self, layer_index: usize) -> Range<usize> {
        match self {
            Self::AllBelow => 0..layer_index,
            Self::Count(n) => layer_index.saturating_sub(n)..layer_index,
        }
    }
}

/// An already-rasterized unit the compositor paints.
///
/// Children are painted in the same coordinate space as their parent; nesting only groups
/// nodes, it never composes transforms.
#[derive(Clone, Debug, Default)]
pub struct RenderNode {
    pub image: Option<SharedImage>,
    /// Pre-transform size in project pixels.
    pub logical_size: Vec2,
    pub transform: Transform,
    pub blend: BlendMode,
    pub children: Vec<RenderNode>,
    pub layer_target: Option<LayerTarget>,
}

impl RenderNode {
    pub fn leaf(image: SharedImage, logical_size: Vec2, transform: Transform, blend: BlendMode) -> Self {
        Self {
            image: Some(image),
            logical_size,
            transform,
            blend,
            children: Vec::new(),
            layer_target: None,
        }
    }

    /// A content-less node grouping `children`.
    pub fn group(children: Vec<RenderNode>) -> Self {
        Self {
            children,
            ..Self::default()
        }
    }

    /// Number of nodes in this subtree that carry an image.
    pub fn image_count(&self) -> usize {
        usize::from(self.image.is_some())
            + self.children.iter().map(RenderNode::image_count).sum::<usize>()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/node.rs"]
mod tests;
