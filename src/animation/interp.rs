use crate::{animation::ease::Ease, foundation::core::Vec2};

/// Values that can be blended between two keyframe points.
pub trait Lerp: Sized {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for f32 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        (*a as f64 + ((*b as f64 - *a as f64) * t)) as f32
    }
}

impl Lerp for Vec2 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Vec2::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
    }
}

/// How a keyframe point blends toward the next point.
///
/// The strategy lives on the *earlier* point of a segment. It is a closed set so that
/// parameters stay cheap to clone and serialize.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Keep the earlier value until the next point is reached.
    Hold,
    /// Straight-line blend.
    #[default]
    Linear,
    /// Eased blend.
    Ease(Ease),
}

impl Interpolation {
    /// Evaluate the segment `a -> b` at normalized progress `t` in `[0, 1]`.
    pub fn interpolate<T: Lerp + Clone>(self, a: &T, b: &T, t: f64) -> T {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Hold => {
                if t >= 1.0 {
                    b.clone()
                } else {
                    a.clone()
                }
            }
            Self::Linear => T::lerp(a, b, t),
            Self::Ease(ease) => T::lerp(a, b, ease.apply(t)),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/interp.rs"]
mod tests;
