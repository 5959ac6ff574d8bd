use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    animation::interp::{Interpolation, Lerp},
    foundation::core::FrameIndex,
    foundation::error::{MontageError, MontageResult},
};

/// Sampling context for a keyframe parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SampleCtx {
    pub clip_local: FrameIndex, // frame - clip.start
    pub clip_len: Option<u64>,  // frames in the owning clip, when known
}

impl SampleCtx {
    pub fn at(clip_local: FrameIndex) -> Self {
        Self {
            clip_local,
            clip_len: None,
        }
    }
}

/// A time-stamped control point of a [`KeyframeParameter`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyframePoint<T> {
    /// Stable identity used by update/remove.
    pub id: String,
    /// Frame relative to the owning clip's local frame 0.
    pub frame: FrameIndex,
    pub value: T,
    /// Blend applied from this point toward the next one.
    #[serde(default)]
    pub interpolation: Interpolation,
}

impl<T> KeyframePoint<T> {
    pub fn new(id: impl Into<String>, frame: FrameIndex, value: T) -> Self {
        Self {
            id: id.into(),
            frame,
            value,
            interpolation: Interpolation::Linear,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }
}

/// An animated value evaluated by interpolating between time-stamped control points.
///
/// Invariants, upheld by every constructor and mutator:
/// - point ids are unique;
/// - points are sorted by frame (stable for equal frames).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KeyframeParameter<T> {
    points: Vec<KeyframePoint<T>>,
    default: T,
}

impl<'de, T> Deserialize<'de> for KeyframeParameter<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Repr<V> {
            #[serde(default = "Vec::new")]
            points: Vec<KeyframePoint<V>>,
            default: V,
        }

        let repr = Repr::<T>::deserialize(deserializer)?;
        Self::from_points(repr.points, repr.default).map_err(serde::de::Error::custom)
    }
}

impl<T> KeyframeParameter<T> {
    /// An empty parameter that evaluates to `default` everywhere.
    pub fn new(default: T) -> Self {
        Self {
            points: Vec::new(),
            default,
        }
    }

    /// Build from an arbitrary point list, sorting by frame and rejecting duplicate ids.
    pub fn from_points(mut points: Vec<KeyframePoint<T>>, default: T) -> MontageResult<Self> {
        for (i, p) in points.iter().enumerate() {
            if points[..i].iter().any(|q| q.id == p.id) {
                return Err(MontageError::validation(format!(
                    "duplicate keyframe point id '{}'",
                    p.id
                )));
            }
        }
        points.sort_by_key(|p| p.frame);
        Ok(Self { points, default })
    }

    pub fn points(&self) -> &[KeyframePoint<T>] {
        &self.points
    }

    pub fn point(&self, id: &str) -> Option<&KeyframePoint<T>> {
        self.points.iter().find(|p| p.id == id)
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `true` when the value can change over time.
    pub fn is_animated(&self) -> bool {
        self.points.len() > 1
    }

    pub fn add_point(&mut self, point: KeyframePoint<T>) -> MontageResult<()> {
        if self.point(&point.id).is_some() {
            return Err(MontageError::validation(format!(
                "keyframe point id '{}' already exists",
                point.id
            )));
        }
        self.points.push(point);
        self.points.sort_by_key(|p| p.frame);
        Ok(())
    }

    pub fn remove_point(&mut self, id: &str) -> MontageResult<KeyframePoint<T>> {
        let idx = self
            .points
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| MontageError::validation(format!("no keyframe point '{id}'")))?;
        Ok(self.points.remove(idx))
    }

    /// Replace the point carrying `point.id`.
    pub fn update_point(&mut self, point: KeyframePoint<T>) -> MontageResult<()> {
        let slot = self
            .points
            .iter_mut()
            .find(|p| p.id == point.id)
            .ok_or_else(|| {
                MontageError::validation(format!("no keyframe point '{}'", point.id))
            })?;
        *slot = point;
        self.points.sort_by_key(|p| p.frame);
        Ok(())
    }
}

impl<T> KeyframeParameter<T>
where
    T: Lerp + Clone,
{
    /// A parameter holding `value` at every frame.
    pub fn constant(value: T) -> Self {
        Self {
            points: vec![KeyframePoint::new("0", FrameIndex(0), value.clone())],
            default: value,
        }
    }

    /// Drop every point and hold `value` everywhere.
    pub fn set_constant(&mut self, value: T) {
        *self = Self::constant(value);
    }

    pub fn sample(&self, ctx: SampleCtx) -> T {
        self.get(ctx.clip_local)
    }

    /// Value at a clip-local frame. Frames outside the point range clamp to the boundary value.
    pub fn get(&self, frame: FrameIndex) -> T {
        let points = match self.points.as_slice() {
            [] => return self.default.clone(),
            [only] => return only.value.clone(),
            points => points,
        };

        let f = frame.0;
        let idx = points.partition_point(|p| p.frame.0 <= f);
        if idx == 0 {
            return points[0].value.clone();
        }
        if idx >= points.len() {
            return points[points.len() - 1].value.clone();
        }

        let a = &points[idx - 1];
        let b = &points[idx];
        let denom = b.frame.0 - a.frame.0;
        let t = ((f - a.frame.0) as f64) / (denom as f64);
        a.interpolation.interpolate(&a.value, &b.value, t)
    }

    /// Split into two independently owned parameters at a clip-local frame.
    ///
    /// The first half keeps points before `at`; the second keeps the rest re-based so `at`
    /// becomes frame 0. With two or more points, boundary points are synthesized at `at - 1`
    /// (first half) and `0` (second half) so neither half changes value over the frames it
    /// covers.
    pub fn split(&self, at: FrameIndex) -> (Self, Self) {
        if self.points.len() <= 1 {
            return (self.clone(), self.clone());
        }

        let s = at.0;
        let mut first: Vec<KeyframePoint<T>> = self
            .points
            .iter()
            .filter(|p| p.frame.0 < s)
            .cloned()
            .collect();
        let mut second: Vec<KeyframePoint<T>> = self
            .points
            .iter()
            .filter(|p| p.frame.0 >= s)
            .map(|p| KeyframePoint {
                frame: FrameIndex(p.frame.0 - s),
                ..p.clone()
            })
            .collect();

        let has_before = !first.is_empty();
        let has_after = !second.is_empty();

        if has_after && s > 0 && !first.iter().any(|p| p.frame.0 == s - 1) {
            let point = self.boundary_point(FrameIndex(s - 1), FrameIndex(s - 1), &first);
            first.push(point);
        }
        if has_before && !second.iter().any(|p| p.frame.0 == 0) {
            let point = self.boundary_point(at, FrameIndex(0), &second);
            second.insert(0, point);
        }

        (
            Self {
                points: first,
                default: self.default.clone(),
            },
            Self {
                points: second,
                default: self.default.clone(),
            },
        )
    }

    /// Point carrying this parameter's value at `source` (original frames), placed at
    /// `frame`, inheriting the interpolation of the point governing `source`.
    fn boundary_point(
        &self,
        source: FrameIndex,
        frame: FrameIndex,
        taken: &[KeyframePoint<T>],
    ) -> KeyframePoint<T> {
        let governing = self.points.iter().rev().find(|p| p.frame <= source);
        let (base, interpolation) = match governing {
            Some(p) => (p.id.as_str(), p.interpolation),
            None => ("boundary", Interpolation::Hold),
        };

        let mut id = format!("{base}~split");
        let mut n = 2u32;
        while taken.iter().any(|p| p.id == id) {
            id = format!("{base}~split{n}");
            n += 1;
        }

        KeyframePoint {
            id,
            frame,
            value: self.get(source),
            interpolation,
        }
    }
}

impl<T> Default for KeyframeParameter<T>
where
    T: Default,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/keyframe.rs"]
mod tests;
