use crate::foundation::error::{MontageError, MontageResult};

pub use kurbo::{Affine, Point, Vec2};

/// Zero-based frame address on the timeline or inside a clip.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Inclusive frame range `[start, end]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FrameSpan {
    /// First frame covered.
    pub start: FrameIndex,
    /// Last frame covered (inclusive).
    pub end: FrameIndex,
}

impl FrameSpan {
    /// Build a span, rejecting `start > end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> MontageResult<Self> {
        if start.0 > end.0 {
            return Err(MontageError::validation(format!(
                "frame span start ({}) must be <= end ({})",
                start.0, end.0
            )));
        }
        Ok(Self { start, end })
    }

    /// Number of frames covered, always >= 1. A hand-built inverted span counts as one frame.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0) + 1
    }

    /// `start <= f <= end`.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 <= self.end.0
    }

    /// Inclusive-bounds intersection test. Adjacent spans do not overlap.
    pub fn overlaps(self, other: FrameSpan) -> bool {
        self.start.0 <= other.end.0 && self.end.0 >= other.start.0
    }

    /// Frame relative to `start`, saturating at 0 for frames before the span.
    pub fn local(self, f: FrameIndex) -> FrameIndex {
        FrameIndex(f.0.saturating_sub(self.start.0))
    }

    /// Move the span so it starts at `start`, keeping its length.
    pub fn moved_to(self, start: FrameIndex) -> Self {
        let len = self.end.0 - self.start.0;
        Self {
            start,
            end: FrameIndex(start.0.saturating_add(len)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> MontageResult<Self> {
        if den == 0 {
            return Err(MontageError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(MontageError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }

    pub fn secs_to_frames_floor(self, secs: f64) -> u64 {
        (secs * self.as_f64()).floor().max(0.0) as u64
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 30, den: 1 }
    }
}

/// Pixel dimensions of a canvas, surface or image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn validate(self) -> MontageResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MontageError::validation(format!(
                "resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(f64::from(self.width), f64::from(self.height))
    }

    /// Number of RGBA8 bytes needed for a tightly packed surface.
    pub fn rgba8_len(self) -> MontageResult<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| MontageError::evaluation("surface size overflow"))
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8Premul {
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
