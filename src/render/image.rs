use std::sync::Arc;

use crate::{
    foundation::core::{Resolution, Rgba8Premul},
    foundation::error::{MontageError, MontageResult},
    foundation::math::premultiply_rgba8_in_place,
};

/// A raster image as premultiplied RGBA8 pixels, tightly packed and row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Reference-counted image shared between the render pipeline and its consumers.
///
/// The buffer is released when the last handle drops.
pub type SharedImage = Arc<RasterImage>;

impl RasterImage {
    pub fn transparent(size: Resolution) -> MontageResult<Self> {
        Self::filled(size, Rgba8Premul::transparent())
    }

    pub fn filled(size: Resolution, color: Rgba8Premul) -> MontageResult<Self> {
        size.validate()?;
        let px = color.to_array();
        let data = px.repeat(size.rgba8_len()? / 4);
        Ok(Self {
            width: size.width,
            height: size.height,
            data,
        })
    }

    /// Wrap bytes that are already premultiplied.
    pub fn from_premul_rgba8(width: u32, height: u32, data: Vec<u8>) -> MontageResult<Self> {
        let expected = Resolution::new(width, height).rgba8_len()?;
        if data.len() != expected {
            return Err(MontageError::evaluation(format!(
                "image byte len {} does not match {width}x{height}x4",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Premultiply straight-alpha RGBA8 bytes.
    pub fn from_straight_rgba8(width: u32, height: u32, mut data: Vec<u8>) -> MontageResult<Self> {
        premultiply_rgba8_in_place(&mut data);
        Self::from_premul_rgba8(width, height, data)
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ])
    }

    /// Un-premultiplied copy of the pixels, for encoders that expect straight alpha.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(4) {
            let a = u32::from(px[3]);
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        out
    }
}

/// A display-side holder of the latest rendered image.
///
/// Assigning the image it already holds is a no-op, so reference counts are not perturbed.
#[derive(Debug, Default)]
pub struct DisplaySurface {
    image: Option<SharedImage>,
}

impl DisplaySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self) -> Option<&SharedImage> {
        self.image.as_ref()
    }

    /// Replace the displayed image. Returns `false` when `image` is the one already shown.
    pub fn set_image(&mut self, image: Option<SharedImage>) -> bool {
        let same = match (&self.image, &image) {
            (Some(current), Some(next)) => Arc::ptr_eq(current, next),
            (None, None) => true,
            _ => false,
        };
        if same {
            return false;
        }
        self.image = image;
        true
    }

    pub fn clear(&mut self) {
        self.image = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/image.rs"]
mod tests;
