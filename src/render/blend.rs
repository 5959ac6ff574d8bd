use crate::foundation::math::{mul_div255_u8, unit_to_u8_scale};

pub type PremulRgba8 = [u8; 4];

/// Blend mode used when painting a node over what is already on the surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Standard premultiplied "source over destination".
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    SoftLight,
    HardLight,
    Difference,
    Exclusion,
}

/// Per-pixel compositing kernel selected once per node.
pub type PixelKernel = fn(PremulRgba8, PremulRgba8, f32) -> PremulRgba8;

impl BlendMode {
    /// Kernel painting `src` over `dst` with an extra opacity factor.
    pub fn kernel(self) -> PixelKernel {
        match self {
            Self::Normal => over,
            Self::Multiply => |d, s, o| blend_over(d, s, o, |s, d| s * d),
            Self::Screen => |d, s, o| blend_over(d, s, o, |s, d| s + d - s * d),
            Self::Overlay => |d, s, o| {
                blend_over(d, s, o, |s, d| {
                    if d <= 0.5 {
                        2.0 * s * d
                    } else {
                        1.0 - 2.0 * (1.0 - s) * (1.0 - d)
                    }
                })
            },
            Self::Darken => |d, s, o| blend_over(d, s, o, |s, d| s.min(d)),
            Self::Lighten => |d, s, o| blend_over(d, s, o, |s, d| s.max(d)),
            Self::ColorDodge => |d, s, o| {
                blend_over(d, s, o, |s, d| {
                    if s >= 1.0 {
                        1.0
                    } else {
                        (d / (1.0 - s)).min(1.0)
                    }
                })
            },
            Self::ColorBurn => |d, s, o| {
                blend_over(d, s, o, |s, d| {
                    if s <= 0.0 {
                        0.0
                    } else {
                        1.0 - ((1.0 - d) / s).min(1.0)
                    }
                })
            },
            Self::SoftLight => |d, s, o| {
                blend_over(d, s, o, |s, d| {
                    if s <= 0.5 {
                        d - (1.0 - 2.0 * s) * d * (1.0 - d)
                    } else {
                        let g = if d <= 0.25 {
                            ((16.0 * d - 12.0) * d + 4.0) * d
                        } else {
                            d.sqrt()
                        };
                        d + (2.0 * s - 1.0) * (g - d)
                    }
                })
            },
            Self::HardLight => |d, s, o| {
                blend_over(d, s, o, |s, d| {
                    if s <= 0.5 {
                        2.0 * s * d
                    } else {
                        1.0 - 2.0 * (1.0 - s) * (1.0 - d)
                    }
                })
            },
            Self::Difference => |d, s, o| blend_over(d, s, o, |s, d| (d - s).abs()),
            Self::Exclusion => |d, s, o| blend_over(d, s, o, |s, d| d + s - 2.0 * d * s),
        }
    }
}

/// Premultiplied source-over with an opacity multiplier, in 8-bit fixed point.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = unit_to_u8_scale(opacity);
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

// Porter-Duff source-over with the blend function applied to unpremultiplied channels:
// out_a = sa + da * (1 - sa)
// out_p = sp * (1 - da) + dp * (1 - sa) + B(sc, dc) * sa * da
#[inline(always)]
fn blend_over<F>(dst: PremulRgba8, src: PremulRgba8, opacity: f32, blend_fn: F) -> PremulRgba8
where
    F: Fn(f32, f32) -> f32,
{
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let sa = (f32::from(src[3]) / 255.0) * opacity;
    let da = f32::from(dst[3]) / 255.0;
    let out_a = (sa + da * (1.0 - sa)).clamp(0.0, 1.0);

    let mut out = [0u8; 4];
    for i in 0..3 {
        let sp = (f32::from(src[i]) / 255.0) * opacity;
        let dp = f32::from(dst[i]) / 255.0;
        let sc = if sa > 0.0 {
            (sp / sa).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let dc = if da > 0.0 {
            (dp / da).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let b = blend_fn(sc, dc).clamp(0.0, 1.0);
        let p = (sp * (1.0 - da) + dp * (1.0 - sa) + b * sa * da).clamp(0.0, 1.0);
        out[i] = (p * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/blend.rs"]
mod tests;
