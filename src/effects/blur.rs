use crate::{
    foundation::error::{MontageError, MontageResult},
    render::image::RasterImage,
};

const Q16_ONE: i64 = 1 << 16;

/// Separable gaussian blur over premultiplied RGBA8 with Q16 fixed-point weights.
///
/// Edges clamp. `radius == 0` returns a copy of the input.
pub fn gaussian_blur(src: &RasterImage, radius: u32, sigma: f32) -> MontageResult<RasterImage> {
    let expected = src.resolution().rgba8_len()?;
    if src.data.len() != expected {
        return Err(MontageError::evaluation(format!(
            "blur input holds {} bytes, expected {expected}",
            src.data.len()
        )));
    }
    if radius == 0 {
        return Ok(src.clone());
    }

    let kernel = kernel_q16(radius, sigma)?;
    let (w, h) = (src.width as usize, src.height as usize);

    let mut tmp = vec![0u8; expected];
    convolve(&src.data, &mut tmp, w, h, Axis::Horizontal, &kernel);
    let mut out = vec![0u8; expected];
    convolve(&tmp, &mut out, w, h, Axis::Vertical, &kernel);

    RasterImage::from_premul_rgba8(src.width, src.height, out)
}

fn kernel_q16(radius: u32, sigma: f32) -> MontageResult<Vec<u32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(MontageError::validation("blur sigma must be > 0"));
    }

    let r = i64::from(radius);
    let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
    let weights: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = i as f64;
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        return Err(MontageError::evaluation("gaussian kernel sum is zero"));
    }

    let mut q: Vec<i64> = weights
        .iter()
        .map(|w| ((w / sum) * Q16_ONE as f64).round().clamp(0.0, Q16_ONE as f64) as i64)
        .collect();

    // Push the rounding residue into the center tap so the weights sum to exactly one.
    let residue = Q16_ONE - q.iter().sum::<i64>();
    let mid = q.len() / 2;
    q[mid] = (q[mid] + residue).clamp(0, Q16_ONE);

    Ok(q.into_iter().map(|v| v as u32).collect())
}

#[derive(Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}

fn convolve(src: &[u8], dst: &mut [u8], w: usize, h: usize, axis: Axis, k: &[u32]) {
    let radius = (k.len() / 2) as isize;
    let (len, step) = match axis {
        Axis::Horizontal => (w, 4),
        Axis::Vertical => (h, w * 4),
    };
    let lines = match axis {
        Axis::Horizontal => h,
        Axis::Vertical => w,
    };

    for line in 0..lines {
        let base = match axis {
            Axis::Horizontal => line * w * 4,
            Axis::Vertical => line * 4,
        };
        for i in 0..len {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let j = (i as isize + ki as isize - radius).clamp(0, len as isize - 1) as usize;
                let idx = base + j * step;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out = base + i * step;
            for c in 0..4 {
                dst[out + c] = (((acc[c] + 0x8000) >> 16).min(255)) as u8;
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blur.rs"]
mod tests;
