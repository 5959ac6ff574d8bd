use super::*;

use crate::animation::keyframe::KeyframePoint;

fn ctx(relative: u64) -> EffectContext {
    EffectContext {
        frame: FrameIndex(relative),
        relative_frame: FrameIndex(relative),
        clip_length: 100,
        logical_size: Vec2::new(1.0, 1.0),
        fps: Fps::default(),
    }
}

fn px(p: [u8; 4]) -> SharedImage {
    Arc::new(RasterImage::from_premul_rgba8(1, 1, p.to_vec()).unwrap())
}

fn run(kind: VisualEffectKind, p: [u8; 4]) -> [u8; 4] {
    VisualEffectInstance::new("fx", kind)
        .apply(px(p), &ctx(0))
        .pixel(0, 0)
        .unwrap()
}

#[test]
fn opacity_scales_all_channels() {
    let out = run(
        VisualEffectKind::Opacity {
            amount: KeyframeParameter::constant(0.5),
        },
        [200, 100, 0, 255],
    );
    assert_eq!(out, [100, 50, 0, 128]);
}

#[test]
fn full_opacity_returns_the_same_image() {
    let input = px([1, 2, 3, 4]);
    let fx = VisualEffectInstance::new(
        "fx",
        VisualEffectKind::Opacity {
            amount: KeyframeParameter::constant(1.0),
        },
    );
    let out = fx.apply(input.clone(), &ctx(0));
    assert!(Arc::ptr_eq(&input, &out));
}

#[test]
fn invert_is_premultiplied() {
    assert_eq!(run(VisualEffectKind::Invert, [10, 20, 30, 128]), [118, 108, 98, 128]);
}

#[test]
fn grayscale_of_white_stays_white() {
    assert_eq!(
        run(VisualEffectKind::Grayscale, [255, 255, 255, 255]),
        [255, 255, 255, 255]
    );
    let out = run(VisualEffectKind::Grayscale, [255, 0, 0, 255]);
    assert_eq!(out[0], out[1]);
    assert_eq!(out[1], out[2]);
}

#[test]
fn brightness_never_exceeds_alpha() {
    let out = run(
        VisualEffectKind::Brightness {
            amount: KeyframeParameter::constant(1.0),
        },
        [100, 50, 10, 128],
    );
    assert_eq!(out, [128, 100, 20, 128]);
}

#[test]
fn full_tint_replaces_color_keeping_alpha() {
    let out = run(
        VisualEffectKind::Tint {
            rgb: [255, 0, 0],
            amount: KeyframeParameter::constant(1.0),
        },
        [10, 200, 30, 255],
    );
    assert_eq!(out, [255, 0, 0, 255]);
}

#[test]
fn animated_amount_is_sampled_at_relative_frame() {
    let amount = KeyframeParameter::from_points(
        vec![
            KeyframePoint::new("a", FrameIndex(0), 0.0),
            KeyframePoint::new("b", FrameIndex(10), 1.0),
        ],
        1.0,
    )
    .unwrap();
    let fx = VisualEffectInstance::new("fx", VisualEffectKind::Opacity { amount });
    let out = fx.apply(px([255, 255, 255, 255]), &ctx(0));
    assert_eq!(out.pixel(0, 0), Some([0, 0, 0, 0]));
}

#[test]
fn invalid_blur_passes_input_through() {
    let input = px([9, 9, 9, 9]);
    let fx = VisualEffectInstance::new(
        "fx",
        VisualEffectKind::Blur {
            radius_px: 2,
            sigma: -1.0,
        },
    );
    let out = fx.apply(input.clone(), &ctx(0));
    assert!(Arc::ptr_eq(&input, &out));
}

#[test]
fn split_splits_animated_amounts() {
    let amount = KeyframeParameter::from_points(
        vec![
            KeyframePoint::new("a", FrameIndex(0), 0.0),
            KeyframePoint::new("b", FrameIndex(10), 1.0),
        ],
        1.0,
    )
    .unwrap();
    let fx = VisualEffectInstance::new("fx", VisualEffectKind::Opacity { amount });
    let (first, second) = fx.split(FrameIndex(5));
    assert_eq!(first.id, "fx");
    assert_eq!(second.id, "fx");
    let VisualEffectKind::Opacity { amount } = &second.effect else {
        panic!("expected opacity");
    };
    assert!((amount.get(FrameIndex(0)) - 0.5).abs() < 1e-9);
    assert!((amount.get(FrameIndex(5)) - 1.0).abs() < 1e-9);
}

#[test]
fn instance_json_shape() {
    let fx = VisualEffectInstance::new("g", VisualEffectKind::Grayscale);
    let json = serde_json::to_value(&fx).unwrap();
    assert_eq!(json["effect"]["type"], "grayscale");
    let back: VisualEffectInstance =
        serde_json::from_str(r#"{"id":"g","effect":{"type":"invert"}}"#).unwrap();
    assert!(back.is_active);
    assert_eq!(back.effect, VisualEffectKind::Invert);
}
