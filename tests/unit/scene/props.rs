use super::*;

use crate::{animation::keyframe::KeyframePoint, effects::visual::VisualEffectKind};

#[test]
fn defaults_produce_identity_transform() {
    let t = VisualProps::default().transform_at(SampleCtx::at(FrameIndex(42)));
    assert_eq!(t, Transform::default());
}

#[test]
fn opacity_is_clamped_into_alpha() {
    let props = VisualProps {
        opacity: KeyframeParameter::constant(3.0),
        ..VisualProps::default()
    };
    assert_eq!(props.transform_at(SampleCtx::at(FrameIndex(0))).alpha, 1.0);
}

#[test]
fn effect_mutators() {
    let mut props = VisualProps::default();
    props
        .add_effect(VisualEffectInstance::new("g", VisualEffectKind::Grayscale))
        .unwrap();
    assert!(
        props
            .add_effect(VisualEffectInstance::new("g", VisualEffectKind::Invert))
            .is_err()
    );

    props.set_effect_active("g", false).unwrap();
    assert!(!props.effect("g").unwrap().is_active);
    assert!(props.set_effect_active("missing", true).is_err());

    let removed = props.remove_effect("g").unwrap();
    assert_eq!(removed.effect, VisualEffectKind::Grayscale);
    assert!(props.remove_effect("g").is_err());
}

#[test]
fn split_rebases_position_and_keeps_blend() {
    let props = VisualProps {
        position_x: KeyframeParameter::from_points(
            vec![
                KeyframePoint::new("a", FrameIndex(0), 0.0),
                KeyframePoint::new("b", FrameIndex(20), 200.0),
            ],
            0.0,
        )
        .unwrap(),
        blend: BlendMode::Screen,
        ..VisualProps::default()
    };
    let (first, second) = props.split(FrameIndex(10));
    let at = |p: &VisualProps, f: u64| p.transform_at(SampleCtx::at(FrameIndex(f))).position.x;

    assert!((at(&first, 9) - 90.0).abs() < 1e-9);
    assert!((at(&second, 0) - 100.0).abs() < 1e-9);
    assert!((at(&second, 10) - 200.0).abs() < 1e-9);
    assert_eq!(first.blend, BlendMode::Screen);
    assert_eq!(second.blend, BlendMode::Screen);
}

#[test]
fn missing_fields_deserialize_to_defaults() {
    let props: VisualProps = serde_json::from_str("{}").unwrap();
    assert_eq!(props, VisualProps::default());
}
