use super::*;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use crate::{
    accessor::{FileAccessors, ProjectInfo},
    foundation::core::{Fps, Resolution},
    render::image::RasterImage,
};

/// Adds `delta` to the red channel and records what it saw.
struct Bump {
    active: bool,
    delta: u8,
    calls: Arc<AtomicUsize>,
    seen_relative: Arc<AtomicUsize>,
    seen_len: Arc<AtomicUsize>,
}

impl Bump {
    fn new(active: bool, delta: u8) -> Self {
        Self {
            active,
            delta,
            calls: Arc::new(AtomicUsize::new(0)),
            seen_relative: Arc::new(AtomicUsize::new(0)),
            seen_len: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl VisualEffect for Bump {
    fn is_active(&self) -> bool {
        self.active
    }

    fn apply(&self, input: SharedImage, ctx: &EffectContext) -> SharedImage {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_relative
            .store(ctx.relative_frame.0 as usize, Ordering::SeqCst);
        self.seen_len.store(ctx.clip_length as usize, Ordering::SeqCst);
        let mut img = (*input).clone();
        img.data[0] = img.data[0].saturating_add(self.delta);
        Arc::new(img)
    }
}

fn input() -> SharedImage {
    Arc::new(RasterImage::from_premul_rgba8(1, 1, vec![0, 0, 0, 255]).unwrap())
}

fn ctx(frame: u64) -> RenderContext {
    RenderContext::new(
        FrameIndex(frame),
        ProjectInfo::new(".", Fps::default(), Resolution::new(1, 1)),
        FileAccessors::new(),
    )
}

fn run(effects: &[Bump], image: SharedImage) -> SharedImage {
    apply_effects(
        image,
        effects,
        &ctx(25),
        FrameIndex(10),
        FrameIndex(49),
        Vec2::new(1.0, 1.0),
    )
}

#[test]
fn empty_chain_returns_same_instance() {
    let img = input();
    let out = run(&[], img.clone());
    assert!(Arc::ptr_eq(&img, &out));
}

#[test]
fn all_inactive_chain_returns_same_instance_without_calls() {
    let effects = [Bump::new(false, 1), Bump::new(false, 2)];
    let img = input();
    let out = run(&effects, img.clone());
    assert!(Arc::ptr_eq(&img, &out));
    assert!(effects.iter().all(|e| e.calls.load(Ordering::SeqCst) == 0));
}

#[test]
fn single_active_effect_output_is_returned() {
    let out = run(&[Bump::new(true, 7)], input());
    assert_eq!(out.pixel(0, 0), Some([7, 0, 0, 255]));
}

#[test]
fn active_effects_fold_in_order_and_skip_inactive() {
    let effects = [Bump::new(true, 1), Bump::new(false, 100), Bump::new(true, 2)];
    let out = run(&effects, input());
    assert_eq!(out.pixel(0, 0), Some([3, 0, 0, 255]));
    assert_eq!(effects[0].calls.load(Ordering::SeqCst), 1);
    assert_eq!(effects[1].calls.load(Ordering::SeqCst), 0);
    assert_eq!(effects[2].calls.load(Ordering::SeqCst), 1);
}

#[test]
fn effects_see_clip_relative_context() {
    let effects = [Bump::new(true, 1)];
    run(&effects, input());
    assert_eq!(effects[0].seen_relative.load(Ordering::SeqCst), 15);
    assert_eq!(effects[0].seen_len.load(Ordering::SeqCst), 40);
}

#[test]
fn boxed_effects_dispatch() {
    let effects: Vec<Box<dyn VisualEffect>> = vec![Box::new(Bump::new(true, 4))];
    let out = apply_effects(
        input(),
        &effects,
        &ctx(0),
        FrameIndex(0),
        FrameIndex(0),
        Vec2::new(1.0, 1.0),
    );
    assert_eq!(out.pixel(0, 0), Some([4, 0, 0, 255]));
}
