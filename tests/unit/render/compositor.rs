use super::*;

fn solid(w: u32, h: u32, px: [u8; 4]) -> SharedImage {
    Arc::new(RasterImage::from_premul_rgba8(w, h, px.repeat((w * h) as usize)).unwrap())
}

fn node(image: SharedImage, transform: Transform) -> RenderNode {
    let size = image.resolution().as_vec2();
    RenderNode::leaf(image, size, transform, BlendMode::Normal)
}

fn covered(surface: &RasterImage) -> (u32, u32, u32, u32) {
    let (mut x0, mut y0, mut x1, mut y1) = (u32::MAX, u32::MAX, 0, 0);
    for y in 0..surface.height {
        for x in 0..surface.width {
            if surface.pixel(x, y).unwrap()[3] != 0 {
                x0 = x0.min(x);
                y0 = y0.min(y);
                x1 = x1.max(x + 1);
                y1 = y1.max(y + 1);
            }
        }
    }
    (x0, y0, x1, y1)
}

struct Fixed(Option<RenderNode>);

#[async_trait]
impl Renderable for Fixed {
    async fn render_node(&self, _ctx: &RenderContext) -> MontageResult<Option<RenderNode>> {
        Ok(self.0.clone())
    }
}

struct Pending;

#[async_trait]
impl Renderable for Pending {
    async fn render_node(&self, _ctx: &RenderContext) -> MontageResult<Option<RenderNode>> {
        std::future::pending::<()>().await;
        Ok(None)
    }
}

fn ctx(res: Resolution) -> RenderContext {
    RenderContext::new(
        FrameIndex(0),
        ProjectInfo::new(".", Fps::default(), res),
        FileAccessors::new(),
    )
}

#[test]
fn unscaled_node_is_centered() {
    let mut surface = RasterImage::transparent(Resolution::new(10, 10)).unwrap();
    paint_node(
        &mut surface,
        &node(solid(4, 2, [255, 0, 0, 255]), Transform::default()),
        Vec2::new(1.0, 1.0),
    );
    assert_eq!(covered(&surface), (3, 4, 7, 6));
}

#[test]
fn scale_two_covers_centered_hundred_square() {
    let mut surface = RasterImage::transparent(Resolution::new(200, 200)).unwrap();
    let t = Transform {
        scale: 2.0,
        ..Transform::default()
    };
    paint_node(
        &mut surface,
        &node(solid(50, 50, [255, 255, 255, 255]), t),
        Vec2::new(1.0, 1.0),
    );
    assert_eq!(covered(&surface), (50, 50, 150, 150));
}

#[test]
fn position_offsets_from_center() {
    let mut surface = RasterImage::transparent(Resolution::new(20, 20)).unwrap();
    let t = Transform {
        position: Vec2::new(5.0, -3.0),
        ..Transform::default()
    };
    paint_node(
        &mut surface,
        &node(solid(2, 2, [0, 0, 255, 255]), t),
        Vec2::new(1.0, 1.0),
    );
    assert_eq!(covered(&surface), (14, 6, 16, 8));
}

#[test]
fn render_scale_applies_to_position_and_size() {
    let mut surface = RasterImage::transparent(Resolution::new(50, 50)).unwrap();
    let t = Transform {
        position: Vec2::new(20.0, 0.0),
        ..Transform::default()
    };
    paint_node(
        &mut surface,
        &node(solid(20, 20, [255, 255, 255, 255]), t),
        Vec2::new(0.5, 0.5),
    );
    // 10x10 drawn, centered at (25 + 10, 25).
    assert_eq!(covered(&surface), (30, 20, 40, 30));
}

#[test]
fn quarter_turn_swaps_extent() {
    let mut surface = RasterImage::transparent(Resolution::new(20, 20)).unwrap();
    let t = Transform {
        rotation: 90.0,
        ..Transform::default()
    };
    paint_node(
        &mut surface,
        &node(solid(8, 2, [255, 255, 255, 255]), t),
        Vec2::new(1.0, 1.0),
    );
    assert_eq!(covered(&surface), (9, 6, 11, 14));
}

#[test]
fn half_alpha_yields_alpha_128() {
    let mut surface = RasterImage::transparent(Resolution::new(4, 4)).unwrap();
    let t = Transform {
        alpha: 0.5,
        ..Transform::default()
    };
    paint_node(
        &mut surface,
        &node(solid(4, 4, [255, 255, 255, 255]), t),
        Vec2::new(1.0, 1.0),
    );
    assert_eq!(surface.pixel(1, 1).unwrap()[3], 128);
}

#[test]
fn children_paint_after_parent_with_their_own_transform() {
    let mut surface = RasterImage::transparent(Resolution::new(10, 10)).unwrap();
    let mut parent = node(
        solid(10, 10, [255, 0, 0, 255]),
        Transform {
            position: Vec2::new(100.0, 100.0),
            ..Transform::default()
        },
    );
    parent.children.push(node(solid(2, 2, [0, 255, 0, 255]), Transform::default()));
    paint_node(&mut surface, &parent, Vec2::new(1.0, 1.0));

    // The parent is off-canvas; the child is not displaced by it.
    assert_eq!(surface.pixel(5, 5), Some([0, 255, 0, 255]));
    assert_eq!(surface.pixel(0, 0), Some([0, 0, 0, 0]));
}

#[test]
fn zero_scale_draws_nothing() {
    let mut surface = RasterImage::transparent(Resolution::new(4, 4)).unwrap();
    let t = Transform {
        scale: 0.0,
        ..Transform::default()
    };
    paint_node(
        &mut surface,
        &node(solid(4, 4, [255, 255, 255, 255]), t),
        Vec2::new(1.0, 1.0),
    );
    assert!(surface.data.iter().all(|b| *b == 0));
}

#[tokio::test]
async fn render_frame_allocates_render_resolution() {
    let c = ctx(Resolution::new(200, 200)).with_render_resolution(Resolution::new(100, 50));
    let out = render_frame(&Fixed(None), &c).await.unwrap();
    assert_eq!((out.width, out.height), (100, 50));
    assert!(out.data.iter().all(|b| *b == 0));
}

#[tokio::test]
async fn render_frame_uses_clear_color() {
    let c = ctx(Resolution::new(2, 2)).with_clear(Rgba8Premul::from_straight_rgba(0, 0, 0, 255));
    let out = render_frame(&Fixed(None), &c).await.unwrap();
    assert_eq!(out.pixel(1, 1), Some([0, 0, 0, 255]));
}

#[tokio::test]
async fn render_frame_rejects_pre_cancelled_token() {
    let c = ctx(Resolution::new(2, 2));
    c.cancel.cancel();
    let err = render_frame(&Fixed(None), &c).await.unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn render_frame_aborts_pending_tree_build_on_cancel() {
    let c = ctx(Resolution::new(2, 2));
    let token = c.cancel.clone();
    let handle = tokio::spawn(async move { render_frame(&Pending, &c).await });
    tokio::task::yield_now().await;
    token.cancel();
    let err = handle.await.unwrap().unwrap_err();
    assert!(err.is_cancelled());
}
