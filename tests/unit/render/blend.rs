use super::*;

#[test]
fn over_opacity_0_is_noop() {
    let dst = [1, 2, 3, 4];
    let src = [200, 200, 200, 200];
    assert_eq!(over(dst, src, 0.0), dst);
}

#[test]
fn over_src_alpha_0_is_noop() {
    let dst = [10, 20, 30, 40];
    let src = [255, 255, 255, 0];
    assert_eq!(over(dst, src, 1.0), dst);
}

#[test]
fn over_src_opaque_replaces_dst() {
    let dst = [0, 0, 0, 255];
    let src = [255, 0, 0, 255];
    assert_eq!(over(dst, src, 1.0), src);
}

#[test]
fn over_half_opacity_on_transparent_gives_alpha_128() {
    let out = over([0, 0, 0, 0], [255, 255, 255, 255], 0.5);
    assert_eq!(out[3], 128);
}

#[test]
fn normal_kernel_is_over() {
    let dst = [10, 20, 30, 40];
    let src = [100, 110, 120, 200];
    assert_eq!((BlendMode::Normal.kernel())(dst, src, 0.7), over(dst, src, 0.7));
}

#[test]
fn multiply_of_opaque_white_keeps_dst() {
    let dst = [40, 80, 120, 255];
    let out = (BlendMode::Multiply.kernel())(dst, [255, 255, 255, 255], 1.0);
    assert_eq!(out, dst);
}

#[test]
fn screen_of_opaque_black_keeps_dst() {
    let dst = [40, 80, 120, 255];
    let out = (BlendMode::Screen.kernel())(dst, [0, 0, 0, 255], 1.0);
    assert_eq!(out, dst);
}

#[test]
fn difference_of_identical_colors_is_black() {
    let c = [90, 30, 200, 255];
    assert_eq!((BlendMode::Difference.kernel())(c, c, 1.0), [0, 0, 0, 255]);
}

#[test]
fn blend_modes_over_transparent_dst_reduce_to_source() {
    let src = [120, 60, 30, 255];
    for mode in [
        BlendMode::Multiply,
        BlendMode::Overlay,
        BlendMode::Darken,
        BlendMode::ColorBurn,
        BlendMode::Exclusion,
    ] {
        assert_eq!((mode.kernel())([0, 0, 0, 0], src, 1.0), src, "{mode:?}");
    }
}
