use super::*;

#[test]
fn mul_div255_rounds_to_nearest() {
    assert_eq!(mul_div255_u8(255, 255), 255);
    assert_eq!(mul_div255_u8(255, 128), 128);
    assert_eq!(mul_div255_u8(0, 200), 0);
    assert_eq!(mul_div255_u16(128, 128), 64);
}

#[test]
fn unit_scale_clamps() {
    assert_eq!(unit_to_u8_scale(-1.0), 0);
    assert_eq!(unit_to_u8_scale(0.5), 128);
    assert_eq!(unit_to_u8_scale(2.0), 255);
}

#[test]
fn premultiply_zeroes_transparent_pixels() {
    let mut px = vec![200, 100, 50, 0, 255, 255, 255, 128];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(px, vec![0, 0, 0, 0, 128, 128, 128, 128]);
}
