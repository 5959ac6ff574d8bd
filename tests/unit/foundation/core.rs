use super::*;

fn span(start: u64, end: u64) -> FrameSpan {
    FrameSpan::new(FrameIndex(start), FrameIndex(end)).unwrap()
}

#[test]
fn frame_span_contains_is_inclusive() {
    let s = span(10, 100);
    assert!(!s.contains(FrameIndex(9)));
    assert!(s.contains(FrameIndex(10)));
    assert!(s.contains(FrameIndex(55)));
    assert!(s.contains(FrameIndex(100)));
    assert!(!s.contains(FrameIndex(101)));
    assert_eq!(s.len_frames(), 91);
}

#[test]
fn frame_span_rejects_inverted_range() {
    assert!(FrameSpan::new(FrameIndex(5), FrameIndex(4)).is_err());
    assert!(FrameSpan::new(FrameIndex(5), FrameIndex(5)).is_ok());
}

#[test]
fn inverted_literal_span_counts_one_frame() {
    let s = FrameSpan {
        start: FrameIndex(10),
        end: FrameIndex(5),
    };
    assert_eq!(s.len_frames(), 1);
}

#[test]
fn frame_span_overlap_uses_inclusive_bounds() {
    let a = span(50, 100);
    assert!(a.overlaps(span(40, 60)));
    assert!(a.overlaps(span(100, 120)));
    assert!(!a.overlaps(span(0, 49)));
    assert!(!a.overlaps(span(101, 150)));
}

#[test]
fn frame_span_moved_keeps_length() {
    let moved = span(10, 20).moved_to(FrameIndex(40));
    assert_eq!(moved, span(40, 50));
}

#[test]
fn fps_frames_secs_roundtrip_floor() {
    let fps = Fps::new(30000, 1001).unwrap();
    let secs = fps.frames_to_secs(123);
    assert_eq!(fps.secs_to_frames_floor(secs), 123);
}

#[test]
fn resolution_validate_rejects_zero() {
    assert!(Resolution::new(0, 10).validate().is_err());
    assert_eq!(Resolution::new(2, 3).rgba8_len().unwrap(), 24);
}

#[test]
fn premul_from_straight_rounds() {
    let c = Rgba8Premul::from_straight_rgba(255, 128, 0, 128);
    assert_eq!(c.to_array(), [128, 64, 0, 128]);
}
