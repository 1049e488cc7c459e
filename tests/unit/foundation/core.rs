use super::*;

#[test]
fn full_canvas_center_is_integer_half() {
    assert_eq!(Canvas::FULL.center(), FaceCenter::new(960, 540));
    assert_eq!(Canvas::new(5, 3).unwrap().center(), FaceCenter::new(2, 1));
}

#[test]
fn zero_canvas_is_rejected() {
    assert!(Canvas::new(0, 10).is_err());
    assert!(Canvas::new(10, 0).is_err());
}

#[test]
fn contains_excludes_far_edges() {
    let c = Canvas::FULL;
    assert!(c.contains(FaceCenter::new(0, 0)));
    assert!(c.contains(FaceCenter::new(1919, 1079)));
    assert!(!c.contains(FaceCenter::new(1920, 0)));
    assert!(!c.contains(FaceCenter::new(-1, 5)));
}

#[test]
fn clamped_limits_to_canvas_range() {
    let p = FaceCenter::new(-40, 5000).clamped(Canvas::FULL);
    assert_eq!(p, FaceCenter::new(0, 1080));
}
