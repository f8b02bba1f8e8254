#![allow(clippy::float_cmp)]

use uuid::Uuid;

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn bbox_approx_eq(a: BBox, b: BBox) -> bool {
    approx_eq(a.min_x, b.min_x) && approx_eq(a.min_y, b.min_y) && approx_eq(a.width, b.width) && approx_eq(a.height, b.height)
}

fn piece(x: f64, y: f64, w: f64, h: f64, rotation: Rotation) -> Piece {
    Piece::new(Uuid::new_v4(), Uuid::new_v4(), x, y, w, h).with_rotation(rotation)
}

// =============================================================
// Rotation
// =============================================================

#[test]
fn rotation_default_is_zero() {
    assert_eq!(Rotation::default(), Rotation::Deg0);
}

#[test]
fn rotation_wraps_both_directions() {
    assert_eq!(Rotation::Deg270.rotated(1), Rotation::Deg0);
    assert_eq!(Rotation::Deg0.rotated(-1), Rotation::Deg270);
    assert_eq!(Rotation::Deg90.rotated(6), Rotation::Deg270);
}

#[test]
fn rotation_turns_to_is_clockwise_distance() {
    assert_eq!(Rotation::Deg90.turns_to(Rotation::Deg0), 3);
    assert_eq!(Rotation::Deg0.turns_to(Rotation::Deg90), 1);
    assert_eq!(Rotation::Deg180.turns_to(Rotation::Deg180), 0);
}

#[test]
fn rotation_try_from_rejects_off_quarter_angles() {
    assert_eq!(Rotation::try_from(90), Ok(Rotation::Deg90));
    assert_eq!(Rotation::try_from(45), Err(InvalidRotation(45)));
    assert_eq!(Rotation::try_from(360), Err(InvalidRotation(360)));
}

#[test]
fn rotation_serializes_as_degrees() {
    let json = serde_json::to_string(&Rotation::Deg270).unwrap();
    assert_eq!(json, "270");
    let back: Rotation = serde_json::from_str("180").unwrap();
    assert_eq!(back, Rotation::Deg180);
    assert!(serde_json::from_str::<Rotation>("30").is_err());
}

// =============================================================
// Bounding boxes
// =============================================================

#[test]
fn bbox_unrotated_equals_intrinsic_rect() {
    let p = piece(40.0, 40.0, 120.0, 80.0, Rotation::Deg0);
    assert_eq!(bounding_box(&p), BBox::new(40.0, 40.0, 120.0, 80.0));
}

#[test]
fn bbox_half_turn_is_unchanged() {
    let p = piece(40.0, 40.0, 120.0, 80.0, Rotation::Deg180);
    assert_eq!(bounding_box(&p), BBox::new(40.0, 40.0, 120.0, 80.0));
}

#[test]
fn bbox_quarter_turn_swaps_size_around_center() {
    let p = piece(40.0, 40.0, 120.0, 80.0, Rotation::Deg90);
    let b = bounding_box(&p);
    assert!(bbox_approx_eq(b, BBox::new(60.0, 20.0, 80.0, 120.0)));
    assert_eq!(b.center(), p.center());
    let q = piece(40.0, 40.0, 120.0, 80.0, Rotation::Deg270);
    assert!(bbox_approx_eq(bounding_box(&q), b));
}

#[test]
fn local_position_inverts_bbox_for_every_rotation() {
    for rotation in [Rotation::Deg0, Rotation::Deg90, Rotation::Deg180, Rotation::Deg270] {
        let p = piece(13.5, 27.25, 64.0, 18.0, rotation);
        let b = bounding_box(&p);
        let back = local_position_from_bbox(b.top_left(), &p);
        assert!(approx_eq(back.x, p.x), "{rotation:?}");
        assert!(approx_eq(back.y, p.y), "{rotation:?}");
    }
}

#[test]
fn four_quarter_turns_restore_pose() {
    let mut p = piece(40.0, 40.0, 120.0, 80.0, Rotation::Deg0);
    let start = p.clone();
    for _ in 0..4 {
        p.rotation = p.rotation.rotated(1);
    }
    assert_eq!(p, start);
}

#[test]
fn bbox_union_all_empty_is_none() {
    assert!(BBox::union_all(Vec::new()).is_none());
}

#[test]
fn bbox_union_all_spans_inputs() {
    let u = BBox::union_all([BBox::new(0.0, 0.0, 10.0, 10.0), BBox::new(20.0, 5.0, 5.0, 30.0)]).unwrap();
    assert_eq!(u, BBox::new(0.0, 0.0, 25.0, 35.0));
}

// =============================================================
// Point rotation
// =============================================================

#[test]
fn rotate_about_quarter_turn_is_clockwise_in_screen_space() {
    let p = rotate_about(Point::new(10.0, 0.0), Point::new(0.0, 0.0), 1);
    assert_eq!(p, Point::new(0.0, 10.0));
}

#[test]
fn rotate_about_preserves_pivot_distance() {
    let pivot = Point::new(50.0, 50.0);
    let p = Point::new(80.0, 65.0);
    for turns in -4..=4 {
        let r = rotate_about(p, pivot, turns);
        assert!(approx_eq(r.distance_to(pivot), p.distance_to(pivot)));
    }
}

#[test]
fn rotate_about_full_cycle_is_identity() {
    let pivot = Point::new(3.5, 7.25);
    let mut p = Point::new(-12.0, 40.0);
    for _ in 0..4 {
        p = rotate_about(p, pivot, 1);
    }
    assert_eq!(p, Point::new(-12.0, 40.0));
}

// =============================================================
// Overlap and containment
// =============================================================

#[test]
fn touching_edges_do_not_overlap() {
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BBox::new(10.0, 0.0, 10.0, 10.0);
    assert!(!overlaps(&a, &b));
}

#[test]
fn sub_epsilon_intrusion_does_not_overlap() {
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BBox::new(9.995, 0.0, 10.0, 10.0);
    assert!(!overlaps(&a, &b));
}

#[test]
fn real_intrusion_overlaps() {
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BBox::new(9.5, 9.5, 10.0, 10.0);
    assert!(overlaps(&a, &b));
    assert!(overlaps(&b, &a));
}

#[test]
fn contains_allows_epsilon_slack() {
    let outer = BBox::new(0.0, 0.0, 100.0, 100.0);
    assert!(contains(&outer, &BBox::new(0.0, 0.0, 100.0, 100.0), 0.0));
    assert!(contains(&outer, &BBox::new(-0.005, 0.0, 50.0, 50.0), 0.01));
    assert!(!contains(&outer, &BBox::new(-1.0, 0.0, 50.0, 50.0), 0.01));
}

// =============================================================
// Separation
// =============================================================

#[test]
fn separation_horizontal_gap() {
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BBox::new(13.0, 5.0, 10.0, 10.0);
    let sep = separation(&a, &b).unwrap();
    assert_eq!(sep.axis, Axis::X);
    assert!(approx_eq(sep.gap, 3.0));
    assert!(!sep.first_is_after);
    assert!(separation(&b, &a).unwrap().first_is_after);
}

#[test]
fn separation_vertical_touching_is_zero_gap() {
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BBox::new(2.0, 10.0, 4.0, 4.0);
    let sep = separation(&a, &b).unwrap();
    assert_eq!(sep.axis, Axis::Y);
    assert!(approx_eq(sep.gap, 0.0));
}

#[test]
fn separation_diagonal_or_overlapping_is_none() {
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    assert!(separation(&a, &BBox::new(20.0, 20.0, 5.0, 5.0)).is_none());
    assert!(separation(&a, &BBox::new(5.0, 5.0, 10.0, 10.0)).is_none());
}
