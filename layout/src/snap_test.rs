#![allow(clippy::float_cmp)]

use super::*;

fn canvas() -> BBox {
    BBox::new(0.0, 0.0, 600.0, 600.0)
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// =============================================================
// Feature snap
// =============================================================

#[test]
fn nearest_feature_within_threshold_wins() {
    let hit = snap_value_to_features([97.0, 122.0, 147.0], &[101.0, 150.0], 5.0);
    assert_eq!(hit, Some((3.0, 150.0)));
}

#[test]
fn features_outside_threshold_are_ignored() {
    assert_eq!(snap_value_to_features([0.0, 10.0, 20.0], &[30.0], 5.0), None);
}

#[test]
fn ties_keep_first_feature() {
    let hit = snap_value_to_features([10.0, 10.0, 10.0], &[8.0, 12.0], 5.0);
    assert_eq!(hit, Some((-2.0, 8.0)));
}

#[test]
fn snap_to_pieces_aligns_left_edge_and_records_guide() {
    let sibling = BBox::new(100.0, 300.0, 50.0, 50.0);
    let snapped = snap_to_pieces(BBox::new(103.0, 10.0, 60.0, 60.0), &[sibling], 5.0);
    assert_eq!(snapped.bbox.min_x, 100.0);
    assert_eq!(snapped.bbox.min_y, 10.0);
    assert_eq!(snapped.guides, vec![SnapGuide { axis: GuideAxis::Vertical, position: 100.0 }]);
}

#[test]
fn snap_to_pieces_aligns_centers() {
    let sibling = BBox::new(0.0, 0.0, 100.0, 100.0);
    // Candidate center y = 52, sibling center y = 50.
    let snapped = snap_to_pieces(BBox::new(300.0, 42.0, 20.0, 20.0), &[sibling], 5.0);
    assert_eq!(snapped.bbox.min_y, 40.0);
    assert_eq!(snapped.guides, vec![SnapGuide { axis: GuideAxis::Horizontal, position: 50.0 }]);
}

#[test]
fn snap_edge_returns_matched_feature() {
    assert_eq!(snap_edge(198.0, &[200.0, 250.0], 5.0), Some(200.0));
    assert_eq!(snap_edge(190.0, &[200.0], 5.0), None);
}

// =============================================================
// Grid & canvas
// =============================================================

#[test]
fn grid_rounds_to_nearest_multiple() {
    assert_eq!(round_to_grid(14.0, 10.0), 10.0);
    assert_eq!(round_to_grid(15.0, 10.0), 20.0);
    assert_eq!(round_to_grid(7.3, 0.0), 7.3);
    let b = snap_to_grid(BBox::new(14.0, 26.0, 33.0, 33.0), 10.0);
    assert_eq!(b, BBox::new(10.0, 30.0, 33.0, 33.0));
}

#[test]
fn clamp_shifts_without_resizing() {
    let b = clamp_to_canvas(BBox::new(-5.0, 580.0, 50.0, 50.0), &canvas());
    assert_eq!(b, BBox::new(0.0, 550.0, 50.0, 50.0));
}

#[test]
fn clamp_pins_oversized_box_to_origin() {
    let b = clamp_to_canvas(BBox::new(30.0, 30.0, 700.0, 50.0), &canvas());
    assert_eq!(b.min_x, 0.0);
    assert_eq!(b.width, 700.0);
}

// =============================================================
// Collage & normalization
// =============================================================

#[test]
fn collage_closes_shrinking_small_gap() {
    let neighbor = BBox::new(0.0, 0.0, 50.0, 50.0);
    let previous = BBox::new(51.5, 0.0, 50.0, 50.0);
    let candidate = BBox::new(50.6, 0.0, 50.0, 50.0);
    let out = collage(candidate, &previous, &[neighbor], 1.0);
    assert!(approx_eq(out.min_x, 50.0));
}

#[test]
fn collage_never_grows_or_closes_widening_gap() {
    let neighbor = BBox::new(0.0, 0.0, 50.0, 50.0);
    let previous = BBox::new(50.2, 0.0, 50.0, 50.0);
    let candidate = BBox::new(50.6, 0.0, 50.0, 50.0);
    assert_eq!(collage(candidate, &previous, &[neighbor], 1.0), candidate);
}

#[test]
fn collage_ignores_gaps_at_or_above_threshold() {
    let neighbor = BBox::new(0.0, 0.0, 50.0, 50.0);
    let previous = BBox::new(60.0, 0.0, 50.0, 50.0);
    let candidate = BBox::new(51.0, 0.0, 50.0, 50.0);
    assert_eq!(collage(candidate, &previous, &[neighbor], 1.0), candidate);
}

#[test]
fn collage_works_toward_lower_neighbor_on_y() {
    let neighbor = BBox::new(0.0, 100.0, 50.0, 50.0);
    let previous = BBox::new(0.0, 40.0, 50.0, 50.0);
    let candidate = BBox::new(0.0, 49.5, 50.0, 50.0);
    let out = collage(candidate, &previous, &[neighbor], 1.0);
    assert!(approx_eq(out.max_y(), 100.0));
}

#[test]
fn gap_just_above_target_normalizes() {
    let neighbor = BBox::new(0.0, 0.0, 50.0, 50.0);
    let out = normalize_gaps(BBox::new(52.3, 0.0, 50.0, 50.0), &[neighbor], 2.0, 0.5);
    assert!(approx_eq(out.min_x, 52.0));
    let out = normalize_gaps(BBox::new(52.7, 0.0, 50.0, 50.0), &[neighbor], 2.0, 0.5);
    assert!(approx_eq(out.min_x, 52.7));
}

// =============================================================
// Pipeline
// =============================================================

#[test]
fn pipeline_clamps_after_snapping() {
    let ctx = SnapContext { canvas: canvas(), siblings: &[], neighbors: &[] };
    let snapped = snap_candidate(BBox::new(-30.0, 10.0, 50.0, 50.0), &BBox::new(0.0, 10.0, 50.0, 50.0), &ctx, &SnapSettings::default(), SnapMode::Full);
    assert_eq!(snapped.bbox.min_x, 0.0);
}

#[test]
fn grid_only_mode_skips_piece_snap() {
    let sibling = [BBox::new(100.0, 300.0, 50.0, 50.0)];
    let ctx = SnapContext { canvas: canvas(), siblings: &sibling, neighbors: &[] };
    let bbox = BBox::new(103.0, 10.0, 40.0, 40.0);
    let snapped = snap_candidate(bbox, &bbox, &ctx, &SnapSettings::default(), SnapMode::GridOnly);
    assert_eq!(snapped.bbox.min_x, 103.0);
    assert!(snapped.guides.is_empty());
}

#[test]
fn grid_overrides_piece_snap_and_drops_stale_guide() {
    let sibling = [BBox::new(103.0, 300.0, 50.0, 50.0)];
    let ctx = SnapContext { canvas: canvas(), siblings: &sibling, neighbors: &[] };
    let settings = SnapSettings { grid_snap: true, ..SnapSettings::default() };
    let bbox = BBox::new(101.0, 10.0, 40.0, 40.0);
    let snapped = snap_candidate(bbox, &bbox, &ctx, &settings, SnapMode::Full);
    assert_eq!(snapped.bbox.min_x, 100.0);
    assert!(snapped.guides.is_empty());
}
