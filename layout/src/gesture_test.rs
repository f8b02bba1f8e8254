use uuid::Uuid;

use super::*;

// =============================================================
// Handle
// =============================================================

#[test]
fn unrotated_handle_is_unchanged() {
    for h in Handle::ALL {
        assert_eq!(h.rotated(Rotation::Deg0), h);
    }
}

#[test]
fn quarter_turn_maps_north_to_east() {
    assert_eq!(Handle::N.rotated(Rotation::Deg90), Handle::E);
    assert_eq!(Handle::E.rotated(Rotation::Deg90), Handle::S);
    assert_eq!(Handle::S.rotated(Rotation::Deg90), Handle::W);
    assert_eq!(Handle::W.rotated(Rotation::Deg90), Handle::N);
    assert_eq!(Handle::Nw.rotated(Rotation::Deg90), Handle::Ne);
}

#[test]
fn half_turn_maps_to_opposite() {
    assert_eq!(Handle::N.rotated(Rotation::Deg180), Handle::S);
    assert_eq!(Handle::Se.rotated(Rotation::Deg180), Handle::Nw);
    assert_eq!(Handle::E.rotated(Rotation::Deg270), Handle::N);
}

#[test]
fn corner_handles_drive_two_edges() {
    for h in Handle::ALL {
        let edges = [h.moves_left(), h.moves_right(), h.moves_top(), h.moves_bottom()]
            .iter()
            .filter(|m| **m)
            .count();
        assert_eq!(edges, if h.is_corner() { 2 } else { 1 }, "{h:?}");
    }
}

// =============================================================
// Gesture
// =============================================================

fn piece() -> Piece {
    Piece::new(Uuid::new_v4(), Uuid::new_v4(), 0.0, 0.0, 10.0, 10.0)
}

#[test]
fn idle_gesture_has_no_pieces() {
    let g = Gesture::default();
    assert!(g.is_idle());
    assert_eq!(g.name(), "idle");
    assert!(g.piece_ids().is_empty());
}

#[test]
fn resizing_reports_its_piece() {
    let p = piece();
    let g = Gesture::Resizing { start: p.clone(), handle: Handle::E, start_pointer: Point::default(), lock_edge: true };
    assert_eq!(g.piece_ids(), vec![p.id]);
    assert_eq!(g.start_poses(), vec![p]);
    assert_eq!(g.name(), "resize");
}

#[test]
fn dragging_keeps_member_order() {
    let (a, b) = (piece(), piece());
    let g = Gesture::Dragging {
        start: vec![a.clone(), b.clone()],
        start_pointer: Point::default(),
        start_bbox: BBox::default(),
        last_bbox: BBox::default(),
    };
    assert_eq!(g.piece_ids(), vec![a.id, b.id]);
}

#[test]
fn empty_candidate_is_valid() {
    assert!(LiveCandidate::default().is_valid());
}
