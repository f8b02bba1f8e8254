#![allow(clippy::float_cmp)]

use super::*;
use crate::doc::{LayerId, Material, MaterialId};
use crate::geom::Rotation;

fn setup(width: f64, height: f64) -> (Document, LayerId, MaterialId) {
    let mut doc = Document::with_canonical_layers(width, height);
    let material = doc.add_material(Material::new("Birch"));
    let layer = doc.layer_order()[0];
    (doc, layer, material)
}

// =============================================================
// Free spot
// =============================================================

#[test]
fn empty_canvas_places_at_center() {
    let (doc, layer, material) = setup(600.0, 600.0);
    let template = Piece::new(layer, material, 0.0, 0.0, 100.0, 50.0);
    let placed = find_free_spot(&doc, &template, 10.0).unwrap();
    assert_eq!(placed.bbox().center(), Point::new(300.0, 300.0));
    assert_eq!(placed.id, template.id);
}

#[test]
fn occupied_center_moves_outward() {
    let (mut doc, layer, material) = setup(600.0, 600.0);
    doc.insert_piece(Piece::new(layer, material, 250.0, 250.0, 100.0, 100.0));
    let template = Piece::new(layer, material, 0.0, 0.0, 50.0, 50.0);
    let placed = find_free_spot(&doc, &template, 10.0).unwrap();
    assert!(blocking_for_candidates(&doc, std::slice::from_ref(&placed)).is_empty());
    assert!(doc.canvas().contains_point(placed.bbox().center(), 0.0));
}

#[test]
fn other_layers_do_not_block_placement() {
    let (mut doc, layer, material) = setup(600.0, 600.0);
    let upper = doc.layer_order()[1];
    doc.insert_piece(Piece::new(upper, material, 0.0, 0.0, 600.0, 600.0));
    let template = Piece::new(layer, material, 0.0, 0.0, 50.0, 50.0);
    assert!(find_free_spot(&doc, &template, 10.0).is_some());
}

#[test]
fn full_layer_has_no_free_spot() {
    let (mut doc, layer, material) = setup(100.0, 100.0);
    doc.insert_piece(Piece::new(layer, material, 0.0, 0.0, 100.0, 100.0));
    let template = Piece::new(layer, material, 0.0, 0.0, 20.0, 20.0);
    assert!(find_free_spot(&doc, &template, 10.0).is_none());
}

#[test]
fn rotated_template_uses_rotated_bbox() {
    let (doc, layer, material) = setup(600.0, 600.0);
    let template = Piece::new(layer, material, 0.0, 0.0, 200.0, 20.0).with_rotation(Rotation::Deg90);
    let placed = find_free_spot(&doc, &template, 10.0).unwrap();
    assert_eq!(placed.bbox().width, 20.0);
    assert_eq!(placed.bbox().height, 200.0);
}

// =============================================================
// Duplicate escape
// =============================================================

#[test]
fn first_offset_wins_when_clear() {
    let (mut doc, layer, material) = setup(600.0, 600.0);
    let source = Piece::new(layer, material, 40.0, 40.0, 50.0, 50.0);
    doc.insert_piece(source.clone());
    let plan = duplicate_escape(&doc, &[source.clone()], 60.0, 8);
    assert_eq!(plan.attempt, 1);
    assert!(!plan.collided());
    assert_eq!((plan.copies[0].x, plan.copies[0].y), (100.0, 100.0));
    assert_ne!(plan.copies[0].id, source.id);
}

#[test]
fn collision_retries_next_multiple() {
    let (mut doc, layer, material) = setup(600.0, 600.0);
    let source = Piece::new(layer, material, 0.0, 0.0, 50.0, 50.0);
    doc.insert_piece(source.clone());
    doc.insert_piece(Piece::new(layer, material, 20.0, 20.0, 50.0, 50.0));
    let plan = duplicate_escape(&doc, &[source], 20.0, 8);
    // Offsets 20, 40 and 60 all land inside the blocker at 20..70.
    assert_eq!(plan.attempt, 4);
    assert_eq!(plan.copies[0].x, 80.0);
}

#[test]
fn exhausted_attempts_place_in_collision_inside_canvas() {
    let (mut doc, layer, material) = setup(100.0, 100.0);
    let source = Piece::new(layer, material, 0.0, 0.0, 90.0, 90.0);
    doc.insert_piece(source.clone());
    let plan = duplicate_escape(&doc, &[source], 20.0, 3);
    assert!(plan.collided());
    assert_eq!(plan.attempt, 1);
    assert!(doc.canvas().contains_point(plan.copies[0].bbox().top_left(), 0.0));
    assert_eq!(plan.copies[0].x, 10.0);
}

#[test]
fn group_copies_keep_relative_offsets() {
    let (mut doc, layer, material) = setup(600.0, 600.0);
    let a = Piece::new(layer, material, 0.0, 0.0, 20.0, 20.0);
    let b = Piece::new(layer, material, 20.0, 0.0, 20.0, 20.0);
    doc.insert_piece(a.clone());
    doc.insert_piece(b.clone());
    let plan = duplicate_escape(&doc, &[a, b], 50.0, 8);
    assert_eq!(plan.copies.len(), 2);
    assert_eq!(plan.copies[1].x - plan.copies[0].x, 20.0);
}
