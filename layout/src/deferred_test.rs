use super::*;
use crate::doc::Material;

fn doc_with_stack() -> (Document, Piece, Piece) {
    let mut doc = Document::with_canonical_layers(600.0, 600.0);
    let material = doc.add_material(Material::new("Birch"));
    let order = doc.layer_order().to_vec();
    let base = Piece::new(order[0], material, 0.0, 0.0, 100.0, 100.0);
    let top = Piece::new(order[1], material, 10.0, 10.0, 50.0, 50.0);
    doc.insert_piece(base.clone());
    doc.insert_piece(top.clone());
    (doc, base, top)
}

#[test]
fn small_pointer_moves_are_coalesced() {
    let mut v = DeferredValidator::new(2.0);
    assert!(v.request(Point::new(0.0, 0.0), Vec::new(), Vec::new()).is_some());
    assert!(v.request(Point::new(1.0, 1.0), Vec::new(), Vec::new()).is_none());
    assert!(v.request(Point::new(3.0, 0.0), Vec::new(), Vec::new()).is_some());
}

#[test]
fn each_request_gets_a_new_generation() {
    let mut v = DeferredValidator::default();
    let a = v.request(Point::new(0.0, 0.0), Vec::new(), Vec::new()).unwrap();
    let b = v.request(Point::new(10.0, 0.0), Vec::new(), Vec::new()).unwrap();
    assert!(b.generation > a.generation);
    assert_eq!(v.generation(), b.generation);
}

#[test]
fn invalidate_makes_results_stale() {
    let (doc, base, _) = doc_with_stack();
    let mut v = DeferredValidator::default();
    let ticket = v.request(Point::new(0.0, 0.0), vec![base.id], vec![base.clone()]).unwrap();
    let result = ticket.evaluate(&SupportResolver::fast(), &doc);
    assert!(v.is_current(&result, &[base.id]));
    v.invalidate();
    assert!(!v.is_current(&result, &[base.id]));
}

#[test]
fn result_for_other_pieces_is_not_current() {
    let (doc, base, top) = doc_with_stack();
    let mut v = DeferredValidator::default();
    let ticket = v.request(Point::new(0.0, 0.0), vec![base.id], vec![base.clone()]).unwrap();
    let result = ticket.evaluate(&SupportResolver::fast(), &doc);
    assert!(!v.is_current(&result, &[top.id]));
}

#[test]
fn evaluate_sees_candidate_support_loss() {
    let (doc, base, top) = doc_with_stack();
    let mut moved = base.clone();
    moved.x = 400.0;
    let ticket = DeferredTicket { generation: 1, piece_ids: vec![base.id], candidates: vec![moved] };
    let result = ticket.evaluate(&SupportResolver::fast(), &doc);
    assert_eq!(result.support, vec![Problem::Unsupported { id: top.id, layer: top.layer }]);
    assert!(result.blocking.is_empty());
}
