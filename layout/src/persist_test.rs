use serde_json::{Value, json};

use super::*;
use crate::doc::Piece;

fn seeded_json() -> Value {
    serde_json::from_str(&encode(&DraftFile::new(Document::seeded(), true)).unwrap()).unwrap()
}

fn first_piece_mut(value: &mut Value) -> &mut Value {
    let pieces = value["document"]["pieces"].as_object_mut().unwrap();
    pieces.values_mut().next().unwrap()
}

// =============================================================
// Codec
// =============================================================

#[test]
fn encode_then_decode_preserves_draft() {
    let draft = DraftFile::new(Document::seeded(), true);
    let decoded = decode(&encode(&draft).unwrap()).unwrap();
    assert_eq!(decoded, draft);
}

#[test]
fn foreign_version_is_rejected_before_parsing_body() {
    let text = json!({ "version": 7, "document": "not a document" }).to_string();
    match decode(&text) {
        Err(PersistError::UnsupportedVersion { found, expected }) => {
            assert_eq!(found, 7);
            assert_eq!(expected, FORMAT_VERSION);
        }
        other => panic!("expected version error, got {other:?}"),
    }
}

#[test]
fn missing_version_is_invalid() {
    let mut value = seeded_json();
    value.as_object_mut().unwrap().remove("version");
    assert!(matches!(decode(&value.to_string()), Err(PersistError::Invalid(_))));
}

#[test]
fn unknown_field_is_rejected() {
    let mut value = seeded_json();
    value["extra"] = json!(true);
    assert!(matches!(decode(&value.to_string()), Err(PersistError::Json(_))));

    let mut value = seeded_json();
    first_piece_mut(&mut value)["color"] = json!("red");
    assert!(matches!(decode(&value.to_string()), Err(PersistError::Json(_))));
}

#[test]
fn non_quarter_rotation_is_rejected() {
    let mut value = seeded_json();
    first_piece_mut(&mut value)["rotation"] = json!(45);
    assert!(matches!(decode(&value.to_string()), Err(PersistError::Json(_))));
}

#[test]
fn undersized_piece_is_invalid() {
    let mut value = seeded_json();
    first_piece_mut(&mut value)["width"] = json!(2.0);
    let err = decode(&value.to_string()).unwrap_err();
    assert_eq!(err.error_code(), "E_DRAFT_INVALID");
}

#[test]
fn unknown_material_is_invalid() {
    let mut value = seeded_json();
    first_piece_mut(&mut value)["material"] = json!(uuid::Uuid::new_v4());
    assert!(matches!(decode(&value.to_string()), Err(PersistError::Invalid(_))));
}

#[test]
fn unlisted_piece_is_invalid() {
    let mut doc = Document::seeded();
    let layer = doc.layer_order()[0];
    let material = doc.materials().next().unwrap().id;
    let stray = Piece::new(layer, material, 300.0, 300.0, 10.0, 10.0);
    let mut value = serde_json::to_value(DraftFile::new(doc.clone(), false)).unwrap();
    value["document"]["pieces"][stray.id.to_string()] = serde_json::to_value(&stray).unwrap();
    assert!(matches!(decode(&value.to_string()), Err(PersistError::Invalid(_))));
    doc.insert_piece(stray);
    assert!(check_structure(&doc).is_ok());
}

#[test]
fn garbage_is_malformed() {
    let err = decode("{ not json").unwrap_err();
    assert_eq!(err.error_code(), "E_DRAFT_MALFORMED");
    assert!(!err.retryable());
}

// =============================================================
// Stores
// =============================================================

#[test]
fn memory_store_round_trips_text() {
    let store = MemoryDraftStore::new();
    assert_eq!(store.load().unwrap(), None);
    store.save("hello").unwrap();
    assert_eq!(store.load().unwrap().as_deref(), Some("hello"));
    assert_eq!(MemoryDraftStore::with_text("x").contents().as_deref(), Some("x"));
}

#[test]
fn file_store_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileDraftStore::new(dir.path().join("draft.json"));
    assert_eq!(store.load().unwrap(), None);
}

#[test]
fn file_store_saves_and_loads() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileDraftStore::new(dir.path().join("draft.json"));
    let text = encode(&DraftFile::new(Document::seeded(), false)).unwrap();
    store.save(&text).unwrap();
    assert_eq!(store.load().unwrap().as_deref(), Some(text.as_str()));
    assert!(store.path().exists());
}
