//! Document model: pieces, layers, materials, and the in-memory scene.
//!
//! This module defines the data that describes what is on the canvas
//! (`Piece`, `Layer`, `Material`) and the `Document` that owns all of it.
//! Pieces are stored by id; iteration order is always "document order":
//! layers bottom to top, then each layer's member list. Layer membership is
//! kept in sync with each piece's immutable `layer` field by `insert_piece`
//! and `remove_piece`; nothing else touches it.
//!
//! The support relation between layers (layer N+1 rests on layer N) is
//! resolved from `layer_order`, a list of stable layer ids, never from z-index
//! sorting.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::{
    DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH, DEFAULT_PIECE_ORIGIN, DEFAULT_PIECE_SIZE,
};
use crate::geom::{self, BBox, Point, Rotation};

/// Unique identifier for a piece.
pub type PieceId = Uuid;

/// Unique identifier for a layer.
pub type LayerId = Uuid;

/// Unique identifier for a material.
pub type MaterialId = Uuid;

/// Shape discriminator. Only axis-aligned rectangles exist for now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    #[default]
    Rect,
}

fn unit_scale() -> f64 {
    1.0
}

/// A rectangular material piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Piece {
    /// Unique identifier for this piece.
    pub id: PieceId,
    /// Layer the piece lives on. Set at creation, never reassigned.
    pub layer: LayerId,
    /// Material the piece is cut from.
    pub material: MaterialId,
    /// Left edge of the unrotated intrinsic rectangle.
    pub x: f64,
    /// Top edge of the unrotated intrinsic rectangle.
    pub y: f64,
    /// Intrinsic width.
    pub width: f64,
    /// Intrinsic height.
    pub height: f64,
    /// Clockwise rotation about the visual center.
    #[serde(default)]
    pub rotation: Rotation,
    /// Uniform scale. Reserved; always 1 today.
    #[serde(default = "unit_scale")]
    pub scale: f64,
    /// Shape kind.
    #[serde(default)]
    pub kind: PieceKind,
    /// Joined pieces are exempt from minimum-spacing advisories.
    #[serde(default)]
    pub joined: bool,
}

impl Piece {
    /// Create an unrotated rectangle with a fresh id.
    #[must_use]
    pub fn new(layer: LayerId, material: MaterialId, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            layer,
            material,
            x,
            y,
            width,
            height,
            rotation: Rotation::Deg0,
            scale: 1.0,
            kind: PieceKind::Rect,
            joined: false,
        }
    }

    /// Builder-style rotation setter.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Rotation-aware bounding box.
    #[must_use]
    pub fn bbox(&self) -> BBox {
        geom::bounding_box(self)
    }

    /// Visual center (invariant under solo rotation).
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Move the piece so its bounding box top-left lands on `top_left`.
    pub fn place_bbox_at(&mut self, top_left: Point) {
        let origin = geom::local_position_from_bbox(top_left, self);
        self.x = origin.x;
        self.y = origin.y;
    }

    /// Move the piece so its visual center lands on `center`.
    pub fn place_center_at(&mut self, center: Point) {
        self.x = center.x - self.width / 2.0;
        self.y = center.y - self.height / 2.0;
    }

    /// A copy of this piece with a fresh id.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self { id: Uuid::new_v4(), ..self.clone() }
    }
}

/// A material pieces can be cut from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    /// Oriented materials (grain, print direction) prefer a rotation congruent
    /// to `orientation_deg` modulo 180°.
    #[serde(default)]
    pub oriented: bool,
    #[serde(default)]
    pub orientation_deg: f64,
}

impl Material {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(), name: name.into(), oriented: false, orientation_deg: 0.0 }
    }

    #[must_use]
    pub fn oriented(name: impl Into<String>, orientation_deg: f64) -> Self {
        Self { id: Uuid::new_v4(), name: name.into(), oriented: true, orientation_deg }
    }
}

/// A stacking layer and its ordered member list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub z_index: i64,
    /// Member pieces in insertion order.
    pub pieces: Vec<PieceId>,
}

/// The mutable scene document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document {
    /// Canvas width in mm.
    pub canvas_width: f64,
    /// Canvas height in mm.
    pub canvas_height: f64,
    materials: BTreeMap<MaterialId, Material>,
    layers: BTreeMap<LayerId, Layer>,
    pieces: BTreeMap<PieceId, Piece>,
    /// Layer ids bottom to top. Layer `i + 1` rests on layer `i`.
    layer_order: Vec<LayerId>,
    /// Bumped on every committed geometry mutation.
    revision: u64,
}

impl Document {
    /// Create an empty document with no layers.
    #[must_use]
    pub fn new(canvas_width: f64, canvas_height: f64) -> Self {
        Self {
            canvas_width,
            canvas_height,
            materials: BTreeMap::new(),
            layers: BTreeMap::new(),
            pieces: BTreeMap::new(),
            layer_order: Vec::new(),
            revision: 0,
        }
    }

    /// Create a document with the canonical three stacked layers.
    #[must_use]
    pub fn with_canonical_layers(canvas_width: f64, canvas_height: f64) -> Self {
        let mut doc = Self::new(canvas_width, canvas_height);
        for name in ["Layer 1", "Layer 2", "Layer 3"] {
            doc.add_layer(name);
        }
        doc
    }

    /// The canonical default document: three layers, one material, and one
    /// default-sized piece on the bottom layer.
    #[must_use]
    pub fn seeded() -> Self {
        let mut doc = Self::with_canonical_layers(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT);
        let material = doc.add_material(Material::new("Plywood"));
        let base = doc.layer_order[0];
        doc.insert_piece(Piece::new(
            base,
            material,
            DEFAULT_PIECE_ORIGIN,
            DEFAULT_PIECE_ORIGIN,
            DEFAULT_PIECE_SIZE,
            DEFAULT_PIECE_SIZE,
        ));
        doc
    }

    /// The canvas as a box anchored at the origin.
    #[must_use]
    pub fn canvas(&self) -> BBox {
        BBox::new(0.0, 0.0, self.canvas_width, self.canvas_height)
    }

    // --- Materials ---

    /// Register a material, returning its id.
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = material.id;
        self.materials.insert(id, material);
        id
    }

    #[must_use]
    pub fn material(&self, id: &MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.materials.values()
    }

    // --- Layers ---

    /// Append a new top layer, returning its id.
    pub fn add_layer(&mut self, name: impl Into<String>) -> LayerId {
        let id = Uuid::new_v4();
        #[allow(clippy::cast_possible_wrap)]
        let z_index = self.layer_order.len() as i64;
        self.layers.insert(id, Layer { id, name: name.into(), z_index, pieces: Vec::new() });
        self.layer_order.push(id);
        id
    }

    #[must_use]
    pub fn layer(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.get(id)
    }

    /// Layer ids bottom to top.
    #[must_use]
    pub fn layer_order(&self) -> &[LayerId] {
        &self.layer_order
    }

    /// Layers bottom to top.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layer_order.iter().filter_map(move |id| self.layers.get(id))
    }

    /// Number of layers in the layer map.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Zero-based position of a layer in the stack.
    #[must_use]
    pub fn layer_index(&self, id: &LayerId) -> Option<usize> {
        self.layer_order.iter().position(|l| l == id)
    }

    /// The layer that supports `id`, or `None` for the bottom layer.
    #[must_use]
    pub fn layer_below(&self, id: &LayerId) -> Option<LayerId> {
        let index = self.layer_index(id)?;
        index.checked_sub(1).map(|below| self.layer_order[below])
    }

    /// Layer id at a zero-based stack position.
    #[must_use]
    pub fn layer_at(&self, index: usize) -> Option<LayerId> {
        self.layer_order.get(index).copied()
    }

    // --- Pieces ---

    /// Insert or replace a piece. Returns false if its layer doesn't exist.
    pub fn insert_piece(&mut self, piece: Piece) -> bool {
        let Some(layer) = self.layers.get_mut(&piece.layer) else {
            return false;
        };
        if !layer.pieces.contains(&piece.id) {
            layer.pieces.push(piece.id);
        }
        self.pieces.insert(piece.id, piece);
        true
    }

    /// Remove a piece by id, returning it if it was present.
    pub fn remove_piece(&mut self, id: &PieceId) -> Option<Piece> {
        let piece = self.pieces.remove(id)?;
        if let Some(layer) = self.layers.get_mut(&piece.layer) {
            layer.pieces.retain(|p| p != id);
        }
        Some(piece)
    }

    #[must_use]
    pub fn piece(&self, id: &PieceId) -> Option<&Piece> {
        self.pieces.get(id)
    }

    /// Mutable access for pose edits. Layer reassignment is not supported;
    /// callers must leave `layer` untouched.
    pub fn piece_mut(&mut self, id: &PieceId) -> Option<&mut Piece> {
        self.pieces.get_mut(id)
    }

    /// Replace the pose of an existing piece with `updated`'s geometry.
    /// Identity, layer and material are kept. Returns false if absent.
    pub fn apply_pose(&mut self, updated: &Piece) -> bool {
        let Some(piece) = self.pieces.get_mut(&updated.id) else {
            return false;
        };
        piece.x = updated.x;
        piece.y = updated.y;
        piece.width = updated.width;
        piece.height = updated.height;
        piece.rotation = updated.rotation;
        true
    }

    /// All pieces in document order (bottom layer first, then member order).
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.layers()
            .flat_map(move |layer| layer.pieces.iter().filter_map(move |id| self.pieces.get(id)))
    }

    /// Pieces on one layer in member order.
    pub fn pieces_on_layer(&self, layer: LayerId) -> impl Iterator<Item = &Piece> {
        self.layers
            .get(&layer)
            .into_iter()
            .flat_map(move |l| l.pieces.iter().filter_map(move |id| self.pieces.get(id)))
    }

    /// Whether a piece id exists.
    #[must_use]
    pub fn contains(&self, id: &PieceId) -> bool {
        self.pieces.contains_key(id)
    }

    /// Number of pieces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// Returns `true` if the document contains no pieces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Ids of every stored piece, including any not listed by a layer.
    pub fn piece_ids(&self) -> impl Iterator<Item = &PieceId> {
        self.pieces.keys()
    }

    // --- Revision ---

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Advance the revision counter after a committed geometry mutation.
    pub fn bump_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    /// Advance the revision past both its own value and `floor`. Used when a
    /// restored snapshot replaces a document whose counter ran further.
    pub fn advance_revision_past(&mut self, floor: u64) -> u64 {
        self.revision = self.revision.max(floor) + 1;
        self.revision
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::with_canonical_layers(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT)
    }
}
