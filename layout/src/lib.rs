//! Geometric transform and validation engine for the stacked layout editor.
//!
//! Rectangular material pieces live on three stacked layers inside a bounded
//! canvas. A piece on an upper layer must rest on pieces of the layer directly
//! below it. This crate owns everything between the input layer and the
//! committed document: rotation-aware bounding boxes, collision and bounds
//! validation, snapping, the drag/resize/rotate/scale/duplicate operators, and
//! the history stack. The host is responsible only for wiring pointer and key
//! events to [`editor::Editor`] and for painting what it exposes.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`geom`] | Points, bounding boxes, quarter-turn rotation math |
//! | [`doc`] | Pieces, layers, materials and the document store |
//! | [`selection`] | Selected piece ids and the primary anchor |
//! | [`validate`] | BLOCK/WARN problem detection, never mutates |
//! | [`snap`] | Piece, grid, collage and gap snapping |
//! | [`support`] | Layer support resolver (fast and exact modes) |
//! | [`transform`] | Pure candidate math for every operator |
//! | [`placement`] | Free-spot search and duplicate escape |
//! | [`history`] | Bounded undo/redo of full snapshots |
//! | [`deferred`] | Generation-guarded deferred validation |
//! | [`gesture`] | Gesture state machine and resize handles |
//! | [`persist`] | Versioned JSON draft codec and draft stores |
//! | [`config`] | Typed editor configuration |
//! | [`editor`] | Top-level editor: begin/update/end operators, ghosts |
//! | [`consts`] | Shared numeric constants (size floor, epsilons, grid) |

pub mod config;
pub mod consts;
pub mod deferred;
pub mod doc;
pub mod editor;
pub mod geom;
pub mod gesture;
pub mod history;
pub mod persist;
pub mod placement;
pub mod selection;
pub mod snap;
pub mod support;
pub mod transform;
pub mod validate;
