//! The editor: document, selection, history and the transform operators.
//!
//! DESIGN
//! ======
//! Every mutating operation follows one protocol. A candidate is computed
//! from the gesture-start poses, validated against the committed document,
//! and only then written in. The document is never touched while a gesture
//! is in flight; the live candidate is held beside it in [`LiveCandidate`].
//! Cancelling therefore needs no undo logic, and a rejected commit leaves
//! the document exactly as it was before `begin`.
//!
//! A commit pushes one [`Snapshot`] onto the history, bumps the document
//! revision (for geometry changes), and autosaves when a [`DraftStore`] is
//! attached. Rejections push a [`Notice::FlashInvalid`] for the host to show.
//!
//! Ghost workflow
//! --------------
//! `insert_ghost` places a piece even when it is invalid. While the ghost is
//! pending, drags and nudges are folded into the ghost session without
//! history; the ghost itself may be dropped anywhere. The instant the ghost
//! has no BLOCK problems it is auto-committed as a single history entry.
//! Other structural operations wait until the ghost is resolved or cancelled.

#[cfg(test)]
#[path = "editor_test.rs"]
mod editor_test;

use std::collections::HashSet;

use crate::config::EditorConfig;
use crate::consts::{MIN_SIZE, SCALE_MIN_START_DISTANCE};
use crate::deferred::{DeferredResult, DeferredTicket, DeferredValidator};
use crate::doc::{Document, LayerId, MaterialId, Piece, PieceId};
use crate::geom::{BBox, Point, Rotation};
use crate::gesture::{Gesture, Handle, LiveCandidate, Modifiers};
use crate::history::{History, Snapshot};
use crate::persist::{self, DraftFile, DraftStore, PersistError};
use crate::placement;
use crate::selection::Selection;
use crate::snap::{self, SnapContext, SnapMode};
use crate::support::{ExactSupportBackend, SupportResolver};
use crate::transform::{self, ResizeOptions};
use crate::validate::{self, Problem};

// =============================================================================
// ERRORS
// =============================================================================

/// Errors that carry a stable machine-readable code.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("nothing is selected")]
    NoSelection,
    #[error("piece not found: {0}")]
    PieceNotFound(PieceId),
    #[error("layer not found: {0}")]
    LayerNotFound(LayerId),
    #[error("material not found: {0}")]
    MaterialNotFound(MaterialId),
    #[error("a gesture is already in progress")]
    GestureInProgress,
    #[error("no matching gesture in progress")]
    NoGesture,
    #[error("blocked by {} problem(s)", .0.len())]
    Blocked(Vec<Problem>),
    #[error("no free spot for a {width}x{height} piece")]
    NoFreeSpot { width: f64, height: f64 },
    #[error("{width}x{height} is below the minimum size")]
    BelowMinimumSize { width: f64, height: f64 },
    #[error("a ghost piece is still pending")]
    GhostPending,
    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl ErrorCode for EditError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoSelection => "E_NO_SELECTION",
            Self::PieceNotFound(_) => "E_PIECE_NOT_FOUND",
            Self::LayerNotFound(_) => "E_LAYER_NOT_FOUND",
            Self::MaterialNotFound(_) => "E_MATERIAL_NOT_FOUND",
            Self::GestureInProgress => "E_GESTURE_IN_PROGRESS",
            Self::NoGesture => "E_NO_GESTURE",
            Self::Blocked(_) => "E_BLOCKED",
            Self::NoFreeSpot { .. } => "E_NO_FREE_SPOT",
            Self::BelowMinimumSize { .. } => "E_BELOW_MIN_SIZE",
            Self::GhostPending => "E_GHOST_PENDING",
            Self::Persist(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Persist(e) => e.retryable(),
            _ => false,
        }
    }
}

// =============================================================================
// TYPES
// =============================================================================

/// Transient signals for the host UI, drained with [`Editor::drain_notices`].
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Pulse these pieces as invalid.
    FlashInvalid { ids: Vec<PieceId> },
    /// Short-lived message.
    Toast(String),
    /// A pending ghost reached zero BLOCK problems and was committed.
    GhostResolved { id: PieceId },
}

/// Result of a mutating operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The document changed. `problems` lists BLOCK problems that were
    /// accepted anyway (duplicate in collision, a still-invalid ghost).
    Committed { revision: u64, problems: Vec<Problem> },
    /// The candidate was invalid; the document is unchanged.
    Rejected { problems: Vec<Problem> },
    /// The gesture was cancelled; the document is unchanged.
    Cancelled,
    /// Nothing to do.
    Unchanged,
}

impl Outcome {
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Request for a new piece.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPiece {
    pub layer: LayerId,
    pub material: MaterialId,
    pub width: f64,
    pub height: f64,
    pub rotation: Rotation,
    /// Bounding-box top-left. `None` runs the free-spot search.
    pub position: Option<Point>,
}

/// A piece inserted while invalid, awaiting resolution.
#[derive(Debug, Clone)]
pub struct Ghost {
    pub id: PieceId,
    /// BLOCK problems as of the last re-validation.
    pub problems: Vec<Problem>,
    before: Snapshot,
}

// =============================================================================
// EDITOR
// =============================================================================

/// Headless layout editor. All calls are synchronous.
pub struct Editor {
    doc: Document,
    selection: Selection,
    grid_snap: bool,
    history: History,
    config: EditorConfig,
    support: SupportResolver,
    gesture: Gesture,
    live: Option<LiveCandidate>,
    deferred: DeferredValidator,
    pending_ticket: Option<DeferredTicket>,
    deferred_result: Option<DeferredResult>,
    ghost: Option<Ghost>,
    notices: Vec<Notice>,
    store: Option<Box<dyn DraftStore>>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Document::seeded(), EditorConfig::default())
    }
}

impl Editor {
    #[must_use]
    pub fn new(doc: Document, config: EditorConfig) -> Self {
        Self {
            doc,
            selection: Selection::new(),
            grid_snap: config.grid_snap,
            history: History::new(config.history_depth),
            support: SupportResolver::new(config.support_mode, None),
            deferred: DeferredValidator::new(config.deferred_min_move),
            config,
            gesture: Gesture::Idle,
            live: None,
            pending_ticket: None,
            deferred_result: None,
            ghost: None,
            notices: Vec::new(),
            store: None,
        }
    }

    /// Restore the draft in `store`, or seed the default document when there
    /// is none or it cannot be read. The store stays attached for autosave.
    #[must_use]
    pub fn boot(store: Box<dyn DraftStore>, config: EditorConfig) -> Self {
        let restored = match store.load() {
            Ok(Some(text)) => match persist::decode(&text) {
                Ok(draft) => Some(draft),
                Err(e) => {
                    tracing::warn!(error = %e, code = e.error_code(), "discarding unreadable draft");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, code = e.error_code(), "draft store unreadable");
                None
            }
        };
        match restored {
            Some(draft) => {
                tracing::info!(pieces = draft.document.len(), revision = draft.document.revision(), "restored draft");
                let mut editor = Self::new(draft.document, config);
                editor.grid_snap = draft.grid_snap;
                editor.store = Some(store);
                editor
            }
            None => {
                tracing::info!("seeding default document");
                let mut editor = Self::new(Document::seeded(), config);
                editor.store = Some(store);
                editor.autosave();
                editor
            }
        }
    }

    /// Attach a draft store for autosave.
    pub fn attach_store(&mut self, store: Box<dyn DraftStore>) {
        self.store = Some(store);
    }

    /// Attach the exact-support backend used in precise mode.
    pub fn set_support_backend(&mut self, backend: Box<dyn ExactSupportBackend>) {
        self.support.set_backend(backend);
    }

    // --- Queries ---

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub fn grid_snap(&self) -> bool {
        self.grid_snap
    }

    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    #[must_use]
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// The live candidate of the gesture in progress.
    #[must_use]
    pub fn live(&self) -> Option<&LiveCandidate> {
        self.live.as_ref()
    }

    #[must_use]
    pub fn ghost(&self) -> Option<&Ghost> {
        self.ghost.as_ref()
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Every BLOCK and WARN problem in the committed document.
    #[must_use]
    pub fn problems(&self) -> Vec<Problem> {
        validate::validate_document_with(&self.doc, self.config.gap_target, &self.support)
    }

    /// Support advisories for the committed document.
    #[must_use]
    pub fn support_warnings(&self) -> Vec<Problem> {
        self.support.resolve(&self.doc)
    }

    /// Take all pending notices.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Export the current document as a draft.
    ///
    /// # Errors
    ///
    /// Returns `Persist` if encoding fails.
    pub fn export_json(&self) -> Result<String, EditError> {
        Ok(persist::encode(&DraftFile::new(self.doc.clone(), self.grid_snap))?)
    }

    // --- Selection ---

    /// Select exactly one piece.
    ///
    /// # Errors
    ///
    /// `GestureInProgress` mid-gesture, `PieceNotFound` for an unknown id.
    pub fn select(&mut self, id: PieceId) -> Result<(), EditError> {
        self.require_idle()?;
        self.require_piece(&id)?;
        self.selection.select_only(id);
        Ok(())
    }

    /// # Errors
    ///
    /// Same as [`Editor::select`].
    pub fn add_to_selection(&mut self, id: PieceId) -> Result<(), EditError> {
        self.require_idle()?;
        self.require_piece(&id)?;
        self.selection.add(id);
        Ok(())
    }

    /// # Errors
    ///
    /// Same as [`Editor::select`].
    pub fn toggle_selection(&mut self, id: PieceId) -> Result<(), EditError> {
        self.require_idle()?;
        self.require_piece(&id)?;
        self.selection.toggle(id);
        Ok(())
    }

    /// Make a selected piece the group anchor.
    ///
    /// # Errors
    ///
    /// `PieceNotFound` when the piece is not part of the selection.
    pub fn set_primary(&mut self, id: PieceId) -> Result<(), EditError> {
        self.require_idle()?;
        if self.selection.set_primary(id) { Ok(()) } else { Err(EditError::PieceNotFound(id)) }
    }

    /// # Errors
    ///
    /// `GestureInProgress` mid-gesture.
    pub fn clear_selection(&mut self) -> Result<(), EditError> {
        self.require_idle()?;
        self.selection.clear();
        Ok(())
    }

    /// Select every piece on `layer`, returning how many were selected.
    ///
    /// # Errors
    ///
    /// `LayerNotFound` for an unknown layer.
    pub fn select_all_on_layer(&mut self, layer: LayerId) -> Result<usize, EditError> {
        self.require_idle()?;
        if self.doc.layer(&layer).is_none() {
            return Err(EditError::LayerNotFound(layer));
        }
        let ids: Vec<PieceId> = self.doc.pieces_on_layer(layer).map(|p| p.id).collect();
        let count = ids.len();
        self.selection.replace(ids, None);
        Ok(count)
    }

    // --- Drag ---

    /// Start dragging the selection from `pointer`.
    ///
    /// # Errors
    ///
    /// `GestureInProgress`, or `NoSelection` when nothing is selected.
    pub fn begin_drag(&mut self, pointer: Point) -> Result<(), EditError> {
        self.require_idle()?;
        let start = self.selected_pieces()?;
        let start_bbox = transform::union_bbox(&start).ok_or(EditError::NoSelection)?;
        self.start_gesture(Gesture::Dragging { start, start_pointer: pointer, start_bbox, last_bbox: start_bbox });
        Ok(())
    }

    /// Recompute the drag candidate for `pointer`.
    ///
    /// # Errors
    ///
    /// `NoGesture` unless a drag is in progress.
    pub fn update_drag(&mut self, pointer: Point) -> Result<LiveCandidate, EditError> {
        let Gesture::Dragging { start, start_pointer, start_bbox, last_bbox } = &self.gesture else {
            return Err(EditError::NoGesture);
        };
        let moving: Vec<PieceId> = start.iter().map(|p| p.id).collect();
        let (siblings, neighbors) = self.snap_world(&moving);
        let ctx = SnapContext { canvas: self.doc.canvas(), siblings: &siblings, neighbors: &neighbors };
        let raw = start_bbox.translated(pointer.x - start_pointer.x, pointer.y - start_pointer.y);
        let snapped = snap::snap_candidate(raw, last_bbox, &ctx, &self.config.snap_settings(self.grid_snap), SnapMode::Full);
        let pieces = transform::drag_members(start, snapped.bbox.min_x - start_bbox.min_x, snapped.bbox.min_y - start_bbox.min_y);
        let problems = validate::blocking_for_candidates(&self.doc, &pieces);
        if let Gesture::Dragging { last_bbox, .. } = &mut self.gesture {
            *last_bbox = snapped.bbox;
        }
        let live = LiveCandidate { pieces, guides: snapped.guides, problems, preview: Vec::new() };
        Ok(self.publish(pointer, moving, live))
    }

    /// Finish the drag. `commit = false` always rolls back.
    ///
    /// # Errors
    ///
    /// `NoGesture` unless a drag is in progress.
    pub fn end_drag(&mut self, commit: bool) -> Result<Outcome, EditError> {
        if !matches!(self.gesture, Gesture::Dragging { .. }) {
            return Err(EditError::NoGesture);
        }
        let (start, live) = self.finish_gesture();
        if !commit {
            return Ok(Outcome::Cancelled);
        }
        let Some(live) = live else {
            return Ok(Outcome::Unchanged);
        };
        Ok(self.commit_move(&start, live.pieces, "drag"))
    }

    /// Abandon whatever gesture is in progress.
    pub fn cancel_gesture(&mut self) -> Outcome {
        if self.gesture.is_idle() {
            return Outcome::Unchanged;
        }
        tracing::debug!(gesture = self.gesture.name(), "gesture cancelled");
        self.finish_gesture();
        Outcome::Cancelled
    }

    /// Move the selection by `(dx, dy)` in one step. Piece snap, collage and
    /// gap normalization are skipped; grid snap applies when enabled.
    ///
    /// # Errors
    ///
    /// `GestureInProgress` or `NoSelection`.
    pub fn nudge(&mut self, dx: f64, dy: f64) -> Result<Outcome, EditError> {
        self.require_idle()?;
        let start = self.selected_pieces()?;
        let start_bbox = transform::union_bbox(&start).ok_or(EditError::NoSelection)?;
        let ctx = SnapContext { canvas: self.doc.canvas(), siblings: &[], neighbors: &[] };
        let moved = start_bbox.translated(dx, dy);
        let snapped = snap::snap_candidate(moved, &start_bbox, &ctx, &self.config.snap_settings(self.grid_snap), SnapMode::GridOnly);
        let pieces = transform::drag_members(&start, snapped.bbox.min_x - start_bbox.min_x, snapped.bbox.min_y - start_bbox.min_y);
        Ok(self.commit_move(&start, pieces, "nudge"))
    }

    // --- Resize ---

    /// Start resizing one piece by `handle` (in the piece's local frame).
    /// Holding Alt inverts the configured lock-edge mode for this gesture.
    ///
    /// # Errors
    ///
    /// `GestureInProgress`, `GhostPending` or `PieceNotFound`.
    pub fn begin_resize(&mut self, id: PieceId, handle: Handle, pointer: Point, modifiers: Modifiers) -> Result<(), EditError> {
        self.require_idle()?;
        self.require_no_ghost()?;
        let start = self.require_piece(&id)?.clone();
        let lock_edge = self.config.lock_edge != modifiers.alt;
        self.start_gesture(Gesture::Resizing { start, handle, start_pointer: pointer, lock_edge });
        Ok(())
    }

    /// Recompute the resize candidate for `pointer`.
    ///
    /// # Errors
    ///
    /// `NoGesture` unless a resize is in progress.
    pub fn update_resize(&mut self, pointer: Point) -> Result<LiveCandidate, EditError> {
        let Gesture::Resizing { start, handle, start_pointer, lock_edge } = &self.gesture else {
            return Err(EditError::NoGesture);
        };
        let (siblings, _) = self.snap_world(&[start.id]);
        let vertical = snap::vertical_features(&siblings);
        let horizontal = snap::horizontal_features(&siblings);
        let opts = ResizeOptions {
            lock_edge: *lock_edge,
            canvas: self.doc.canvas(),
            grid: self.grid_snap.then_some(self.config.grid_size),
            vertical_features: &vertical,
            horizontal_features: &horizontal,
            threshold: self.config.snap_threshold,
        };
        let delta = pointer.minus(*start_pointer);
        let candidate = transform::resize_piece(start, *handle, delta, &opts);
        let problems = validate::blocking_for_candidates(&self.doc, std::slice::from_ref(&candidate));
        let ids = vec![start.id];
        let live = LiveCandidate { pieces: vec![candidate], guides: Vec::new(), problems, preview: Vec::new() };
        Ok(self.publish(pointer, ids, live))
    }

    /// Finish the resize. A rejected commit also raises a toast.
    ///
    /// # Errors
    ///
    /// `NoGesture` unless a resize is in progress.
    pub fn end_resize(&mut self, commit: bool) -> Result<Outcome, EditError> {
        if !matches!(self.gesture, Gesture::Resizing { .. }) {
            return Err(EditError::NoGesture);
        }
        let (start, live) = self.finish_gesture();
        if !commit {
            return Ok(Outcome::Cancelled);
        }
        let Some(live) = live else {
            return Ok(Outcome::Unchanged);
        };
        let outcome = self.commit_checked(&start, live.pieces, "resize");
        if let Outcome::Rejected { problems } = &outcome {
            self.notices.push(Notice::Toast(format!("Resize blocked: {} conflict(s)", problems.len())));
        }
        Ok(outcome)
    }

    // --- Rotate ---

    /// Rotate the selection by `turns` clockwise quarter turns. A group
    /// rotates rigidly about the center of its union box.
    ///
    /// # Errors
    ///
    /// `GestureInProgress`, `GhostPending` or `NoSelection`.
    pub fn rotate_selection(&mut self, turns: i32) -> Result<Outcome, EditError> {
        self.require_idle()?;
        self.require_no_ghost()?;
        let start = self.selected_pieces()?;
        if turns.rem_euclid(4) == 0 {
            return Ok(Outcome::Unchanged);
        }
        let candidates = transform::rotate_group(&start, turns);
        Ok(self.commit_rotation(&start, candidates, true))
    }

    /// Set every selected piece to an absolute rotation, each about its own
    /// center. Members of the selection may not end up overlapping each other.
    ///
    /// # Errors
    ///
    /// `GestureInProgress`, `GhostPending` or `NoSelection`.
    pub fn set_rotation(&mut self, rotation: Rotation) -> Result<Outcome, EditError> {
        self.require_idle()?;
        self.require_no_ghost()?;
        let start = self.selected_pieces()?;
        let candidates: Vec<Piece> = start
            .iter()
            .flat_map(|p| transform::rotate_group(std::slice::from_ref(p), p.rotation.turns_to(rotation)))
            .collect();
        Ok(self.commit_rotation(&start, candidates, false))
    }

    /// Rotations are validated on a scratch copy of the document with the
    /// new poses applied. A non-rigid rotation also checks the candidates
    /// against each other.
    fn commit_rotation(&mut self, start: &[Piece], candidates: Vec<Piece>, rigid: bool) -> Outcome {
        if same_poses(start, &candidates) {
            return Outcome::Unchanged;
        }
        let mut scratch = self.doc.clone();
        for c in &candidates {
            scratch.apply_pose(c);
        }
        let ids: Vec<PieceId> = candidates.iter().map(|p| p.id).collect();
        let mut problems = validate::blocking_for(&scratch, &ids);
        if !rigid {
            problems.extend(validate::overlaps_within(&candidates));
        }
        if !problems.is_empty() {
            return self.reject(ids, problems, "rotate");
        }
        let before = self.snapshot();
        self.doc = scratch;
        let revision = self.commit(before, "rotate", true);
        Outcome::Committed { revision, problems: Vec::new() }
    }

    // --- Scale ---

    /// Start an isotropic scale of the selection about its union center.
    ///
    /// # Errors
    ///
    /// `GestureInProgress`, `GhostPending` or `NoSelection`.
    pub fn begin_scale(&mut self, pointer: Point, modifiers: Modifiers) -> Result<(), EditError> {
        self.require_idle()?;
        self.require_no_ghost()?;
        let start = self.selected_pieces()?;
        let union = transform::union_bbox(&start).ok_or(EditError::NoSelection)?;
        let pivot = union.center();
        self.start_gesture(Gesture::Scaling {
            start,
            pivot,
            start_distance: pointer.distance_to(pivot).max(SCALE_MIN_START_DISTANCE),
            group_max_side: union.width.max(union.height),
            pending: None,
            fine: modifiers.shift,
            factor: 1.0,
        });
        Ok(())
    }

    /// Record the latest pointer. The preview is recomputed on the next
    /// [`Editor::flush_frame`]; intermediate pointers are dropped.
    ///
    /// # Errors
    ///
    /// `NoGesture` unless a scale is in progress.
    pub fn update_scale(&mut self, pointer: Point, modifiers: Modifiers) -> Result<(), EditError> {
        let Gesture::Scaling { pending, fine, .. } = &mut self.gesture else {
            return Err(EditError::NoGesture);
        };
        *pending = Some(pointer);
        *fine = modifiers.shift;
        Ok(())
    }

    /// Fold the latest scale pointer into a new preview. Call once per
    /// rendered frame. Returns `None` when there is nothing new.
    pub fn flush_frame(&mut self) -> Option<LiveCandidate> {
        let Gesture::Scaling { start, pivot, start_distance, group_max_side, pending, fine, factor } = &mut self.gesture else {
            return None;
        };
        let pointer = pending.take()?;
        let start: &[Piece] = start.as_slice();
        let quantum = if *fine { self.config.scale_quantum_fine } else { self.config.scale_quantum };
        let raw = pointer.distance_to(*pivot) / *start_distance;
        let quantized = transform::quantize_scale(raw, *group_max_side, quantum);
        let bounds = transform::scale_bounds(start, *pivot, &self.doc.canvas());
        *factor = bounds.clamp(quantized);
        let pieces = transform::scale_group(start, *pivot, *factor);
        let preview = transform::scale_preview(start, *pivot, *factor);
        let ids: Vec<PieceId> = start.iter().map(|p| p.id).collect();
        let problems = validate::blocking_for_candidates(&self.doc, &pieces);
        let live = LiveCandidate { pieces, guides: Vec::new(), problems, preview };
        Some(self.publish(pointer, ids, live))
    }

    /// Finish the scale, flushing any pending pointer first.
    ///
    /// # Errors
    ///
    /// `NoGesture` unless a scale is in progress.
    pub fn end_scale(&mut self, commit: bool) -> Result<Outcome, EditError> {
        if !matches!(self.gesture, Gesture::Scaling { .. }) {
            return Err(EditError::NoGesture);
        }
        if commit {
            self.flush_frame();
        }
        let (start, live) = self.finish_gesture();
        if !commit {
            return Ok(Outcome::Cancelled);
        }
        let Some(live) = live else {
            return Ok(Outcome::Unchanged);
        };
        Ok(self.commit_checked(&start, live.pieces, "scale"))
    }

    // --- Structural operations ---

    /// Duplicate the selection with the offset escape search. The copies
    /// become the selection. If every offset collides the copies are still
    /// committed and the outcome carries their problems.
    ///
    /// # Errors
    ///
    /// `GestureInProgress`, `GhostPending` or `NoSelection`.
    pub fn duplicate_selection(&mut self) -> Result<Outcome, EditError> {
        self.require_idle()?;
        self.require_no_ghost()?;
        let sources = self.selected_pieces()?;
        let plan = placement::duplicate_escape(&self.doc, &sources, self.config.duplicate_offset, self.config.duplicate_attempts);
        let before = self.snapshot();
        let ids: Vec<PieceId> = plan.copies.iter().map(|p| p.id).collect();
        for copy in plan.copies {
            self.doc.insert_piece(copy);
        }
        self.selection.replace(ids.clone(), ids.first().copied());
        if plan.problems.is_empty() {
            tracing::debug!(copies = ids.len(), attempt = plan.attempt, "duplicated");
        } else {
            tracing::warn!(copies = ids.len(), problems = plan.problems.len(), "duplicate placed in collision");
            self.notices.push(Notice::FlashInvalid { ids });
        }
        let revision = self.commit(before, "duplicate", true);
        Ok(Outcome::Committed { revision, problems: plan.problems })
    }

    /// Insert a piece at an explicit position or, without one, at the first
    /// free spot. The new piece becomes the selection.
    ///
    /// # Errors
    ///
    /// `LayerNotFound`, `MaterialNotFound`, `BelowMinimumSize`, `Blocked`
    /// for an invalid explicit position, `NoFreeSpot` when the search fails.
    pub fn insert_piece(&mut self, new: NewPiece) -> Result<PieceId, EditError> {
        self.require_idle()?;
        self.require_no_ghost()?;
        let mut piece = self.template(&new)?;
        if let Some(position) = new.position {
            piece.place_bbox_at(position);
            let problems = validate::blocking_for_candidates(&self.doc, std::slice::from_ref(&piece));
            if !problems.is_empty() {
                return Err(EditError::Blocked(problems));
            }
        } else {
            piece = placement::find_free_spot(&self.doc, &piece, self.config.placement_step)
                .ok_or(EditError::NoFreeSpot { width: new.width, height: new.height })?;
        }
        let before = self.snapshot();
        let id = piece.id;
        self.doc.insert_piece(piece);
        self.selection.select_only(id);
        self.commit(before, "insert", true);
        Ok(id)
    }

    /// Insert a piece even if it is invalid. Without a position the free-spot
    /// search is tried first, then the canvas origin. A valid ghost commits
    /// immediately.
    ///
    /// # Errors
    ///
    /// `GhostPending` if another ghost exists, plus the lookup and size
    /// errors of [`Editor::insert_piece`].
    pub fn insert_ghost(&mut self, new: NewPiece) -> Result<PieceId, EditError> {
        self.require_idle()?;
        self.require_no_ghost()?;
        let mut piece = self.template(&new)?;
        match new.position {
            Some(position) => piece.place_bbox_at(position),
            None => match placement::find_free_spot(&self.doc, &piece, self.config.placement_step) {
                Some(found) => piece = found,
                None => piece.place_bbox_at(Point::default()),
            },
        }
        let before = self.snapshot();
        let id = piece.id;
        self.doc.insert_piece(piece);
        self.selection.select_only(id);
        let revision = self.doc.bump_revision();
        self.ghost = Some(Ghost { id, problems: Vec::new(), before });
        tracing::debug!(piece = %id, revision, "ghost inserted");
        self.settle_ghost(revision);
        Ok(id)
    }

    /// Remove the pending ghost and roll back every move made while it was
    /// pending. No history entry is recorded.
    ///
    /// # Errors
    ///
    /// `GestureInProgress` mid-gesture.
    pub fn cancel_ghost(&mut self) -> Result<Outcome, EditError> {
        self.require_idle()?;
        Ok(self.drop_ghost())
    }

    /// Delete every selected piece.
    ///
    /// # Errors
    ///
    /// `GestureInProgress`, `GhostPending` or `NoSelection`.
    pub fn delete_selected(&mut self) -> Result<Outcome, EditError> {
        self.require_idle()?;
        self.require_no_ghost()?;
        if self.selection.is_empty() {
            return Err(EditError::NoSelection);
        }
        let before = self.snapshot();
        for id in self.selection.ids().to_vec() {
            self.doc.remove_piece(&id);
        }
        self.selection.clear();
        let revision = self.commit(before, "delete", true);
        Ok(Outcome::Committed { revision, problems: Vec::new() })
    }

    /// Mark the selection as joined (exempt from spacing advisories) or not.
    ///
    /// # Errors
    ///
    /// `GestureInProgress`, `GhostPending` or `NoSelection`.
    pub fn set_joined(&mut self, joined: bool) -> Result<Outcome, EditError> {
        self.require_idle()?;
        self.require_no_ghost()?;
        let ids = self.selected_pieces()?.into_iter().filter(|p| p.joined != joined).map(|p| p.id).collect::<Vec<_>>();
        if ids.is_empty() {
            return Ok(Outcome::Unchanged);
        }
        let before = self.snapshot();
        for id in &ids {
            if let Some(piece) = self.doc.piece_mut(id) {
                piece.joined = joined;
            }
        }
        let revision = self.commit(before, "join", false);
        Ok(Outcome::Committed { revision, problems: Vec::new() })
    }

    /// Toggle grid snapping. Recorded in history like any other mutation.
    ///
    /// # Errors
    ///
    /// `GestureInProgress` or `GhostPending`.
    pub fn set_grid_snap(&mut self, on: bool) -> Result<Outcome, EditError> {
        self.require_idle()?;
        self.require_no_ghost()?;
        if self.grid_snap == on {
            return Ok(Outcome::Unchanged);
        }
        let before = self.snapshot();
        self.grid_snap = on;
        let revision = self.commit(before, "grid", false);
        Ok(Outcome::Committed { revision, problems: Vec::new() })
    }

    // --- History & import ---

    /// Step back one committed mutation. With a ghost pending, only the
    /// ghost is cancelled.
    ///
    /// # Errors
    ///
    /// `GestureInProgress` mid-gesture.
    pub fn undo(&mut self) -> Result<Outcome, EditError> {
        self.require_idle()?;
        if self.ghost.is_some() {
            return Ok(self.drop_ghost());
        }
        let current = self.snapshot();
        let Some(previous) = self.history.undo(current) else {
            return Ok(Outcome::Unchanged);
        };
        Ok(self.restore(previous, "undo"))
    }

    /// Re-apply one undone mutation. With a ghost pending, only the ghost
    /// is cancelled.
    ///
    /// # Errors
    ///
    /// `GestureInProgress` mid-gesture.
    pub fn redo(&mut self) -> Result<Outcome, EditError> {
        self.require_idle()?;
        if self.ghost.is_some() {
            return Ok(self.drop_ghost());
        }
        let current = self.snapshot();
        let Some(next) = self.history.redo(current) else {
            return Ok(Outcome::Unchanged);
        };
        Ok(self.restore(next, "redo"))
    }

    /// Replace the document with a draft. One history entry; the current
    /// document is untouched if the draft is rejected.
    ///
    /// # Errors
    ///
    /// `GestureInProgress`, or `Persist` when the draft does not decode.
    pub fn import_json(&mut self, text: &str) -> Result<Outcome, EditError> {
        self.require_idle()?;
        let draft = match persist::decode(text) {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!(error = %e, code = e.error_code(), "import rejected");
                return Err(e.into());
            }
        };
        self.drop_ghost();
        let before = self.snapshot();
        let floor = self.doc.revision();
        self.doc = draft.document;
        self.grid_snap = draft.grid_snap;
        self.selection.clear();
        self.doc.advance_revision_past(floor);
        let revision = self.commit(before, "import", false);
        tracing::info!(pieces = self.doc.len(), revision, "draft imported");
        Ok(Outcome::Committed { revision, problems: Vec::new() })
    }

    // --- Deferred validation ---

    /// Take the most recent deferred validation request, if any.
    pub fn take_deferred_ticket(&mut self) -> Option<DeferredTicket> {
        self.pending_ticket.take()
    }

    /// Evaluate a ticket against this editor's document and resolver.
    #[must_use]
    pub fn evaluate_ticket(&self, ticket: &DeferredTicket) -> DeferredResult {
        ticket.evaluate(&self.support, &self.doc)
    }

    /// Apply a deferred result if it still belongs to the live gesture.
    /// Returns false when it was stale and dropped.
    pub fn apply_deferred(&mut self, result: DeferredResult) -> bool {
        if self.gesture.is_idle() || !self.deferred.is_current(&result, &self.gesture.piece_ids()) {
            tracing::debug!(generation = result.generation, "stale deferred result dropped");
            return false;
        }
        self.deferred_result = Some(result);
        true
    }

    /// The latest applied deferred result for the live gesture.
    #[must_use]
    pub fn deferred_result(&self) -> Option<&DeferredResult> {
        self.deferred_result.as_ref()
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn require_idle(&self) -> Result<(), EditError> {
        if self.gesture.is_idle() { Ok(()) } else { Err(EditError::GestureInProgress) }
    }

    fn require_no_ghost(&self) -> Result<(), EditError> {
        if self.ghost.is_some() { Err(EditError::GhostPending) } else { Ok(()) }
    }

    fn require_piece(&self, id: &PieceId) -> Result<&Piece, EditError> {
        self.doc.piece(id).ok_or(EditError::PieceNotFound(*id))
    }

    /// Selected pieces, primary first.
    fn selected_pieces(&self) -> Result<Vec<Piece>, EditError> {
        let primary = self.selection.primary().ok_or(EditError::NoSelection)?;
        let mut ids = vec![primary];
        ids.extend(self.selection.ids().iter().copied().filter(|id| *id != primary));
        ids.iter().map(|id| self.require_piece(id).cloned()).collect()
    }

    /// Boxes that attract a moving set (every other piece) and boxes it keeps
    /// its spacing against (other pieces on the moving set's layers).
    fn snap_world(&self, moving: &[PieceId]) -> (Vec<BBox>, Vec<BBox>) {
        let moving_set: HashSet<&PieceId> = moving.iter().collect();
        let layers: HashSet<LayerId> = moving.iter().filter_map(|id| self.doc.piece(id)).map(|p| p.layer).collect();
        let mut siblings = Vec::new();
        let mut neighbors = Vec::new();
        for piece in self.doc.pieces().filter(|p| !moving_set.contains(&p.id)) {
            let bbox = piece.bbox();
            siblings.push(bbox);
            if layers.contains(&piece.layer) {
                neighbors.push(bbox);
            }
        }
        (siblings, neighbors)
    }

    fn template(&self, new: &NewPiece) -> Result<Piece, EditError> {
        if self.doc.layer(&new.layer).is_none() {
            return Err(EditError::LayerNotFound(new.layer));
        }
        if self.doc.material(&new.material).is_none() {
            return Err(EditError::MaterialNotFound(new.material));
        }
        if new.width < MIN_SIZE || new.height < MIN_SIZE {
            return Err(EditError::BelowMinimumSize { width: new.width, height: new.height });
        }
        Ok(Piece::new(new.layer, new.material, 0.0, 0.0, new.width, new.height).with_rotation(new.rotation))
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot { document: self.doc.clone(), selection: self.selection.clone(), grid_snap: self.grid_snap }
    }

    fn start_gesture(&mut self, gesture: Gesture) {
        tracing::debug!(gesture = gesture.name(), pieces = gesture.piece_ids().len(), "gesture started");
        self.gesture = gesture;
        self.live = None;
        self.pending_ticket = None;
        self.deferred_result = None;
        self.deferred.invalidate();
    }

    /// Reset to idle, returning the start poses and the last live candidate.
    fn finish_gesture(&mut self) -> (Vec<Piece>, Option<LiveCandidate>) {
        let gesture = std::mem::take(&mut self.gesture);
        self.pending_ticket = None;
        self.deferred_result = None;
        self.deferred.invalidate();
        (gesture.start_poses(), self.live.take())
    }

    /// Store the live candidate and request a deferred pass if the pointer
    /// moved far enough.
    fn publish(&mut self, pointer: Point, ids: Vec<PieceId>, live: LiveCandidate) -> LiveCandidate {
        if let Some(ticket) = self.deferred.request(pointer, ids, live.pieces.clone()) {
            self.pending_ticket = Some(ticket);
        }
        self.live = Some(live.clone());
        live
    }

    /// Commit a translation of `start` to `candidates`, honouring a pending
    /// ghost session.
    fn commit_move(&mut self, start: &[Piece], candidates: Vec<Piece>, op: &'static str) -> Outcome {
        if same_poses(start, &candidates) {
            return Outcome::Unchanged;
        }
        let Some(ghost_id) = self.ghost.as_ref().map(|g| g.id) else {
            return self.commit_checked(start, candidates, op);
        };
        let ids: Vec<PieceId> = candidates.iter().map(|p| p.id).collect();
        let problems = validate::blocking_for_candidates(&self.doc, &candidates);
        if !ids.contains(&ghost_id) && !problems.is_empty() {
            return self.reject(ids, problems, op);
        }
        for c in &candidates {
            self.doc.apply_pose(c);
        }
        let revision = self.doc.bump_revision();
        tracing::debug!(op, revision, "ghost session move");
        self.settle_ghost(revision)
    }

    /// Validate and commit candidate poses for pieces that already exist.
    fn commit_checked(&mut self, start: &[Piece], candidates: Vec<Piece>, op: &'static str) -> Outcome {
        if same_poses(start, &candidates) {
            return Outcome::Unchanged;
        }
        let ids: Vec<PieceId> = candidates.iter().map(|p| p.id).collect();
        let mut problems = validate::blocking_for_candidates(&self.doc, &candidates);
        if let Some(small) = candidates.iter().find(|p| !transform::meets_floor(p)) {
            tracing::debug!(op, piece = %small.id, width = small.width, height = small.height, "below minimum size");
            problems.push(Problem::BelowMinimumSize { id: small.id });
        }
        if !problems.is_empty() {
            return self.reject(ids, problems, op);
        }
        let before = self.snapshot();
        for c in &candidates {
            self.doc.apply_pose(c);
        }
        let revision = self.commit(before, op, true);
        Outcome::Committed { revision, problems: Vec::new() }
    }

    fn reject(&mut self, ids: Vec<PieceId>, problems: Vec<Problem>, op: &'static str) -> Outcome {
        tracing::debug!(op, problems = problems.len(), "candidate rejected");
        self.notices.push(Notice::FlashInvalid { ids });
        Outcome::Rejected { problems }
    }

    /// Push history, bump the revision (geometry changes only) and autosave.
    fn commit(&mut self, before: Snapshot, op: &'static str, geometry: bool) -> u64 {
        let revision = if geometry { self.doc.bump_revision() } else { self.doc.revision() };
        self.history.push(before);
        tracing::debug!(op, revision, selected = self.selection.len(), "committed");
        self.autosave();
        revision
    }

    fn restore(&mut self, snapshot: Snapshot, op: &'static str) -> Outcome {
        let revision = self.swap_in(snapshot);
        tracing::debug!(op, revision, "restored snapshot");
        self.autosave();
        Outcome::Committed { revision, problems: Vec::new() }
    }

    /// Replace document, selection and grid flag, keeping the revision
    /// counter monotonic.
    fn swap_in(&mut self, snapshot: Snapshot) -> u64 {
        let floor = self.doc.revision();
        self.doc = snapshot.document;
        self.selection = snapshot.selection;
        self.selection.retain(|id| self.doc.contains(id));
        self.grid_snap = snapshot.grid_snap;
        self.doc.advance_revision_past(floor)
    }

    /// Re-validate the pending ghost and auto-commit it once it is clean.
    fn settle_ghost(&mut self, revision: u64) -> Outcome {
        let Some(ghost) = self.ghost.as_mut() else {
            return Outcome::Committed { revision, problems: Vec::new() };
        };
        let problems = validate::blocking_for(&self.doc, &[ghost.id]);
        if !problems.is_empty() {
            ghost.problems.clone_from(&problems);
            return Outcome::Committed { revision, problems };
        }
        if let Some(resolved) = self.ghost.take() {
            tracing::info!(piece = %resolved.id, revision, "ghost resolved");
            self.history.push(resolved.before);
            self.notices.push(Notice::GhostResolved { id: resolved.id });
            self.autosave();
        }
        Outcome::Committed { revision, problems: Vec::new() }
    }

    fn drop_ghost(&mut self) -> Outcome {
        let Some(ghost) = self.ghost.take() else {
            return Outcome::Unchanged;
        };
        let revision = self.swap_in(ghost.before);
        tracing::debug!(piece = %ghost.id, revision, "ghost cancelled");
        self.autosave();
        Outcome::Cancelled
    }

    fn autosave(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let saved = persist::encode(&DraftFile::new(self.doc.clone(), self.grid_snap)).and_then(|text| store.save(&text));
        if let Err(e) = saved {
            tracing::warn!(error = %e, code = e.error_code(), "autosave failed");
        }
    }
}

/// Whether `candidates` leave every piece of `start` where it was.
fn same_poses(start: &[Piece], candidates: &[Piece]) -> bool {
    start.len() == candidates.len() && start.iter().zip(candidates).all(|(a, b)| a == b)
}
