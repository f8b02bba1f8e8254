//! Gesture model: resize handles, modifier keys, and the transient state of
//! an in-progress drag, resize or scale.
//!
//! A [`Gesture`] is held between `begin_*` and `end_*`/`cancel_gesture` on the
//! editor. It carries the gesture-start poses needed to recompute a candidate
//! from scratch on every update and to roll back on cancel. Nothing in here
//! is part of the document.

#[cfg(test)]
#[path = "gesture_test.rs"]
mod gesture_test;

use crate::doc::{Piece, PieceId};
use crate::geom::{BBox, Point, Rotation};
use crate::snap::SnapGuide;
use crate::transform::PreviewTransform;
use crate::validate::Problem;

/// One of the eight resize handles, named by compass direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl Handle {
    /// Every handle, clockwise from north.
    pub const ALL: [Handle; 8] = [Self::N, Self::Ne, Self::E, Self::Se, Self::S, Self::Sw, Self::W, Self::Nw];

    fn index(self) -> usize {
        match self {
            Self::N => 0,
            Self::Ne => 1,
            Self::E => 2,
            Self::Se => 3,
            Self::S => 4,
            Self::Sw => 5,
            Self::W => 6,
            Self::Nw => 7,
        }
    }

    /// The on-screen handle this local handle becomes under `rotation`.
    ///
    /// Each clockwise quarter turn advances two compass steps (N → E).
    #[must_use]
    pub fn rotated(self, rotation: Rotation) -> Handle {
        #[allow(clippy::cast_sign_loss)]
        let turns = rotation.quarter_turns().rem_euclid(4) as usize;
        Self::ALL[(self.index() + turns * 2) % 8]
    }

    #[must_use]
    pub fn moves_left(self) -> bool {
        matches!(self, Self::W | Self::Nw | Self::Sw)
    }

    #[must_use]
    pub fn moves_right(self) -> bool {
        matches!(self, Self::E | Self::Ne | Self::Se)
    }

    #[must_use]
    pub fn moves_top(self) -> bool {
        matches!(self, Self::N | Self::Ne | Self::Nw)
    }

    #[must_use]
    pub fn moves_bottom(self) -> bool {
        matches!(self, Self::S | Self::Se | Self::Sw)
    }

    /// Corner handles drive two edges.
    #[must_use]
    pub fn is_corner(self) -> bool {
        matches!(self, Self::Ne | Self::Se | Self::Sw | Self::Nw)
    }
}

/// Keyboard modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    /// Shift key is held. Selects the fine scale quantum.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held. Inverts lock-edge for one resize.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

/// The gesture currently in progress.
///
/// Each active variant carries the gesture-start context needed to compute
/// candidates and to roll back.
#[derive(Debug, Clone, Default)]
pub enum Gesture {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Moving one or more pieces by a shared delta.
    Dragging {
        /// Poses of the moving set at `begin`, primary first.
        start: Vec<Piece>,
        /// Pointer position at `begin`.
        start_pointer: Point,
        /// Union box of the moving set at `begin`.
        start_bbox: BBox,
        /// Union box of the last candidate, for directional collage.
        last_bbox: BBox,
    },
    /// Dragging one handle of a single piece.
    Resizing {
        /// Pose at `begin`.
        start: Piece,
        /// Handle in the piece's local frame.
        handle: Handle,
        /// Pointer position at `begin`.
        start_pointer: Point,
        /// Resolved lock-edge setting for this gesture.
        lock_edge: bool,
    },
    /// Isotropic scale of the selection about its union center.
    Scaling {
        /// Poses of the scaled set at `begin`.
        start: Vec<Piece>,
        /// Union-box center at `begin`.
        pivot: Point,
        /// Pointer distance from the pivot at `begin`, at least
        /// `SCALE_MIN_START_DISTANCE`.
        start_distance: f64,
        /// Larger side of the union box at `begin`.
        group_max_side: f64,
        /// Latest pointer not yet folded into a preview frame.
        pending: Option<Point>,
        /// Fine quantum requested by the latest pointer event.
        fine: bool,
        /// Last flushed factor.
        factor: f64,
    },
}

impl Gesture {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Dragging { .. } => "drag",
            Self::Resizing { .. } => "resize",
            Self::Scaling { .. } => "scale",
        }
    }

    /// Ids of the pieces this gesture moves.
    #[must_use]
    pub fn piece_ids(&self) -> Vec<PieceId> {
        match self {
            Self::Idle => Vec::new(),
            Self::Dragging { start, .. } | Self::Scaling { start, .. } => start.iter().map(|p| p.id).collect(),
            Self::Resizing { start, .. } => vec![start.id],
        }
    }

    /// Gesture-start poses, for rollback.
    #[must_use]
    pub fn start_poses(&self) -> Vec<Piece> {
        match self {
            Self::Idle => Vec::new(),
            Self::Dragging { start, .. } | Self::Scaling { start, .. } => start.clone(),
            Self::Resizing { start, .. } => vec![start.clone()],
        }
    }
}

/// The live, uncommitted result of the latest gesture update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveCandidate {
    /// Candidate poses of the moving set.
    pub pieces: Vec<Piece>,
    /// Snap guides to draw.
    pub guides: Vec<SnapGuide>,
    /// BLOCK problems the candidate would cause.
    pub problems: Vec<Problem>,
    /// Per-member preview transforms (group scale only).
    pub preview: Vec<PreviewTransform>,
}

impl LiveCandidate {
    /// Whether committing this candidate would succeed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}
