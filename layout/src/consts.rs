//! Shared numeric constants for the layout crate.

// ── Geometry ────────────────────────────────────────────────────

/// Smallest width or height any committed piece may have, in mm.
pub const MIN_SIZE: f64 = 5.0;

/// Overlap slack in mm. Edges closer than this count as touching, not overlapping.
pub const OVERLAP_EPSILON: f64 = 0.01;

/// Tolerance used when comparing stored poses after round-trip transforms.
pub const POSE_TOLERANCE: f64 = 0.1;

// ── Snapping ────────────────────────────────────────────────────

/// Default distance within which an edge or center snaps to a sibling feature.
pub const SNAP_THRESHOLD: f64 = 5.0;

/// Default grid pitch.
pub const GRID_SIZE: f64 = 10.0;

/// Gaps below this (and shrinking) are collapsed to zero.
pub const COLLAGE_THRESHOLD: f64 = 1.0;

/// Canonical spacing between neighboring pieces.
pub const GAP_TARGET: f64 = 2.0;

/// Window above [`GAP_TARGET`] that normalizes down to exactly the target.
pub const GAP_EPSILON: f64 = 0.5;

// ── Operators ───────────────────────────────────────────────────

/// Default offset applied to each duplicate attempt.
pub const DUPLICATE_OFFSET: f64 = 20.0;

/// How many offset multiples the duplicate escape search tries.
pub const DUPLICATE_ATTEMPTS: u32 = 8;

/// Group-scale quantum in mm along the group's larger side.
pub const SCALE_QUANTUM: f64 = 5.0;

/// Group-scale quantum with the fine modifier held.
pub const SCALE_QUANTUM_FINE: f64 = 1.0;

/// Pointer distances below this at scale start are treated as this value.
pub const SCALE_MIN_START_DISTANCE: f64 = 1.0;

/// Minimum cursor travel before another deferred validation is requested.
pub const DEFERRED_MIN_MOVE: f64 = 2.0;

/// Step of the free-spot spiral scan.
pub const PLACEMENT_STEP: f64 = 10.0;

// ── Document ────────────────────────────────────────────────────

/// Default undo depth.
pub const HISTORY_DEPTH: usize = 50;

/// Canonical canvas width for a seeded document.
pub const DEFAULT_CANVAS_WIDTH: f64 = 600.0;

/// Canonical canvas height for a seeded document.
pub const DEFAULT_CANVAS_HEIGHT: f64 = 600.0;

/// Side length of the seeded default piece.
pub const DEFAULT_PIECE_SIZE: f64 = 100.0;

/// Top-left of the seeded default piece.
pub const DEFAULT_PIECE_ORIGIN: f64 = 20.0;
