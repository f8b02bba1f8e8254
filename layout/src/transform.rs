//! Pure transform kernels: translate, resize, rigid rotation and isotropic
//! scale of one piece or a group.
//!
//! Nothing here touches a [`Document`](crate::doc::Document). Each function
//! takes the gesture-start poses and returns candidate poses; the editor runs
//! validation on them and decides between commit and rollback.

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

use crate::consts::MIN_SIZE;
use crate::doc::{Piece, PieceId};
use crate::geom::{self, BBox, Point};
use crate::gesture::Handle;
use crate::snap;

/// Slack for floating comparisons against [`MIN_SIZE`].
const FLOOR_SLACK: f64 = 1e-6;

// =============================================================================
// DRAG
// =============================================================================

/// Translate every member by one shared delta.
#[must_use]
pub fn drag_members(pieces: &[Piece], dx: f64, dy: f64) -> Vec<Piece> {
    pieces
        .iter()
        .map(|p| {
            let mut moved = p.clone();
            moved.x += dx;
            moved.y += dy;
            moved
        })
        .collect()
}

/// Union of the members' rotation-aware boxes.
#[must_use]
pub fn union_bbox(pieces: &[Piece]) -> Option<BBox> {
    BBox::union_all(pieces.iter().map(Piece::bbox))
}

// =============================================================================
// ROTATE
// =============================================================================

/// Rigid rotation by `turns` clockwise quarter turns about the group pivot.
///
/// The pivot is the center of the members' union box before rotation. Each
/// member's visual center is rotated about the pivot, its own angle advances
/// by the same delta, and its stored position is re-derived from the new
/// center. A single piece rotates in place.
#[must_use]
pub fn rotate_group(pieces: &[Piece], turns: i32) -> Vec<Piece> {
    let Some(pivot) = union_bbox(pieces).map(|b| b.center()) else {
        return Vec::new();
    };
    pieces
        .iter()
        .map(|p| {
            let center = geom::rotate_about(p.center(), pivot, turns);
            let mut rotated = p.clone();
            rotated.rotation = p.rotation.rotated(turns);
            rotated.place_center_at(center);
            rotated
        })
        .collect()
}

// =============================================================================
// RESIZE
// =============================================================================

/// Which side absorbs a size-floor correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pin {
    /// The low edge (left/top) is fixed; the high edge moves.
    Low,
    /// The high edge (right/bottom) is fixed; the low edge moves.
    High,
    /// Both edges move symmetrically about the center.
    Center,
}

/// Grow `[lo, hi]` to at least `min` wide, keeping the pinned side fixed.
/// If the result would leave `[bound_lo, bound_hi]` the interval is pushed
/// back inside, moving the pinned edge if it has to.
#[must_use]
pub fn enforce_floor(lo: f64, hi: f64, pin: Pin, min: f64, bound_lo: f64, bound_hi: f64) -> (f64, f64) {
    if hi - lo >= min - FLOOR_SLACK {
        return (lo, hi);
    }
    let (mut lo, mut hi) = match pin {
        Pin::Low => (lo, lo + min),
        Pin::High => (hi - min, hi),
        Pin::Center => {
            let mid = (lo + hi) / 2.0;
            (mid - min / 2.0, mid + min / 2.0)
        }
    };
    if lo < bound_lo {
        lo = bound_lo;
        hi = lo + min;
    }
    if hi > bound_hi {
        hi = bound_hi;
        lo = hi - min;
    }
    (lo, hi)
}

/// Inputs for a resize candidate beyond the start pose and pointer delta.
#[derive(Debug, Clone, Copy)]
pub struct ResizeOptions<'a> {
    /// Pin the opposite edge (true) or resize symmetrically about the center.
    pub lock_edge: bool,
    /// Canvas bounds.
    pub canvas: BBox,
    /// Grid pitch when grid snap is on.
    pub grid: Option<f64>,
    /// Sibling x features (left/center/right) for piece snap.
    pub vertical_features: &'a [f64],
    /// Sibling y features (top/middle/bottom) for piece snap.
    pub horizontal_features: &'a [f64],
    /// Piece-snap distance.
    pub threshold: f64,
}

/// One axis of the resize: which edges the handle drives.
struct AxisEdges {
    lo: f64,
    hi: f64,
    moves_lo: bool,
    moves_hi: bool,
}

impl AxisEdges {
    fn active(&self) -> bool {
        self.moves_lo || self.moves_hi
    }

    fn pin(&self, lock_edge: bool) -> Pin {
        if !lock_edge {
            Pin::Center
        } else if self.moves_lo {
            Pin::High
        } else {
            Pin::Low
        }
    }

    fn apply_delta(&mut self, delta: f64, lock_edge: bool) {
        if self.moves_lo {
            self.lo += delta;
            if !lock_edge {
                self.hi -= delta;
            }
        }
        if self.moves_hi {
            self.hi += delta;
            if !lock_edge {
                self.lo -= delta;
            }
        }
    }

    fn floor(&mut self, lock_edge: bool, bound_lo: f64, bound_hi: f64) {
        if !self.active() {
            return;
        }
        (self.lo, self.hi) = enforce_floor(self.lo, self.hi, self.pin(lock_edge), MIN_SIZE, bound_lo, bound_hi);
    }

    fn snap_moving(&mut self, features: &[f64], threshold: f64) {
        if self.moves_lo {
            if let Some(at) = snap::snap_edge(self.lo, features, threshold) {
                self.lo = at;
            }
        }
        if self.moves_hi {
            if let Some(at) = snap::snap_edge(self.hi, features, threshold) {
                self.hi = at;
            }
        }
    }

    fn clamp(&mut self, bound_lo: f64, bound_hi: f64) {
        if self.active() {
            self.lo = self.lo.max(bound_lo);
            self.hi = self.hi.min(bound_hi);
        }
    }

    fn round(&mut self, grid: f64, lock_edge: bool) {
        let both = !lock_edge;
        if self.moves_lo || (both && self.moves_hi) {
            self.lo = snap::round_to_grid(self.lo, grid);
        }
        if self.moves_hi || (both && self.moves_lo) {
            self.hi = snap::round_to_grid(self.hi, grid);
        }
    }
}

/// Resize candidate for `start` dragged by `handle` (in the piece's local
/// frame) with world-space pointer travel `delta`.
///
/// The local handle is mapped through the piece's rotation to the edge it
/// drives on screen, the resize is computed on the bounding box, and the
/// result is mapped back to a stored pose (width and height swap for
/// sideways rotations). The size floor is re-applied after the pointer
/// adjustment, after piece snap, after the canvas clamp and after grid snap.
#[must_use]
pub fn resize_piece(start: &Piece, handle: Handle, delta: Point, opts: &ResizeOptions<'_>) -> Piece {
    let world = handle.rotated(start.rotation);
    let b = start.bbox();
    let c = opts.canvas;
    let mut x = AxisEdges { lo: b.min_x, hi: b.max_x(), moves_lo: world.moves_left(), moves_hi: world.moves_right() };
    let mut y = AxisEdges { lo: b.min_y, hi: b.max_y(), moves_lo: world.moves_top(), moves_hi: world.moves_bottom() };

    x.apply_delta(delta.x, opts.lock_edge);
    y.apply_delta(delta.y, opts.lock_edge);
    x.floor(opts.lock_edge, c.min_x, c.max_x());
    y.floor(opts.lock_edge, c.min_y, c.max_y());

    if opts.lock_edge {
        x.snap_moving(opts.vertical_features, opts.threshold);
        y.snap_moving(opts.horizontal_features, opts.threshold);
        x.floor(true, c.min_x, c.max_x());
        y.floor(true, c.min_y, c.max_y());
    }

    x.clamp(c.min_x, c.max_x());
    y.clamp(c.min_y, c.max_y());
    x.floor(opts.lock_edge, c.min_x, c.max_x());
    y.floor(opts.lock_edge, c.min_y, c.max_y());

    if let Some(grid) = opts.grid {
        x.round(grid, opts.lock_edge);
        y.round(grid, opts.lock_edge);
        x.floor(opts.lock_edge, c.min_x, c.max_x());
        y.floor(opts.lock_edge, c.min_y, c.max_y());
    }

    let bbox = BBox::from_edges(x.lo, y.lo, x.hi, y.hi);
    let (width, height) = if start.rotation.is_sideways() { (bbox.height, bbox.width) } else { (bbox.width, bbox.height) };
    let origin = geom::pose_origin(bbox.top_left(), width, height, start.rotation);
    let mut resized = start.clone();
    resized.x = origin.x;
    resized.y = origin.y;
    resized.width = width;
    resized.height = height;
    resized
}

/// Whether a pose respects the minimum size floor.
#[must_use]
pub fn meets_floor(piece: &Piece) -> bool {
    piece.width >= MIN_SIZE - FLOOR_SLACK && piece.height >= MIN_SIZE - FLOOR_SLACK
}

// =============================================================================
// SCALE
// =============================================================================

/// Admissible isotropic factors for a group about a pivot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleBounds {
    pub min: f64,
    pub max: f64,
}

impl ScaleBounds {
    /// Clamp `factor` into the bounds. Crossed bounds leave the group unscaled.
    #[must_use]
    pub fn clamp(&self, factor: f64) -> f64 {
        if self.min > self.max {
            return 1.0;
        }
        factor.clamp(self.min, self.max)
    }
}

/// Largest factor that keeps `[lo, hi]` inside `[bound_lo, bound_hi]` when
/// scaled about `pivot`.
fn axis_limit(lo: f64, hi: f64, pivot: f64, bound_lo: f64, bound_hi: f64) -> f64 {
    let mut limit = f64::INFINITY;
    if pivot - lo > FLOOR_SLACK {
        limit = limit.min((pivot - bound_lo) / (pivot - lo));
    }
    if hi - pivot > FLOOR_SLACK {
        limit = limit.min((bound_hi - pivot) / (hi - pivot));
    }
    limit
}

/// Scale bounds for `pieces` about `pivot` on `canvas`.
///
/// The upper bound is solved per canvas side from the pivot's distance to it.
/// The lower bound keeps every member's smallest intrinsic side at or above
/// [`MIN_SIZE`].
#[must_use]
pub fn scale_bounds(pieces: &[Piece], pivot: Point, canvas: &BBox) -> ScaleBounds {
    let Some(u) = union_bbox(pieces) else {
        return ScaleBounds { min: 1.0, max: 1.0 };
    };
    let max = axis_limit(u.min_x, u.max_x(), pivot.x, canvas.min_x, canvas.max_x())
        .min(axis_limit(u.min_y, u.max_y(), pivot.y, canvas.min_y, canvas.max_y()));
    let smallest = pieces.iter().map(|p| p.width.min(p.height)).fold(f64::INFINITY, f64::min);
    let min = if smallest > 0.0 { MIN_SIZE / smallest } else { f64::INFINITY };
    ScaleBounds { min, max }
}

/// Round `factor` to a step that changes the group's larger side by whole
/// `quantum` units.
#[must_use]
pub fn quantize_scale(factor: f64, group_max_side: f64, quantum: f64) -> f64 {
    if group_max_side <= 0.0 || quantum <= 0.0 {
        return factor;
    }
    let step = quantum / group_max_side;
    (factor / step).round() * step
}

/// Scale every member about `pivot` by `factor`: centers move radially and
/// intrinsic sizes scale. Rotations are unchanged.
#[must_use]
pub fn scale_group(pieces: &[Piece], pivot: Point, factor: f64) -> Vec<Piece> {
    pieces
        .iter()
        .map(|p| {
            let c = p.center();
            let center = Point::new(pivot.x + (c.x - pivot.x) * factor, pivot.y + (c.y - pivot.y) * factor);
            let mut scaled = p.clone();
            scaled.width = p.width * factor;
            scaled.height = p.height * factor;
            scaled.place_center_at(center);
            scaled
        })
        .collect()
}

/// Per-member affine preview: `p' = p * scale + (translate_x, translate_y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewTransform {
    pub id: PieceId,
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl PreviewTransform {
    /// Where `p` lands under this transform.
    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        Point::new(p.x * self.scale + self.translate_x, p.y * self.scale + self.translate_y)
    }
}

/// Preview transforms for scaling `pieces` about `pivot`, without building
/// candidate poses.
#[must_use]
pub fn scale_preview(pieces: &[Piece], pivot: Point, factor: f64) -> Vec<PreviewTransform> {
    pieces
        .iter()
        .map(|p| PreviewTransform {
            id: p.id,
            scale: factor,
            translate_x: pivot.x * (1.0 - factor),
            translate_y: pivot.y * (1.0 - factor),
        })
        .collect()
}
