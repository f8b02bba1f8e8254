//! Snapping engine: piece-feature snap, grid quantization, edge collage and
//! gap normalization over candidate bounding boxes.
//!
//! Every function here is pure and works in AABB space. Callers convert the
//! result back into stored poses (see [`crate::geom::local_position_from_bbox`]).
//! Group gestures run the same pipeline on the group's union box and apply
//! the resulting delta uniformly to every member.
//!
//! Pipeline order for pointer-driven candidates:
//!
//! ```text
//! piece snap → grid → clamp → collage → gap normalization → clamp
//! ```
//!
//! Keyboard nudges use [`SnapMode::GridOnly`], which skips piece snap,
//! collage and normalization.

#[cfg(test)]
#[path = "snap_test.rs"]
mod snap_test;

use crate::consts::{COLLAGE_THRESHOLD, GAP_EPSILON, GAP_TARGET, GRID_SIZE, OVERLAP_EPSILON, SNAP_THRESHOLD};
use crate::geom::{self, Axis, BBox};

// =============================================================================
// TYPES
// =============================================================================

/// Orientation of a snap guide line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideAxis {
    /// A vertical line at some x.
    Vertical,
    /// A horizontal line at some y.
    Horizontal,
}

/// A guide line for the renderer to draw while a snap is active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapGuide {
    pub axis: GuideAxis,
    pub position: f64,
}

/// Tunables for the snapping pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapSettings {
    /// Distance within which an edge or center snaps to a sibling feature.
    pub threshold: f64,
    /// Grid pitch.
    pub grid_size: f64,
    /// Whether grid quantization is enabled.
    pub grid_snap: bool,
    /// Gaps below this (and shrinking) collapse to zero.
    pub collage_threshold: f64,
    /// Canonical neighbor spacing.
    pub gap_target: f64,
    /// Window above `gap_target` that normalizes down to it.
    pub gap_epsilon: f64,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            threshold: SNAP_THRESHOLD,
            grid_size: GRID_SIZE,
            grid_snap: false,
            collage_threshold: COLLAGE_THRESHOLD,
            gap_target: GAP_TARGET,
            gap_epsilon: GAP_EPSILON,
        }
    }
}

/// Which stages of the pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapMode {
    /// Pointer gestures: every stage.
    #[default]
    Full,
    /// Keyboard nudges: grid and clamp only.
    GridOnly,
}

/// The world a candidate is snapped against.
#[derive(Debug, Clone, Copy)]
pub struct SnapContext<'a> {
    /// Canvas bounds.
    pub canvas: BBox,
    /// Boxes whose edges and centers attract the candidate (any layer,
    /// moving set excluded).
    pub siblings: &'a [BBox],
    /// Same-layer boxes the candidate keeps its spacing against (moving set
    /// excluded).
    pub neighbors: &'a [BBox],
}

/// A snapped candidate and the guides that explain it.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapped {
    pub bbox: BBox,
    pub guides: Vec<SnapGuide>,
}

// =============================================================================
// PIECE SNAP
// =============================================================================

/// Nearest feature match for one axis.
///
/// `candidate` holds the moving box's `[min, center, max]` along the axis,
/// `features` the sibling features along the same axis. Returns the delta to
/// apply and the matched feature position, or `None` when nothing is within
/// `threshold`. Ties keep the earliest feature.
#[must_use]
pub fn snap_value_to_features(candidate: [f64; 3], features: &[f64], threshold: f64) -> Option<(f64, f64)> {
    let mut best: Option<(f64, f64)> = None;
    for &feature in features {
        for &value in &candidate {
            let delta = feature - value;
            if delta.abs() > threshold {
                continue;
            }
            if best.is_none_or(|(d, _)| delta.abs() < d.abs()) {
                best = Some((delta, feature));
            }
        }
    }
    best
}

/// Nearest feature within `threshold` for a single edge value.
#[must_use]
pub fn snap_edge(value: f64, features: &[f64], threshold: f64) -> Option<f64> {
    snap_value_to_features([value; 3], features, threshold).map(|(_, f)| f)
}

fn x_features(b: &BBox) -> [f64; 3] {
    [b.min_x, b.center().x, b.max_x()]
}

fn y_features(b: &BBox) -> [f64; 3] {
    [b.min_y, b.center().y, b.max_y()]
}

/// Sibling left, center and right edges, flattened.
#[must_use]
pub fn vertical_features(siblings: &[BBox]) -> Vec<f64> {
    siblings.iter().flat_map(x_features).collect()
}

/// Sibling top, middle and bottom edges, flattened.
#[must_use]
pub fn horizontal_features(siblings: &[BBox]) -> Vec<f64> {
    siblings.iter().flat_map(y_features).collect()
}

/// Snap the candidate's edges and centers to the nearest sibling features,
/// independently per axis, recording one guide per snapped axis.
#[must_use]
pub fn snap_to_pieces(bbox: BBox, siblings: &[BBox], threshold: f64) -> Snapped {
    let mut out = bbox;
    let mut guides = Vec::new();
    if let Some((dx, at)) = snap_value_to_features(x_features(&bbox), &vertical_features(siblings), threshold) {
        out.min_x += dx;
        guides.push(SnapGuide { axis: GuideAxis::Vertical, position: at });
    }
    if let Some((dy, at)) = snap_value_to_features(y_features(&bbox), &horizontal_features(siblings), threshold) {
        out.min_y += dy;
        guides.push(SnapGuide { axis: GuideAxis::Horizontal, position: at });
    }
    Snapped { bbox: out, guides }
}

// =============================================================================
// GRID & CANVAS
// =============================================================================

/// Round `value` to the nearest multiple of `grid`. A non-positive grid is a no-op.
#[must_use]
pub fn round_to_grid(value: f64, grid: f64) -> f64 {
    if grid <= 0.0 {
        return value;
    }
    (value / grid).round() * grid
}

/// Round the box's top-left to the grid, keeping its size.
#[must_use]
pub fn snap_to_grid(bbox: BBox, grid: f64) -> BBox {
    BBox { min_x: round_to_grid(bbox.min_x, grid), min_y: round_to_grid(bbox.min_y, grid), ..bbox }
}

/// Shift the box (never resize it) so it lies inside `canvas`. A box larger
/// than the canvas is pinned to the canvas origin on that axis.
#[must_use]
pub fn clamp_to_canvas(bbox: BBox, canvas: &BBox) -> BBox {
    let clamp = |min: f64, size: f64, lo: f64, hi: f64| -> f64 {
        if size >= hi - lo {
            lo
        } else {
            min.clamp(lo, hi - size)
        }
    };
    BBox {
        min_x: clamp(bbox.min_x, bbox.width, canvas.min_x, canvas.max_x()),
        min_y: clamp(bbox.min_y, bbox.height, canvas.min_y, canvas.max_y()),
        ..bbox
    }
}

// =============================================================================
// SPACING
// =============================================================================

/// Per-axis shift that closes or adjusts a facing gap.
#[derive(Default)]
struct AxisShift {
    x: Option<(f64, f64)>,
    y: Option<(f64, f64)>,
}

impl AxisShift {
    /// Keep the smallest-gap shift per axis.
    fn offer(&mut self, axis: Axis, gap: f64, shift: f64) {
        let slot = match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
        };
        if slot.is_none_or(|(g, _)| gap < g) {
            *slot = Some((gap, shift));
        }
    }

    fn apply(&self, bbox: BBox) -> BBox {
        bbox.translated(self.x.map_or(0.0, |(_, s)| s), self.y.map_or(0.0, |(_, s)| s))
    }
}

/// Signed shift that moves `candidate` toward its neighbor by `amount`.
fn toward(first_is_after: bool, amount: f64) -> f64 {
    if first_is_after { -amount } else { amount }
}

/// Edge collage: collapse a small, shrinking gap to exactly zero.
///
/// A gap to a neighbor is closed only when it is below `threshold` and
/// strictly smaller than the gap the `previous` candidate had to the same
/// neighbor. Gaps are never grown.
#[must_use]
pub fn collage(candidate: BBox, previous: &BBox, neighbors: &[BBox], threshold: f64) -> BBox {
    let mut shift = AxisShift::default();
    for neighbor in neighbors {
        let Some(sep) = geom::separation(&candidate, neighbor) else {
            continue;
        };
        if sep.gap <= OVERLAP_EPSILON || sep.gap >= threshold {
            continue;
        }
        let shrinking = geom::separation(previous, neighbor)
            .is_some_and(|before| before.axis == sep.axis && sep.gap < before.gap - OVERLAP_EPSILON / 2.0);
        if shrinking {
            shift.offer(sep.axis, sep.gap, toward(sep.first_is_after, sep.gap));
        }
    }
    shift.apply(candidate)
}

/// Gap normalization: a gap in `(target, target + epsilon]` becomes exactly `target`.
#[must_use]
pub fn normalize_gaps(candidate: BBox, neighbors: &[BBox], target: f64, epsilon: f64) -> BBox {
    let mut shift = AxisShift::default();
    for neighbor in neighbors {
        let Some(sep) = geom::separation(&candidate, neighbor) else {
            continue;
        };
        if sep.gap > target && sep.gap <= target + epsilon {
            shift.offer(sep.axis, sep.gap, toward(sep.first_is_after, sep.gap - target));
        }
    }
    shift.apply(candidate)
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Run the snapping pipeline on a translated candidate box.
///
/// `previous` is the box of the last candidate (or the gesture start) and is
/// only consulted by the directional collage stage. Guides that no longer
/// line up with the final box (because a later stage moved it) are dropped.
#[must_use]
pub fn snap_candidate(bbox: BBox, previous: &BBox, ctx: &SnapContext<'_>, settings: &SnapSettings, mode: SnapMode) -> Snapped {
    let mut snapped = match mode {
        SnapMode::Full => snap_to_pieces(bbox, ctx.siblings, settings.threshold),
        SnapMode::GridOnly => Snapped { bbox, guides: Vec::new() },
    };
    if settings.grid_snap {
        snapped.bbox = snap_to_grid(snapped.bbox, settings.grid_size);
    }
    snapped.bbox = clamp_to_canvas(snapped.bbox, &ctx.canvas);
    if mode == SnapMode::Full {
        snapped.bbox = collage(snapped.bbox, previous, ctx.neighbors, settings.collage_threshold);
        snapped.bbox = normalize_gaps(snapped.bbox, ctx.neighbors, settings.gap_target, settings.gap_epsilon);
        snapped.bbox = clamp_to_canvas(snapped.bbox, &ctx.canvas);
    }
    let final_box = snapped.bbox;
    snapped.guides.retain(|g| guide_touches(g, &final_box));
    snapped
}

fn guide_touches(guide: &SnapGuide, bbox: &BBox) -> bool {
    let features = match guide.axis {
        GuideAxis::Vertical => x_features(bbox),
        GuideAxis::Horizontal => y_features(bbox),
    };
    features.iter().any(|f| (f - guide.position).abs() <= OVERLAP_EPSILON)
}
