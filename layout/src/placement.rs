//! Placement searches: free-spot spiral scan for insertion and the escape
//! search used by duplicate.

#[cfg(test)]
#[path = "placement_test.rs"]
mod placement_test;

use crate::doc::{Document, Piece};
use crate::geom::Point;
use crate::snap;
use crate::transform::{self, drag_members};
use crate::validate::{Problem, blocking_for_candidates};

/// Find a pose for `template` (layer, size and rotation are kept) whose
/// bounding box lies inside the canvas and overlaps nothing on its layer.
///
/// Positions are scanned in square rings of `step` around the canvas center,
/// each ring row by row, so the result is deterministic. Returns `None` when
/// no position on the scan grid is free.
#[must_use]
pub fn find_free_spot(doc: &Document, template: &Piece, step: f64) -> Option<Piece> {
    if step <= 0.0 {
        return None;
    }
    let canvas = doc.canvas();
    let size = template.bbox();
    let origin = Point::new(canvas.center().x - size.width / 2.0, canvas.center().y - size.height / 2.0);
    #[allow(clippy::cast_possible_truncation)]
    let rings = (canvas.width.max(canvas.height) / 2.0 / step).ceil() as i64 + 1;
    for ring in 0..=rings {
        for j in -ring..=ring {
            for i in -ring..=ring {
                if i.abs().max(j.abs()) != ring {
                    continue;
                }
                #[allow(clippy::cast_precision_loss)]
                let top_left = Point::new(origin.x + i as f64 * step, origin.y + j as f64 * step);
                let mut candidate = template.clone();
                candidate.place_bbox_at(top_left);
                if blocking_for_candidates(doc, std::slice::from_ref(&candidate)).is_empty() {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

/// Outcome of the duplicate escape search.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicatePlan {
    /// Fresh-id copies at their chosen poses, in source order.
    pub copies: Vec<Piece>,
    /// Offset multiple that was used (1-based).
    pub attempt: u32,
    /// BLOCK problems left when every attempt collided; empty on success.
    pub problems: Vec<Problem>,
}

impl DuplicatePlan {
    /// True when the copies had to be placed in collision.
    #[must_use]
    pub fn collided(&self) -> bool {
        !self.problems.is_empty()
    }
}

/// Plan copies of `sources` offset by successive multiples of `offset`.
///
/// Attempt `k` shifts every copy by `k * offset` on both axes. The first
/// attempt where all copies are inside the canvas and clear of every
/// same-layer piece wins. If none does, the copies go at attempt 1 shifted
/// back inside the canvas and the plan carries the remaining problems.
#[must_use]
pub fn duplicate_escape(doc: &Document, sources: &[Piece], offset: f64, attempts: u32) -> DuplicatePlan {
    let copies: Vec<Piece> = sources.iter().map(Piece::duplicate).collect();
    for attempt in 1..=attempts.max(1) {
        let shift = f64::from(attempt) * offset;
        let placed = drag_members(&copies, shift, shift);
        if blocking_for_candidates(doc, &placed).is_empty() {
            return DuplicatePlan { copies: placed, attempt, problems: Vec::new() };
        }
    }
    let placed = drag_members(&copies, offset, offset);
    let placed = match transform::union_bbox(&placed) {
        Some(union) => {
            let clamped = snap::clamp_to_canvas(union, &doc.canvas());
            drag_members(&placed, clamped.min_x - union.min_x, clamped.min_y - union.min_y)
        }
        None => placed,
    };
    let problems = blocking_for_candidates(doc, &placed);
    DuplicatePlan { copies: placed, attempt: 1, problems }
}
