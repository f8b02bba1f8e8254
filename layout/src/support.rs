//! Layer support resolver.
//!
//! A piece on layer N (N > 1) is supported when it is fully covered by the
//! union of the pieces on layer N−1. The bottom layer is always supported.
//! Results are WARN-only: they never block a commit and never roll back a
//! transform.
//!
//! Two modes exist. Fast mode tests coverage of the piece's bounding box by
//! the union of supporting bounding boxes with coordinate compression, which
//! is exact for axis-aligned rectangles. Precise mode hands polygons to an
//! external [`ExactSupportBackend`]; when no backend is attached, or the
//! backend fails, the resolver falls back to fast mode and logs a warning.

#[cfg(test)]
#[path = "support_test.rs"]
mod support_test;

use std::collections::HashMap;
use std::fmt;

use crate::consts::OVERLAP_EPSILON;
use crate::doc::{Document, Piece, PieceId};
use crate::geom::{BBox, Point};
use crate::validate::Problem;

/// Closed polygon as an ordered vertex list.
pub type Polygon = Vec<Point>;

/// Which support computation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupportMode {
    #[default]
    Fast,
    Precise,
}

/// Failure reported by an exact-support backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("exact support backend unavailable")]
    Unavailable,
    #[error("exact support backend failed: {0}")]
    Failed(String),
}

/// Boolean-polygon collaborator used in precise mode.
pub trait ExactSupportBackend {
    /// Whether `inner` lies entirely within the union of `supports`.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` when the backend runtime is missing, or `Failed`
    /// when the computation itself errors.
    fn covers(&self, supports: &[Polygon], inner: &Polygon) -> Result<bool, BackendError>;
}

/// Computes support advisories for a document.
pub struct SupportResolver {
    mode: SupportMode,
    backend: Option<Box<dyn ExactSupportBackend>>,
}

impl fmt::Debug for SupportResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupportResolver")
            .field("mode", &self.mode)
            .field("backend", &self.backend.is_some())
            .finish()
    }
}

impl Default for SupportResolver {
    fn default() -> Self {
        Self::fast()
    }
}

impl SupportResolver {
    /// Fast (bounding-box union) resolver with no backend.
    #[must_use]
    pub fn fast() -> Self {
        Self { mode: SupportMode::Fast, backend: None }
    }

    /// Resolver in `mode` with an optional exact backend.
    #[must_use]
    pub fn new(mode: SupportMode, backend: Option<Box<dyn ExactSupportBackend>>) -> Self {
        Self { mode, backend }
    }

    #[must_use]
    pub fn mode(&self) -> SupportMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SupportMode) {
        self.mode = mode;
    }

    /// Attach (or replace) the exact backend.
    pub fn set_backend(&mut self, backend: Box<dyn ExactSupportBackend>) {
        self.backend = Some(backend);
    }

    /// Whether `piece` is supported by the layer below it in `doc`.
    #[must_use]
    pub fn is_supported(&self, doc: &Document, piece: &Piece) -> bool {
        self.is_supported_with(doc, piece, &HashMap::new())
    }

    /// Support check where `overrides` replace the stored pose of supporting pieces.
    fn is_supported_with(&self, doc: &Document, piece: &Piece, overrides: &HashMap<PieceId, &Piece>) -> bool {
        let Some(below) = doc.layer_below(&piece.layer) else {
            return true;
        };
        let supports: Vec<BBox> = doc
            .pieces_on_layer(below)
            .map(|p| overrides.get(&p.id).map_or_else(|| p.bbox(), |o| o.bbox()))
            .collect();
        let inner = piece.bbox();
        if self.mode == SupportMode::Precise {
            if let Some(backend) = &self.backend {
                let polygons: Vec<Polygon> = supports.iter().map(bbox_polygon).collect();
                match backend.covers(&polygons, &bbox_polygon(&inner)) {
                    Ok(covered) => return covered,
                    Err(e) => {
                        tracing::warn!(error = %e, piece = %piece.id, "exact support failed, falling back to fast mode");
                    }
                }
            } else {
                tracing::warn!(piece = %piece.id, "no exact support backend, falling back to fast mode");
            }
        }
        covered_by_union(&inner, &supports, OVERLAP_EPSILON)
    }

    /// Support warnings for every upper-layer piece in `doc`.
    #[must_use]
    pub fn resolve(&self, doc: &Document) -> Vec<Problem> {
        self.resolve_with(doc, &[])
    }

    /// Support warnings for `doc` as it would be with `candidates` applied.
    #[must_use]
    pub fn resolve_with(&self, doc: &Document, candidates: &[Piece]) -> Vec<Problem> {
        let overrides: HashMap<PieceId, &Piece> = candidates.iter().map(|p| (p.id, p)).collect();
        doc.pieces()
            .map(|p| overrides.get(&p.id).copied().unwrap_or(p))
            .filter(|p| !self.is_supported_with(doc, p, &overrides))
            .map(|p| Problem::Unsupported { id: p.id, layer: p.layer })
            .collect()
    }
}

/// The four corners of a box, clockwise from top-left.
#[must_use]
pub fn bbox_polygon(b: &BBox) -> Polygon {
    vec![
        Point::new(b.min_x, b.min_y),
        Point::new(b.max_x(), b.min_y),
        Point::new(b.max_x(), b.max_y()),
        Point::new(b.min_x, b.max_y()),
    ]
}

/// Whether `inner` is fully covered by the union of `supports`.
///
/// Compresses coordinates to the support edges that fall inside `inner` and
/// requires every resulting cell's midpoint to lie in some support box.
#[must_use]
pub fn covered_by_union(inner: &BBox, supports: &[BBox], eps: f64) -> bool {
    let relevant: Vec<&BBox> = supports
        .iter()
        .filter(|s| s.max_x() > inner.min_x + eps && s.min_x < inner.max_x() - eps)
        .filter(|s| s.max_y() > inner.min_y + eps && s.min_y < inner.max_y() - eps)
        .collect();
    if relevant.is_empty() {
        return false;
    }
    let xs = cut_points(inner.min_x, inner.max_x(), relevant.iter().flat_map(|s| [s.min_x, s.max_x()]), eps);
    let ys = cut_points(inner.min_y, inner.max_y(), relevant.iter().flat_map(|s| [s.min_y, s.max_y()]), eps);
    for xw in xs.windows(2) {
        for yw in ys.windows(2) {
            let mid = Point::new((xw[0] + xw[1]) / 2.0, (yw[0] + yw[1]) / 2.0);
            if !relevant.iter().any(|s| s.contains_point(mid, 0.0)) {
                return false;
            }
        }
    }
    true
}

/// Sorted, de-duplicated cut positions within `[lo, hi]`.
fn cut_points<I>(lo: f64, hi: f64, edges: I, eps: f64) -> Vec<f64>
where
    I: Iterator<Item = f64>,
{
    let mut cuts: Vec<f64> = std::iter::once(lo)
        .chain(edges.filter(|e| *e > lo + eps && *e < hi - eps))
        .chain(std::iter::once(hi))
        .collect();
    cuts.sort_by(f64::total_cmp);
    cuts.dedup_by(|a, b| (*a - *b).abs() <= eps);
    cuts
}
