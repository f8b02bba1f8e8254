//! Validation engine: typed problem detection over a document or a candidate.
//!
//! DESIGN
//! ======
//! Nothing here mutates. Every check produces a list of [`Problem`]s, each
//! with a [`Severity`]:
//!
//! - **BLOCK** (same-layer overlap, outside the canvas, below the size
//!   floor) prevents a commit.
//! - **WARN** (orientation mismatch, missing support, tight spacing) is
//!   advisory and never prevents a commit.
//!
//! Overlap is only ever checked between pieces on the same layer; layers are
//! independent planes and may overlap freely.

#[cfg(test)]
#[path = "validate_test.rs"]
mod validate_test;

use std::collections::HashSet;

use crate::consts::OVERLAP_EPSILON;
use crate::doc::{Document, LayerId, Piece, PieceId};
use crate::geom::{self, Rotation};
use crate::support::SupportResolver;

// =============================================================================
// TYPES
// =============================================================================

/// How serious a problem is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational; never prevents a commit.
    Warn,
    /// Prevents a commit.
    Block,
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq)]
pub enum Problem {
    /// Two pieces on the same layer overlap.
    Overlap { a: PieceId, b: PieceId },
    /// A piece's bounding box leaves the canvas.
    OutOfBounds { id: PieceId },
    /// A candidate pose is narrower or shorter than the size floor.
    BelowMinimumSize { id: PieceId },
    /// An oriented material is placed across its orientation.
    OrientationMismatch { id: PieceId, rotation: Rotation, orientation_deg: f64 },
    /// An upper-layer piece is not fully covered by the layer below.
    Unsupported { id: PieceId, layer: LayerId },
    /// Two same-layer pieces sit closer than the canonical spacing.
    TightSpacing { a: PieceId, b: PieceId, gap: f64 },
}

impl Problem {
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::Overlap { .. } | Self::OutOfBounds { .. } | Self::BelowMinimumSize { .. } => Severity::Block,
            Self::OrientationMismatch { .. } | Self::Unsupported { .. } | Self::TightSpacing { .. } => {
                Severity::Warn
            }
        }
    }

    /// Whether this problem names `id`.
    #[must_use]
    pub fn involves(&self, id: &PieceId) -> bool {
        match self {
            Self::Overlap { a, b } | Self::TightSpacing { a, b, .. } => a == id || b == id,
            Self::OutOfBounds { id: p }
            | Self::BelowMinimumSize { id: p }
            | Self::OrientationMismatch { id: p, .. }
            | Self::Unsupported { id: p, .. } => p == id,
        }
    }

    /// Ids of the pieces this problem names.
    #[must_use]
    pub fn pieces(&self) -> Vec<PieceId> {
        match self {
            Self::Overlap { a, b } | Self::TightSpacing { a, b, .. } => vec![*a, *b],
            Self::OutOfBounds { id }
            | Self::BelowMinimumSize { id }
            | Self::OrientationMismatch { id, .. }
            | Self::Unsupported { id, .. } => vec![*id],
        }
    }

    /// Short grepable code for logs and hosts.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Overlap { .. } => "P_OVERLAP",
            Self::OutOfBounds { .. } => "P_OUT_OF_BOUNDS",
            Self::BelowMinimumSize { .. } => "P_BELOW_MINIMUM_SIZE",
            Self::OrientationMismatch { .. } => "P_ORIENTATION",
            Self::Unsupported { .. } => "P_UNSUPPORTED",
            Self::TightSpacing { .. } => "P_TIGHT_SPACING",
        }
    }
}

/// Result of an overlap check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlapReport {
    pub ok: bool,
    pub conflicts: Vec<(PieceId, PieceId)>,
}

/// Result of a canvas-bounds check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundsReport {
    pub ok: bool,
    pub outside: Vec<PieceId>,
}

/// Result of the material orientation advisory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrientationReport {
    pub ok: bool,
    pub warnings: Vec<Problem>,
}

// =============================================================================
// DOCUMENT CHECKS
// =============================================================================

/// Pairwise same-layer overlap over the whole document.
#[must_use]
pub fn validate_no_overlap(doc: &Document) -> OverlapReport {
    validate_no_overlap_for_candidate(doc, &[])
}

/// Same as [`validate_no_overlap`], but pairs whose members are both in
/// `excluded` are skipped, so a group may touch itself while it transforms.
#[must_use]
pub fn validate_no_overlap_for_candidate(doc: &Document, excluded: &[PieceId]) -> OverlapReport {
    let excluded: HashSet<&PieceId> = excluded.iter().collect();
    let mut conflicts = Vec::new();
    for layer in doc.layers() {
        let members: Vec<&Piece> = doc.pieces_on_layer(layer.id).collect();
        let boxes: Vec<_> = members.iter().map(|p| p.bbox()).collect();
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                if excluded.contains(&members[i].id) && excluded.contains(&members[j].id) {
                    continue;
                }
                if geom::overlaps(&boxes[i], &boxes[j]) {
                    conflicts.push((members[i].id, members[j].id));
                }
            }
        }
    }
    OverlapReport { ok: conflicts.is_empty(), conflicts }
}

/// Every piece's bounding box must lie within the canvas.
#[must_use]
pub fn validate_inside_scene(doc: &Document) -> BoundsReport {
    let canvas = doc.canvas();
    let outside: Vec<PieceId> = doc
        .pieces()
        .filter(|p| !geom::contains(&canvas, &p.bbox(), OVERLAP_EPSILON))
        .map(|p| p.id)
        .collect();
    BoundsReport { ok: outside.is_empty(), outside }
}

/// Advisory: flag pieces whose rotation is not congruent (mod 180°) with
/// their oriented material's declared angle.
#[must_use]
pub fn validate_material_orientation(doc: &Document) -> OrientationReport {
    let warnings: Vec<Problem> = doc
        .pieces()
        .filter_map(|p| {
            let material = doc.material(&p.material)?;
            if !material.oriented || orientation_matches(p.rotation, material.orientation_deg) {
                return None;
            }
            Some(Problem::OrientationMismatch {
                id: p.id,
                rotation: p.rotation,
                orientation_deg: material.orientation_deg,
            })
        })
        .collect();
    OrientationReport { ok: warnings.is_empty(), warnings }
}

/// Whether a rotation is congruent to `orientation_deg` modulo 180°.
#[must_use]
pub fn orientation_matches(rotation: Rotation, orientation_deg: f64) -> bool {
    let diff = (f64::from(rotation.degrees()) - orientation_deg).rem_euclid(180.0);
    diff.min(180.0 - diff) < 0.5
}

/// Advisory: same-layer neighbors separated by a positive gap below `gap_target`.
///
/// Border-touching pieces (gap of zero) and joined pieces never warn.
#[must_use]
pub fn validate_spacing(doc: &Document, gap_target: f64) -> Vec<Problem> {
    let mut problems = Vec::new();
    for layer in doc.layers() {
        let members: Vec<&Piece> = doc.pieces_on_layer(layer.id).collect();
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                let (a, b) = (members[i], members[j]);
                if a.joined || b.joined {
                    continue;
                }
                let Some(sep) = geom::separation(&a.bbox(), &b.bbox()) else {
                    continue;
                };
                if sep.gap > OVERLAP_EPSILON && sep.gap < gap_target - OVERLAP_EPSILON {
                    problems.push(Problem::TightSpacing { a: a.id, b: b.id, gap: sep.gap });
                }
            }
        }
    }
    problems
}

/// Full report: every BLOCK and WARN problem in the document, including
/// fast-mode support warnings.
#[must_use]
pub fn validate_document(doc: &Document, gap_target: f64) -> Vec<Problem> {
    validate_document_with(doc, gap_target, &SupportResolver::fast())
}

/// [`validate_document`] with support warnings from `resolver`.
#[must_use]
pub fn validate_document_with(doc: &Document, gap_target: f64, resolver: &SupportResolver) -> Vec<Problem> {
    let mut problems: Vec<Problem> = validate_no_overlap(doc)
        .conflicts
        .into_iter()
        .map(|(a, b)| Problem::Overlap { a, b })
        .collect();
    problems.extend(validate_inside_scene(doc).outside.into_iter().map(|id| Problem::OutOfBounds { id }));
    problems.extend(validate_material_orientation(doc).warnings);
    problems.extend(resolver.resolve(doc));
    problems.extend(validate_spacing(doc, gap_target));
    problems
}

// =============================================================================
// CANDIDATE CHECKS
// =============================================================================

/// BLOCK problems that a set of candidate poses would cause.
///
/// Each candidate is checked against the canvas and against every same-layer
/// piece of `doc` that is not itself a candidate. Pairs inside the candidate
/// set are skipped, and conflicts between untouched pieces are ignored: they
/// are not caused by this transform.
#[must_use]
pub fn blocking_for_candidates(doc: &Document, candidates: &[Piece]) -> Vec<Problem> {
    let moving: HashSet<PieceId> = candidates.iter().map(|p| p.id).collect();
    let canvas = doc.canvas();
    let mut problems = Vec::new();
    for candidate in candidates {
        let bbox = candidate.bbox();
        if !geom::contains(&canvas, &bbox, OVERLAP_EPSILON) {
            problems.push(Problem::OutOfBounds { id: candidate.id });
        }
        for other in doc.pieces_on_layer(candidate.layer) {
            if moving.contains(&other.id) {
                continue;
            }
            if geom::overlaps(&bbox, &other.bbox()) {
                problems.push(Problem::Overlap { a: candidate.id, b: other.id });
            }
        }
    }
    problems
}

/// Same-layer overlaps between the candidates themselves.
///
/// [`blocking_for_candidates`] skips these pairs, which only holds when the
/// set moves rigidly. Transforms that move members independently (absolute
/// rotation about each piece's own center) must add this check.
#[must_use]
pub fn overlaps_within(candidates: &[Piece]) -> Vec<Problem> {
    let mut problems = Vec::new();
    for (i, a) in candidates.iter().enumerate() {
        for b in &candidates[i + 1..] {
            if a.layer == b.layer && geom::overlaps(&a.bbox(), &b.bbox()) {
                problems.push(Problem::Overlap { a: a.id, b: b.id });
            }
        }
    }
    problems
}

/// BLOCK problems in `doc` that involve at least one piece of `moving`.
#[must_use]
pub fn blocking_for(doc: &Document, moving: &[PieceId]) -> Vec<Problem> {
    let candidates: Vec<Piece> = moving.iter().filter_map(|id| doc.piece(id).cloned()).collect();
    blocking_for_candidates(doc, &candidates)
}

/// Highest severity in a problem list.
#[must_use]
pub fn max_severity(problems: &[Problem]) -> Option<Severity> {
    problems.iter().map(Problem::severity).max()
}

/// Whether any problem blocks a commit.
#[must_use]
pub fn has_block(problems: &[Problem]) -> bool {
    max_severity(problems) == Some(Severity::Block)
}
