//! Deferred validation: the expensive checks (precise support, full-candidate
//! collisions) that run off the synchronous update path.
//!
//! A [`DeferredValidator`] hands out [`DeferredTicket`]s stamped with a
//! generation number. The ticket can be evaluated anywhere, at any later
//! time; the editor applies the [`DeferredResult`] only if its generation is
//! still current and it names the same pieces as the live gesture. Starting,
//! ending or cancelling a gesture bumps the generation, so late results for a
//! finished gesture are dropped on arrival.

#[cfg(test)]
#[path = "deferred_test.rs"]
mod deferred_test;

use crate::consts::DEFERRED_MIN_MOVE;
use crate::doc::{Document, Piece, PieceId};
use crate::geom::Point;
use crate::support::SupportResolver;
use crate::validate::{Problem, blocking_for_candidates};

/// Issues generation-stamped validation requests.
#[derive(Debug, Clone)]
pub struct DeferredValidator {
    generation: u64,
    last_pointer: Option<Point>,
    min_move: f64,
}

impl DeferredValidator {
    #[must_use]
    pub fn new(min_move: f64) -> Self {
        Self { generation: 0, last_pointer: None, min_move }
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Invalidate every outstanding ticket and forget the last pointer.
    pub fn invalidate(&mut self) -> u64 {
        self.generation += 1;
        self.last_pointer = None;
        self.generation
    }

    /// Issue a ticket unless the pointer has moved less than the minimum
    /// distance since the previous request.
    pub fn request(&mut self, pointer: Point, piece_ids: Vec<PieceId>, candidates: Vec<Piece>) -> Option<DeferredTicket> {
        if let Some(last) = self.last_pointer {
            if last.distance_to(pointer) < self.min_move {
                return None;
            }
        }
        self.generation += 1;
        self.last_pointer = Some(pointer);
        Some(DeferredTicket { generation: self.generation, piece_ids, candidates })
    }

    /// Whether `result` still belongs to the live gesture over `live_ids`.
    #[must_use]
    pub fn is_current(&self, result: &DeferredResult, live_ids: &[PieceId]) -> bool {
        result.generation == self.generation && result.piece_ids == live_ids
    }
}

impl Default for DeferredValidator {
    fn default() -> Self {
        Self::new(DEFERRED_MIN_MOVE)
    }
}

/// A pending deferred validation.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredTicket {
    pub generation: u64,
    pub piece_ids: Vec<PieceId>,
    pub candidates: Vec<Piece>,
}

impl DeferredTicket {
    /// Run the deferred checks against `doc` as it would be with the
    /// ticket's candidates applied.
    #[must_use]
    pub fn evaluate(&self, resolver: &SupportResolver, doc: &Document) -> DeferredResult {
        DeferredResult {
            generation: self.generation,
            piece_ids: self.piece_ids.clone(),
            support: resolver.resolve_with(doc, &self.candidates),
            blocking: blocking_for_candidates(doc, &self.candidates),
        }
    }
}

/// Outcome of a deferred validation.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredResult {
    pub generation: u64,
    pub piece_ids: Vec<PieceId>,
    /// Support advisories for the candidate document.
    pub support: Vec<Problem>,
    /// BLOCK problems for the candidates.
    pub blocking: Vec<Problem>,
}
