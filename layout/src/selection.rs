//! Selection state: zero or more piece ids plus a primary anchor.
//!
//! The primary is the transform anchor for group operations. When it is not
//! set explicitly, the first selected id acts as primary.

#[cfg(test)]
#[path = "selection_test.rs"]
mod selection_test;

use serde::{Deserialize, Serialize};

use crate::doc::PieceId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    ids: Vec<PieceId>,
    primary: Option<PieceId>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select exactly one piece, making it primary.
    pub fn select_only(&mut self, id: PieceId) {
        self.ids.clear();
        self.ids.push(id);
        self.primary = Some(id);
    }

    /// Add a piece. The first piece added to an empty selection becomes primary.
    pub fn add(&mut self, id: PieceId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
        if self.primary.is_none() {
            self.primary = Some(id);
        }
    }

    /// Add the piece if absent, remove it if present.
    pub fn toggle(&mut self, id: PieceId) {
        if self.contains(&id) {
            self.remove(&id);
        } else {
            self.add(id);
        }
    }

    /// Remove a piece, moving the primary to the next remaining id if needed.
    pub fn remove(&mut self, id: &PieceId) {
        self.ids.retain(|i| i != id);
        if self.primary.as_ref() == Some(id) {
            self.primary = self.ids.first().copied();
        }
    }

    /// Keep only ids for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&PieceId) -> bool,
    {
        self.ids.retain(|id| keep(id));
        if let Some(primary) = self.primary {
            if !self.ids.contains(&primary) {
                self.primary = self.ids.first().copied();
            }
        }
    }

    /// Replace the whole selection.
    pub fn replace(&mut self, ids: Vec<PieceId>, primary: Option<PieceId>) {
        self.primary = primary.filter(|p| ids.contains(p)).or_else(|| ids.first().copied());
        self.ids = ids;
    }

    /// Make a selected piece the primary. Returns false if it isn't selected.
    pub fn set_primary(&mut self, id: PieceId) -> bool {
        if self.ids.contains(&id) {
            self.primary = Some(id);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.primary = None;
    }

    #[must_use]
    pub fn ids(&self) -> &[PieceId] {
        &self.ids
    }

    /// The transform anchor, falling back to the first selected id.
    #[must_use]
    pub fn primary(&self) -> Option<PieceId> {
        self.primary.or_else(|| self.ids.first().copied())
    }

    #[must_use]
    pub fn contains(&self, id: &PieceId) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
