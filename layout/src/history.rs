//! Bounded undo/redo over full editor snapshots.
//!
//! A snapshot is taken before every committed mutation. The undo stack is
//! FIFO-bounded: once it exceeds its depth the oldest entry is dropped. Any
//! new push clears the redo stack.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::collections::VecDeque;

use crate::consts::HISTORY_DEPTH;
use crate::doc::Document;
use crate::selection::Selection;

/// Everything undo restores: the document, the selection and the grid flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub document: Document,
    pub selection: Selection,
    pub grid_snap: bool,
}

/// Manages undo/redo with deep snapshots.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    depth: usize,
}

impl History {
    /// Create an empty history keeping at most `depth` undo entries.
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self { undo: VecDeque::new(), redo: Vec::new(), depth: depth.max(1) }
    }

    /// Record the state from before a committed mutation.
    pub fn push(&mut self, before: Snapshot) {
        self.undo.push_back(before);
        self.redo.clear();
        while self.undo.len() > self.depth {
            self.undo.pop_front();
        }
    }

    /// Step back. `current` goes onto the redo stack and the previous
    /// snapshot is returned, or `None` when there is nothing to undo.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Step forward. `current` goes back onto the undo stack.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo.pop()?;
        self.undo.push_back(current);
        Some(next)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(HISTORY_DEPTH)
    }
}
