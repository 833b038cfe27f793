//! Undo/redo snapshot stacks.

use std::collections::VecDeque;

use thiserror::Error;

use super::store::AnnotationStore;
use super::FilterState;
use crate::calibration::Calibration;

/// Default depth of the undo stack.
pub const DEFAULT_UNDO_CAP: usize = 50;

/// Error types for history navigation. Both are reported no-ops.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HistoryError {
    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,
}

/// A full copy of the mutable session state.
///
/// Snapshots share no mutable substructure with the live state or with each
/// other, so restoring one replaces every tracked field atomically. The
/// active mode is intentionally not captured; a restore lands in no mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub store: AnnotationStore,
    pub calibration: Calibration,
    pub filters: FilterState,
}

/// Bounded undo/redo stacks of [`Snapshot`]s.
///
/// Saving clears the redo stack (new actions discard the redo branch), and
/// pushing past the cap evicts the oldest entry, trading deep history for
/// bounded memory.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    cap: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_cap(DEFAULT_UNDO_CAP)
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// History bounded to `cap` undo entries (at least one).
    pub fn with_cap(cap: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            cap: cap.max(1),
        }
    }

    /// Record a snapshot taken before a mutation; discards the redo branch.
    pub fn save(&mut self, snapshot: Snapshot) {
        self.push_undo(snapshot);
        self.redo.clear();
    }

    /// Step back: stores `current` on the redo stack and yields the snapshot
    /// to restore.
    pub fn undo(&mut self, current: Snapshot) -> Result<Snapshot, HistoryError> {
        let restored = self.undo.pop_back().ok_or(HistoryError::NothingToUndo)?;
        self.redo.push(current);
        Ok(restored)
    }

    /// Step forward again: mirror of [`History::undo`].
    pub fn redo(&mut self, current: Snapshot) -> Result<Snapshot, HistoryError> {
        let restored = self.redo.pop().ok_or(HistoryError::NothingToRedo)?;
        self.push_undo(current);
        Ok(restored)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of states currently available to undo.
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Drop both stacks, e.g. when a new image is loaded.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    fn push_undo(&mut self, snapshot: Snapshot) {
        self.undo.push_back(snapshot);
        if self.undo.len() > self.cap {
            self.undo.pop_front();
        }
    }
}
