//! Linear undo/redo over whole-state snapshots.

use crate::helpe::*;

/// Everything [`PartitionAllocator`] needs to travel back in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySnapshot {
    pub free:       FreeList,
    pub allocated:  BTreeMap<ProcId, Extent>,
    pub next_id:    ProcId,
}

/// Two stacks of snapshots. Recording a new state after some undos
/// throws the whole redo stack away: history is linear, not a tree.
///
/// Storing full copies is fine for simulator-sized state. Larger
/// users would log inverse operations instead.
#[derive(Debug, Clone)]
pub struct History<T> {
    undo:   Vec<T>,
    redo:   Vec<T>,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self {
            undo: vec![],
            redo: vec![],
        }
    }
}

impl<T> History<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes the state as it was *before* a mutation.
    pub fn record(&mut self, before: T) {
        self.undo.push(before);
        self.redo.clear();
    }

    /// Trades `current` for the last recorded state.
    /// Returns `None`, dropping `current`, if there is nothing to undo.
    pub fn undo(&mut self, current: T) -> Option<T> {
        let prev = self.undo.pop()?;
        self.redo.push(current);

        Some(prev)
    }

    /// Trades `current` for the last undone state.
    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.redo.pop()?;
        self.undo.push(current);

        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of (undoable, redoable) steps.
    pub fn depth(&self) -> (usize, usize) {
        (self.undo.len(), self.redo.len())
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries() {
        let mut h: History<u32> = History::new();
        assert_eq!(h.undo(7), None);
        assert_eq!(h.redo(7), None);
        h.record(1);
        h.record(2);
        assert_eq!(h.undo(3), Some(2));
        assert_eq!(h.undo(2), Some(1));
        assert_eq!(h.undo(1), None);
        assert_eq!(h.redo(1), Some(2));
        assert_eq!(h.redo(2), Some(3));
        assert_eq!(h.redo(3), None);
        assert_eq!(h.depth(), (2, 0));
    }

    #[test]
    fn recording_drops_redo() {
        let mut h: History<u32> = History::new();
        h.record(1);
        assert_eq!(h.undo(2), Some(1));
        assert!(h.can_redo());
        h.record(1);
        assert!(!h.can_redo());
        assert_eq!(h.depth(), (1, 0));
    }
}
