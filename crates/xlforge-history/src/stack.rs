use std::collections::VecDeque;

use xlforge_core::Grid;

/// A grid as it was before a mutation, with a label for UI display
#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    grid: Grid,
    label: String,
}

/// Undo/redo history over full grid snapshots
#[derive(Clone)]
pub struct HistoryManager {
    /// Snapshots that can be restored by undo (newest at the back)
    undo_stack: VecDeque<Snapshot>,
    /// Snapshots that can be restored by redo (newest at the back)
    redo_stack: Vec<Snapshot>,
    /// Maximum number of undo levels
    max_size: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(100)
    }
}

impl HistoryManager {
    /// Create a new history manager with the specified max undo levels
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_size: max_size.max(1),
        }
    }

    /// Record the grid as it was immediately before a mutation.
    ///
    /// Clears the redo stack and evicts the oldest snapshot past `max_size`.
    pub fn record(&mut self, before: Grid, label: impl Into<String>) {
        self.redo_stack.clear();
        self.undo_stack.push_back(Snapshot {
            grid: before,
            label: label.into(),
        });

        while self.undo_stack.len() > self.max_size {
            self.undo_stack.pop_front();
        }
    }

    /// Restore the most recent snapshot into `current`.
    ///
    /// The replaced grid moves to the redo stack. Returns false when there is
    /// nothing to undo, leaving `current` untouched.
    pub fn undo(&mut self, current: &mut Grid) -> bool {
        let Some(snapshot) = self.undo_stack.pop_back() else {
            return false;
        };
        let replaced = std::mem::replace(current, snapshot.grid);
        self.redo_stack.push(Snapshot {
            grid: replaced,
            label: snapshot.label,
        });
        true
    }

    /// Mirror of [`undo`](Self::undo) over the redo stack
    pub fn redo(&mut self, current: &mut Grid) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        let replaced = std::mem::replace(current, snapshot.grid);
        self.undo_stack.push_back(Snapshot {
            grid: replaced,
            label: snapshot.label,
        });
        true
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Label of the edit that would be undone
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|s| s.label.as_str())
    }

    /// Label of the edit that would be redone
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|s| s.label.as_str())
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl std::fmt::Debug for HistoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryManager")
            .field("undo_count", &self.undo_stack.len())
            .field("redo_count", &self.redo_stack.len())
            .field("max_size", &self.max_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xlforge_core::CellValue;

    /// Apply an edit the way callers do: record the old grid, then replace it
    fn edit(history: &mut HistoryManager, grid: &mut Grid, row: usize, value: f64) {
        let next = grid.with_cell(row, 0, CellValue::Number(value)).unwrap();
        history.record(std::mem::replace(grid, next), "Set cell");
    }

    #[test]
    fn test_undo_redo() {
        let mut history = HistoryManager::new(100);
        let original = Grid::from_strs(&[&["a"]]);
        let mut grid = original.clone();

        edit(&mut history, &mut grid, 0, 42.0);
        let edited = grid.clone();
        assert!(history.can_undo());
        assert!(!history.can_redo());

        assert!(history.undo(&mut grid));
        assert_eq!(grid, original);
        assert!(!history.can_undo());
        assert!(history.can_redo());

        assert!(history.redo(&mut grid));
        assert_eq!(grid, edited);
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut history = HistoryManager::default();
        let mut grid = Grid::from_strs(&[&["a"]]);

        assert!(!history.undo(&mut grid));
        assert!(!history.redo(&mut grid));
        assert_eq!(grid, Grid::from_strs(&[&["a"]]));
    }

    #[test]
    fn test_redo_cleared_on_record() {
        let mut history = HistoryManager::new(100);
        let mut grid = Grid::default();

        edit(&mut history, &mut grid, 0, 1.0);
        history.undo(&mut grid);
        assert!(history.can_redo());

        edit(&mut history, &mut grid, 0, 2.0);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_max_size() {
        let mut history = HistoryManager::new(3);
        let mut grid = Grid::default();

        for i in 0..5 {
            edit(&mut history, &mut grid, i, i as f64);
        }

        assert_eq!(history.undo_count(), 3);
        while history.undo(&mut grid) {}
        // the two oldest snapshots were evicted
        assert_eq!(grid.row_count(), 2);
    }

    #[test]
    fn test_multiple_undo_redo() {
        let mut history = HistoryManager::new(100);
        let mut grid = Grid::default();
        let mut states = vec![grid.clone()];

        for i in 0..3 {
            edit(&mut history, &mut grid, i, (i + 1) as f64);
            states.push(grid.clone());
        }

        for expected in states.iter().rev().skip(1) {
            assert!(history.undo(&mut grid));
            assert_eq!(&grid, expected);
        }
        for expected in states.iter().skip(1) {
            assert!(history.redo(&mut grid));
            assert_eq!(&grid, expected);
        }
    }

    #[test]
    fn test_descriptions() {
        let mut history = HistoryManager::new(10);
        let mut grid = Grid::default();
        history.record(grid.clone(), "Apply plan: add status column");
        grid = grid.with_empty_row();

        assert_eq!(history.undo_description(), Some("Apply plan: add status column"));
        history.undo(&mut grid);
        assert_eq!(history.redo_description(), Some("Apply plan: add status column"));
    }
}
