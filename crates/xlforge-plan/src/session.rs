//! Editor session: the single state container the UI drives.
//!
//! Holds the workbook, one undo/redo history per sheet, the dirty flag and
//! the metadata of the file the workbook came from. Every mutation goes
//! through here so history recording cannot be forgotten.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use xlforge_core::{CellValue, Grid, Row, Workbook, WorkbookPayload, XlforgeError};
use xlforge_history::HistoryManager;

use crate::executor::{self, PlanReport};
use crate::plan::Plan;
use crate::prompt::{build_system_prompt, PromptOptions};

/// Metadata of the loaded file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

/// Grid state captured when a prompt is built, compared again at apply time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanContext {
    pub sheet: String,
    pub rows: usize,
    pub cols: usize,
    pub fingerprint: u64,
}

#[derive(Debug, Clone)]
pub struct EditorSession {
    workbook: Workbook,
    histories: HashMap<String, HistoryManager>,
    history_limit: usize,
    file: FileInfo,
    dirty: bool,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(Workbook::default(), FileInfo::default())
    }
}

impl EditorSession {
    pub const DEFAULT_HISTORY_LIMIT: usize = 100;

    pub fn new(workbook: Workbook, file: FileInfo) -> Self {
        Self {
            workbook,
            histories: HashMap::new(),
            history_limit: Self::DEFAULT_HISTORY_LIMIT,
            file,
            dirty: false,
        }
    }

    /// Start a session from a persistence payload
    pub fn from_payload(payload: WorkbookPayload, file: FileInfo) -> Result<Self, XlforgeError> {
        Ok(Self::new(Workbook::from_payload(payload)?, file))
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Replace the whole workbook, as on file reload. History is discarded.
    pub fn load(&mut self, payload: WorkbookPayload, file: FileInfo) -> Result<(), XlforgeError> {
        self.workbook = Workbook::from_payload(payload)?;
        self.histories.clear();
        self.file = file;
        self.dirty = false;
        tracing::info!(
            file = %self.file.file_name,
            sheets = self.workbook.sheet_count(),
            "Loaded workbook"
        );
        Ok(())
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn grid(&self) -> &Grid {
        self.workbook.active_grid()
    }

    pub fn active_sheet(&self) -> &str {
        self.workbook.active_sheet()
    }

    pub fn sheet_names(&self) -> &[String] {
        self.workbook.sheet_names()
    }

    pub fn file(&self) -> &FileInfo {
        &self.file
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Save payload with the active grid committed
    pub fn payload(&self) -> WorkbookPayload {
        self.workbook.to_payload()
    }

    /// Mark the current state as persisted
    pub fn mark_saved(&mut self, last_modified: Option<String>) {
        self.dirty = false;
        if last_modified.is_some() {
            self.file.last_modified = last_modified;
        }
    }

    pub fn switch_sheet(&mut self, name: &str) -> Result<(), XlforgeError> {
        if name == self.workbook.active_sheet() {
            return Ok(());
        }
        self.workbook.switch_sheet(name)?;
        self.dirty = true;
        Ok(())
    }

    fn history(&self) -> Option<&HistoryManager> {
        self.histories.get(self.workbook.active_sheet())
    }

    fn history_mut(&mut self) -> &mut HistoryManager {
        let limit = self.history_limit;
        self.histories
            .entry(self.workbook.active_sheet().to_string())
            .or_insert_with(|| HistoryManager::new(limit))
    }

    /// Replace the active grid, recording the old one. Unchanged grids
    /// record nothing.
    fn commit(&mut self, next: Grid, label: &str) -> bool {
        if &next == self.workbook.active_grid() {
            return false;
        }
        let before = self.workbook.active_grid().clone();
        self.history_mut().record(before, label);
        self.workbook.set_active_grid(next);
        self.dirty = true;
        true
    }

    /// Set one cell, growing the grid if needed
    pub fn set_cell(&mut self, row: usize, col: usize, value: CellValue) -> Result<bool, XlforgeError> {
        let next = self.grid().with_cell(row, col, value)?;
        Ok(self.commit(next, "Set cell"))
    }

    /// Append an empty row
    pub fn add_row(&mut self) -> bool {
        let next = self.grid().with_empty_row();
        self.commit(next, "Add row")
    }

    /// Append an empty column
    pub fn add_column(&mut self) -> bool {
        let next = self.grid().with_empty_column();
        self.commit(next, "Add column")
    }

    /// Delete a row. Returns Ok(false) when refused by the one-row floor.
    pub fn delete_row(&mut self, row: usize) -> Result<bool, XlforgeError> {
        let next = self.grid().without_row(row)?;
        Ok(self.commit(next, "Delete row"))
    }

    /// Delete a column. Returns Ok(false) when refused by the one-column floor.
    pub fn delete_column(&mut self, col: usize) -> Result<bool, XlforgeError> {
        let next = self.grid().without_column(col)?;
        Ok(self.commit(next, "Delete column"))
    }

    /// Replace the active grid wholesale
    pub fn bulk_set(&mut self, rows: Vec<Row>) -> bool {
        self.commit(Grid::new(rows), "Replace sheet")
    }

    /// Capture the state a prompt is about to describe
    pub fn plan_context(&self) -> PlanContext {
        let grid = self.grid();
        PlanContext {
            sheet: self.active_sheet().to_string(),
            rows: grid.row_count(),
            cols: grid.col_count(),
            fingerprint: grid.fingerprint(),
        }
    }

    /// System prompt for the active grid plus the context to hand back to
    /// [`apply_plan`](Self::apply_plan)
    pub fn prepare_prompt(&self, options: &PromptOptions) -> (String, PlanContext) {
        (build_system_prompt(self.grid(), options), self.plan_context())
    }

    /// Apply a confirmed plan to the active grid as one undo unit.
    ///
    /// The plan always runs against the grid as it is now. When `context` no
    /// longer matches, the report is flagged stale.
    pub fn apply_plan(&mut self, plan: &Plan, context: Option<&PlanContext>) -> PlanReport {
        let stale = context.is_some_and(|ctx| *ctx != self.plan_context());
        if stale {
            tracing::warn!(
                sheet = %self.active_sheet(),
                "Applying plan to a grid that changed since the prompt was built"
            );
        }

        let mut grid = self.workbook.active_grid().clone();
        let limit = self.history_limit;
        let history = self
            .histories
            .entry(self.workbook.active_sheet().to_string())
            .or_insert_with(|| HistoryManager::new(limit));
        let mut report = executor::apply_plan(&mut grid, history, plan);
        self.workbook.set_active_grid(grid);
        self.dirty = true;

        report.stale = stale;
        report
    }

    pub fn undo(&mut self) -> bool {
        let mut grid = self.workbook.active_grid().clone();
        if !self.history_mut().undo(&mut grid) {
            return false;
        }
        self.workbook.set_active_grid(grid);
        self.dirty = true;
        true
    }

    pub fn redo(&mut self) -> bool {
        let mut grid = self.workbook.active_grid().clone();
        if !self.history_mut().redo(&mut grid) {
            return false;
        }
        self.workbook.set_active_grid(grid);
        self.dirty = true;
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history().is_some_and(HistoryManager::can_undo)
    }

    pub fn can_redo(&self) -> bool {
        self.history().is_some_and(HistoryManager::can_redo)
    }

    pub fn undo_count(&self) -> usize {
        self.history().map_or(0, HistoryManager::undo_count)
    }

    pub fn redo_count(&self) -> usize {
        self.history().map_or(0, HistoryManager::redo_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> EditorSession {
        let payload: WorkbookPayload = serde_json::from_value(json!({
            "sheetNames": ["Stores", "Notes"],
            "sheets": {
                "Stores": [["Store ID", "Status"], ["S001", "Review"], ["S002", "Verified"]],
                "Notes": [["Sheet Notes"]]
            }
        }))
        .unwrap();
        EditorSession::from_payload(
            payload,
            FileInfo {
                file_name: "store-data.xlsx".to_string(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_cell_edit_undo_redo() {
        let mut s = session();
        let original = s.grid().clone();

        assert_eq!(s.set_cell(1, 1, CellValue::text("Verified")), Ok(true));
        let edited = s.grid().clone();
        assert!(s.is_dirty());

        assert!(s.undo());
        assert_eq!(s.grid(), &original);
        assert!(s.redo());
        assert_eq!(s.grid(), &edited);
        assert!(!s.redo());
    }

    #[test]
    fn test_structural_floor_records_nothing() {
        let mut s = session();
        s.switch_sheet("Notes").unwrap();

        assert_eq!(s.delete_row(0), Ok(false));
        assert_eq!(s.delete_column(0), Ok(false));
        assert_eq!(s.grid().row_count(), 1);
        assert!(!s.can_undo());
        assert!(s.delete_row(3).is_err());
    }

    #[test]
    fn test_structural_edits() {
        let mut s = session();
        assert!(s.add_row());
        assert!(s.add_column());
        assert_eq!(s.grid().shape().rows, 4);
        assert_eq!(s.grid().shape().cols, 3);
        assert_eq!(s.delete_column(2), Ok(true));
        assert_eq!(s.delete_row(3), Ok(true));
        assert_eq!(s.undo_count(), 4);

        while s.undo() {}
        assert_eq!(s.grid(), session().grid());
    }

    #[test]
    fn test_history_is_per_sheet() {
        let mut s = session();
        s.set_cell(0, 0, CellValue::text("ID")).unwrap();
        s.switch_sheet("Notes").unwrap();

        assert!(!s.can_undo());
        assert!(!s.undo());
        assert_eq!(s.grid(), &Grid::from_strs(&[&["Sheet Notes"]]));

        s.switch_sheet("Stores").unwrap();
        assert!(s.can_undo());
        assert_eq!(s.grid().get(0, 0), Some(&CellValue::text("ID")));
    }

    #[test]
    fn test_apply_plan_and_undo() {
        let mut s = session();
        let original = s.grid().clone();
        let plan = Plan::new(
            vec![
                json!({"action": "filter_delete", "col": 1, "operator": "equals", "value": "Review"}),
                json!({"action": "delete_row", "row": 40}),
                json!({"action": "add_column", "header": "Owner", "fill": "n/a"}),
            ],
            "Drop reviews, add owner",
        );

        let report = s.apply_plan(&plan, None);
        assert_eq!(report.applied, 2);
        assert_eq!(report.failures.len(), 1);
        assert!(!report.stale);
        assert_eq!(
            s.grid(),
            &Grid::from_strs(&[&["Store ID", "Status", "Owner"], &["S002", "Verified", "n/a"]])
        );
        assert_eq!(s.undo_count(), 1);

        assert!(s.undo());
        assert_eq!(s.grid(), &original);
    }

    #[test]
    fn test_stale_plan_is_flagged_but_applied() {
        let mut s = session();
        let (prompt, context) = s.prepare_prompt(&PromptOptions::default());
        assert!(prompt.contains("Sheet: 3 rows x 2 cols."));

        s.add_row();
        let plan = Plan::new(vec![json!({"action": "delete_row", "row": 3})], "");
        let report = s.apply_plan(&plan, Some(&context));

        assert!(report.stale);
        assert_eq!(report.applied, 1);
        assert_eq!(s.grid().row_count(), 3);
    }

    #[test]
    fn test_fresh_context_is_not_stale() {
        let mut s = session();
        let context = s.plan_context();
        let report = s.apply_plan(&Plan::default(), Some(&context));
        assert!(!report.stale);
    }

    #[test]
    fn test_load_resets_history_and_dirty() {
        let mut s = session();
        s.add_row();
        assert!(s.can_undo());

        let payload = session().payload();
        s.load(payload, FileInfo::default()).unwrap();
        assert!(!s.can_undo());
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_payload_and_mark_saved() {
        let mut s = session();
        s.set_cell(1, 0, CellValue::text("S100")).unwrap();
        s.switch_sheet("Notes").unwrap();

        let payload = s.payload();
        assert_eq!(payload.sheets["Stores"].get(1, 0), Some(&CellValue::text("S100")));

        s.mark_saved(Some("2026-01-01T00:00:00Z".to_string()));
        assert!(!s.is_dirty());
        assert_eq!(s.file().last_modified.as_deref(), Some("2026-01-01T00:00:00Z"));
    }

    #[test]
    fn test_bulk_set_normalizes() {
        let mut s = session();
        assert!(s.bulk_set(vec![vec![CellValue::text("a")], vec![]]));
        assert_eq!(s.grid().shape().rows, 2);
        assert_eq!(s.grid().shape().cols, 1);
    }
}
