use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::XlforgeError;
use crate::grid::Grid;

/// Load/save contract shared with the persistence layer.
///
/// `sheet_names` carries display order; `sheets` maps each name to its
/// header-row-inclusive grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbookPayload {
    pub sheet_names: Vec<String>,
    pub sheets: HashMap<String, Grid>,
}

/// Named sheets with exactly one active sheet.
///
/// The active grid lives outside the sheet map while it is being edited and
/// is committed back on sheet switch or when a payload is taken.
#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    sheet_names: Vec<String>,
    sheets: HashMap<String, Grid>,
    active_sheet: String,
    active_grid: Grid,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new("Sheet1")
    }
}

impl Workbook {
    /// Create a workbook with a single empty sheet
    pub fn new(sheet_name: impl Into<String>) -> Self {
        let name = sheet_name.into();
        Self {
            sheet_names: vec![name.clone()],
            sheets: HashMap::from([(name.clone(), Grid::default())]),
            active_sheet: name,
            active_grid: Grid::default(),
        }
    }

    /// Build a workbook from a load payload. The first sheet becomes active.
    ///
    /// Names listed without a grid load as an empty sheet; grids whose name is
    /// not listed are dropped.
    pub fn from_payload(payload: WorkbookPayload) -> Result<Self, XlforgeError> {
        let WorkbookPayload {
            sheet_names,
            mut sheets,
        } = payload;

        let mut seen = HashSet::new();
        for name in &sheet_names {
            if !seen.insert(name.as_str()) {
                return Err(XlforgeError::DuplicateSheetName(name.clone()));
            }
        }

        let active_sheet = sheet_names
            .first()
            .cloned()
            .ok_or(XlforgeError::EmptyWorkbook)?;

        let sheets: HashMap<String, Grid> = sheet_names
            .iter()
            .map(|name| {
                let grid = sheets.remove(name).unwrap_or_default();
                (name.clone(), grid)
            })
            .collect();
        let active_grid = sheets.get(&active_sheet).cloned().unwrap_or_default();

        Ok(Self {
            sheet_names,
            sheets,
            active_sheet,
            active_grid,
        })
    }

    /// Snapshot of every sheet with the active grid committed
    pub fn to_payload(&self) -> WorkbookPayload {
        let mut sheets = self.sheets.clone();
        sheets.insert(self.active_sheet.clone(), self.active_grid.clone());
        WorkbookPayload {
            sheet_names: self.sheet_names.clone(),
            sheets,
        }
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    pub fn sheet_count(&self) -> usize {
        self.sheet_names.len()
    }

    pub fn active_sheet(&self) -> &str {
        &self.active_sheet
    }

    pub fn active_grid(&self) -> &Grid {
        &self.active_grid
    }

    /// Replace the active grid
    pub fn set_active_grid(&mut self, grid: Grid) {
        self.active_grid = grid;
    }

    /// Current grid of a sheet, including uncommitted edits on the active one
    pub fn sheet(&self, name: &str) -> Option<&Grid> {
        if name == self.active_sheet {
            Some(&self.active_grid)
        } else {
            self.sheets.get(name)
        }
    }

    /// Make another sheet active, committing the outgoing grid first.
    ///
    /// Switching to the already active sheet is a no-op.
    pub fn switch_sheet(&mut self, name: &str) -> Result<(), XlforgeError> {
        if name == self.active_sheet {
            return Ok(());
        }
        let incoming = self
            .sheets
            .get(name)
            .cloned()
            .ok_or_else(|| XlforgeError::SheetNotFound(name.to_string()))?;

        let outgoing = std::mem::take(&mut self.active_grid);
        self.sheets
            .insert(self.active_sheet.clone(), Grid::new(outgoing.into_rows()));

        self.active_sheet = name.to_string();
        self.active_grid = Grid::new(incoming.into_rows());
        Ok(())
    }
}
