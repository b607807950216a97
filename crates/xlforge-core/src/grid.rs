use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::cell::CellValue;
use crate::error::XlforgeError;

/// One grid row
pub type Row = Vec<CellValue>;

/// Rows a sheet may grow to, matching the xlsx format
pub const MAX_ROWS: usize = 1_048_576;
/// Columns a sheet may grow to, matching the xlsx format
pub const MAX_COLS: usize = 16_384;

/// Reject coordinates that would grow a grid past the sheet limits
pub fn check_sheet_limit(row: usize, col: usize) -> Result<(), XlforgeError> {
    if row < MAX_ROWS && col < MAX_COLS {
        Ok(())
    } else {
        Err(XlforgeError::BeyondSheetLimit {
            row,
            col,
            max_rows: MAX_ROWS,
            max_cols: MAX_COLS,
        })
    }
}

/// Pad every row to the width of the widest row with empty values.
///
/// Rows are never truncated and an input without cells stays zero-width.
pub fn normalize(mut rows: Vec<Row>) -> Vec<Row> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(width, CellValue::Empty);
    }
    rows
}

/// Row and column count of a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridShape {
    pub rows: usize,
    pub cols: usize,
}

/// A rectangular, row-major table of cell values.
///
/// Every constructor normalizes, so all rows always have the same length.
/// Edits return a new grid and leave `self` untouched, which keeps snapshots
/// held elsewhere (undo history, pending plans) valid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Row>", into = "Vec<Row>")]
pub struct Grid {
    rows: Vec<Row>,
}

impl From<Vec<Row>> for Grid {
    fn from(rows: Vec<Row>) -> Self {
        Grid::new(rows)
    }
}

impl From<Grid> for Vec<Row> {
    fn from(grid: Grid) -> Self {
        grid.rows
    }
}

impl Grid {
    /// Build a normalized grid from raw rows
    pub fn new(rows: Vec<Row>) -> Self {
        Grid {
            rows: normalize(rows),
        }
    }

    /// Convenience constructor from string literals, used heavily in tests
    pub fn from_strs(rows: &[&[&str]]) -> Self {
        Grid::new(
            rows.iter()
                .map(|row| row.iter().map(|&s| CellValue::text(s)).collect())
                .collect(),
        )
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn row(&self, row: usize) -> Option<&[CellValue]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row)?.get(col)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn shape(&self) -> GridShape {
        GridShape {
            rows: self.row_count(),
            cols: self.col_count(),
        }
    }

    /// Content hash, stable for the lifetime of the process
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.rows.len().hash(&mut hasher);
        for row in &self.rows {
            row.len().hash(&mut hasher);
            for cell in row {
                match cell {
                    CellValue::Empty => 0u8.hash(&mut hasher),
                    CellValue::Number(n) => {
                        1u8.hash(&mut hasher);
                        n.to_bits().hash(&mut hasher);
                    }
                    CellValue::Text(s) => {
                        2u8.hash(&mut hasher);
                        s.hash(&mut hasher);
                    }
                }
            }
        }
        hasher.finish()
    }

    /// Set a cell, growing the grid with empty cells when out of bounds.
    /// Coordinates past the sheet limits are an error.
    pub fn with_cell(&self, row: usize, col: usize, value: CellValue) -> Result<Grid, XlforgeError> {
        check_sheet_limit(row, col)?;
        let mut rows = self.rows.clone();
        if rows.len() <= row {
            rows.resize_with(row + 1, Vec::new);
        }
        let target = &mut rows[row];
        if target.len() <= col {
            target.resize(col + 1, CellValue::Empty);
        }
        target[col] = value;
        Ok(Grid::new(rows))
    }

    /// Insert a row before `at`; positions past the end append.
    ///
    /// Without explicit values the row is filled with empty cells sized to
    /// the current width (at least one cell).
    pub fn with_row_inserted(&self, at: usize, values: Option<Row>) -> Grid {
        let mut rows = self.rows.clone();
        let row = values.unwrap_or_else(|| vec![CellValue::Empty; self.col_count().max(1)]);
        rows.insert(at.min(rows.len()), row);
        Grid::new(rows)
    }

    /// Append an empty row
    pub fn with_empty_row(&self) -> Grid {
        self.with_row_inserted(self.row_count(), None)
    }

    /// Append an empty column to every row
    pub fn with_empty_column(&self) -> Grid {
        let mut rows = self.rows.clone();
        for row in &mut rows {
            row.push(CellValue::Empty);
        }
        Grid::new(rows)
    }

    /// Remove a row. Removing the only remaining row is refused silently.
    pub fn without_row(&self, row: usize) -> Result<Grid, XlforgeError> {
        if row >= self.row_count() {
            return Err(XlforgeError::RowOutOfRange {
                row,
                rows: self.row_count(),
            });
        }
        if self.row_count() <= 1 {
            return Ok(self.clone());
        }

        let mut rows = self.rows.clone();
        rows.remove(row);
        Ok(Grid::new(rows))
    }

    /// Remove a column from every row. Removing the only remaining column is
    /// refused silently.
    pub fn without_column(&self, col: usize) -> Result<Grid, XlforgeError> {
        if col >= self.col_count() {
            return Err(XlforgeError::ColumnOutOfRange {
                col,
                cols: self.col_count(),
            });
        }
        if self.col_count() <= 1 {
            return Ok(self.clone());
        }

        let mut rows = self.rows.clone();
        for row in &mut rows {
            row.remove(col);
        }
        Ok(Grid::new(rows))
    }
}
