use thiserror::Error;

/// Errors raised by grid and workbook operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XlforgeError {
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    #[error("Workbook has no sheets")]
    EmptyWorkbook,

    #[error("Row {row} is out of range (grid has {rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },

    #[error("Column {col} is out of range (grid has {cols} columns)")]
    ColumnOutOfRange { col: usize, cols: usize },

    #[error("Cell ({row}, {col}) is beyond the sheet limit of {max_rows} rows x {max_cols} columns")]
    BeyondSheetLimit {
        row: usize,
        col: usize,
        max_rows: usize,
        max_cols: usize,
    },
}

impl XlforgeError {
    /// Stable machine-readable code for UI consumers
    pub fn code(&self) -> &'static str {
        match self {
            XlforgeError::SheetNotFound(_) => "SHEET_NOT_FOUND",
            XlforgeError::DuplicateSheetName(_) => "DUPLICATE_SHEET_NAME",
            XlforgeError::EmptyWorkbook => "EMPTY_WORKBOOK",
            XlforgeError::RowOutOfRange { .. } => "ROW_OUT_OF_RANGE",
            XlforgeError::ColumnOutOfRange { .. } => "COLUMN_OUT_OF_RANGE",
            XlforgeError::BeyondSheetLimit { .. } => "BEYOND_SHEET_LIMIT",
        }
    }
}
