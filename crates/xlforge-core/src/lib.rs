pub mod cell;
pub mod error;
pub mod grid;
pub mod range;
pub mod workbook;

pub use cell::CellValue;
pub use error::XlforgeError;
pub use grid::{check_sheet_limit, normalize, Grid, GridShape, Row, MAX_COLS, MAX_ROWS};
pub use range::{col_from_label, col_to_label, CellCoord};
pub use workbook::{Workbook, WorkbookPayload};
