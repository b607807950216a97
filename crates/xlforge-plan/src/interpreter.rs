use std::cmp::Ordering;

use xlforge_core::{check_sheet_limit, CellValue, Grid, Row, XlforgeError};

use crate::error::StepError;
use crate::step::{CaseTransform, ColumnTarget, FilterOperator, RowPosition, SortDirection, Step};

/// Apply one step to a grid, producing a new normalized grid.
///
/// `grid` is never modified. An `Err` means the step was not applied at all.
pub fn apply_step(grid: &Grid, step: &Step) -> Result<Grid, StepError> {
    match step {
        Step::SetCell { row, col, value } => Ok(grid.with_cell(*row, *col, value.clone())?),

        Step::AddRow { position, values } => {
            let at = match position {
                RowPosition::End => grid.row_count(),
                RowPosition::Index(i) => *i,
            };
            Ok(grid.with_row_inserted(at, values.clone()))
        }

        Step::DeleteRow { row } => Ok(grid.without_row(*row)?),

        Step::AddColumn {
            header,
            fill,
            values,
        } => {
            let mut rows = working_copy(grid);
            if rows.is_empty() {
                rows.push(Row::new());
            }
            for (i, row) in rows.iter_mut().enumerate() {
                let cell = if i == 0 {
                    header.clone()
                } else {
                    values
                        .as_ref()
                        .and_then(|v| v.get(i - 1))
                        .unwrap_or(fill)
                        .clone()
                };
                row.push(cell);
            }
            Ok(Grid::new(rows))
        }

        Step::DeleteColumn { col } => Ok(grid.without_column(*col)?),

        Step::RenameColumn { col, new_name } => {
            check_sheet_limit(0, *col)?;
            let mut rows = working_copy(grid);
            if let Some(header) = rows.first_mut() {
                if header.len() <= *col {
                    header.resize(col + 1, CellValue::Empty);
                }
                header[*col] = new_name.clone();
            }
            Ok(Grid::new(rows))
        }

        Step::Sort {
            col,
            direction,
            has_header,
        } => {
            check_column(grid, *col)?;
            let mut rows = working_copy(grid);
            let mut body = if *has_header { rows.split_off(1) } else { std::mem::take(&mut rows) };

            body.sort_by(|a, b| {
                let ordering = compare_cells(cell_at(a, *col), cell_at(b, *col));
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });

            rows.extend(body);
            Ok(Grid::new(rows))
        }

        Step::FilterDelete {
            col,
            operator,
            value,
            has_header,
        } => {
            check_column(grid, *col)?;
            let rows = working_copy(grid)
                .into_iter()
                .enumerate()
                .filter(|(i, row)| {
                    if *i == 0 && *has_header {
                        return true;
                    }
                    let text = cell_at(row, *col).as_text();
                    match operator {
                        FilterOperator::Equals => text != *value,
                        FilterOperator::Empty => !text.trim().is_empty(),
                        FilterOperator::NotEmpty => text.trim().is_empty(),
                        FilterOperator::Contains => !text.contains(value.as_str()),
                    }
                })
                .map(|(_, row)| row)
                .collect();
            Ok(Grid::new(rows))
        }

        Step::ReplaceAll {
            target,
            find,
            replace,
            transform,
        } => {
            if let ColumnTarget::Index(col) = target {
                check_column(grid, *col)?;
            }
            let find = find.as_deref().filter(|f| !f.is_empty());
            let mut rows = working_copy(grid);
            for row in &mut rows {
                let columns: Vec<usize> = match target {
                    ColumnTarget::All => (0..row.len()).collect(),
                    ColumnTarget::Index(col) => vec![*col],
                };
                for ci in columns {
                    let Some(cell) = row.get_mut(ci) else {
                        continue;
                    };
                    let original = cell.as_text();
                    let mut text = match find {
                        Some(find) => original.replace(find, replace),
                        None => original.clone(),
                    };
                    match transform {
                        Some(CaseTransform::Uppercase) => text = text.to_uppercase(),
                        Some(CaseTransform::Lowercase) => text = text.to_lowercase(),
                        None => {}
                    }
                    // untouched cells keep their type
                    if text != original {
                        *cell = CellValue::text(text);
                    }
                }
            }
            Ok(Grid::new(rows))
        }

        Step::MultiplyColumn { col, factor } => {
            check_column(grid, *col)?;
            let mut rows = working_copy(grid);
            for row in rows.iter_mut().skip(1) {
                if let Some(value) = row[*col].leading_number() {
                    row[*col] = CellValue::Number(round6(value * factor));
                }
            }
            Ok(Grid::new(rows))
        }
    }
}

/// Deep copy of the rows so a step never aliases the input grid
fn working_copy(grid: &Grid) -> Vec<Row> {
    grid.rows().to_vec()
}

fn check_column(grid: &Grid, col: usize) -> Result<(), XlforgeError> {
    if col < grid.col_count() {
        Ok(())
    } else {
        Err(XlforgeError::ColumnOutOfRange {
            col,
            cols: grid.col_count(),
        })
    }
}

fn cell_at(row: &[CellValue], col: usize) -> &CellValue {
    static EMPTY: CellValue = CellValue::Empty;
    row.get(col).unwrap_or(&EMPTY)
}

/// Numbers compare numerically when both sides are numbers; everything else
/// compares by display text, case-sensitive.
fn compare_cells(a: &CellValue, b: &CellValue) -> Ordering {
    match (a.number(), b.number()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.as_text().cmp(&b.as_text()),
    }
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}
