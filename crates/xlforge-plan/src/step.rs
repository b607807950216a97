//! Typed edit steps and their decoding from untrusted JSON.
//!
//! Plans arrive from an external model, so every field is checked here
//! before the interpreter sees it. Optional fields fall back to the same
//! defaults the editor has always used; required fields that are missing or
//! of the wrong type turn the whole step into a [`StepError`].

use serde_json::{Map, Value};
use xlforge_core::CellValue;

use crate::error::StepError;

/// Where `add_row` inserts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPosition {
    End,
    Index(usize),
}

/// Which columns `replace_all` touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnTarget {
    All,
    Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Row predicate used by `filter_delete`: rows matching it are removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Equals,
    Empty,
    NotEmpty,
    Contains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseTransform {
    Uppercase,
    Lowercase,
}

/// One validated edit operation
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    SetCell {
        row: usize,
        col: usize,
        value: CellValue,
    },
    AddRow {
        position: RowPosition,
        values: Option<Vec<CellValue>>,
    },
    DeleteRow {
        row: usize,
    },
    AddColumn {
        header: CellValue,
        fill: CellValue,
        values: Option<Vec<CellValue>>,
    },
    DeleteColumn {
        col: usize,
    },
    RenameColumn {
        col: usize,
        new_name: CellValue,
    },
    Sort {
        col: usize,
        direction: SortDirection,
        has_header: bool,
    },
    FilterDelete {
        col: usize,
        operator: FilterOperator,
        value: String,
        has_header: bool,
    },
    ReplaceAll {
        target: ColumnTarget,
        find: Option<String>,
        replace: String,
        transform: Option<CaseTransform>,
    },
    MultiplyColumn {
        col: usize,
        factor: f64,
    },
}

impl Step {
    /// Wire name of the action
    pub fn action(&self) -> &'static str {
        match self {
            Step::SetCell { .. } => "set_cell",
            Step::AddRow { .. } => "add_row",
            Step::DeleteRow { .. } => "delete_row",
            Step::AddColumn { .. } => "add_column",
            Step::DeleteColumn { .. } => "delete_column",
            Step::RenameColumn { .. } => "rename_column",
            Step::Sort { .. } => "sort",
            Step::FilterDelete { .. } => "filter_delete",
            Step::ReplaceAll { .. } => "replace_all",
            Step::MultiplyColumn { .. } => "multiply_column",
        }
    }

    /// Decode and validate one step object
    pub fn from_json(value: &Value) -> Result<Step, StepError> {
        let object = value.as_object().ok_or(StepError::NotAnObject)?;
        let action = match object.get("action") {
            Some(Value::String(action)) => action.as_str(),
            Some(_) => {
                return Err(StepError::WrongType {
                    field: "action",
                    expected: "a string",
                })
            }
            None => return Err(StepError::MissingAction),
        };

        match action {
            "set_cell" => {
                let f = Fields::new(object, "set_cell");
                Ok(Step::SetCell {
                    row: f.index("row")?,
                    col: f.index("col")?,
                    value: f.cell("value")?.unwrap_or_default(),
                })
            }
            "add_row" => {
                let f = Fields::new(object, "add_row");
                Ok(Step::AddRow {
                    position: f.position("position")?,
                    values: f.cells("values")?,
                })
            }
            "delete_row" => {
                let f = Fields::new(object, "delete_row");
                Ok(Step::DeleteRow {
                    row: f.index("row")?,
                })
            }
            "add_column" => {
                let f = Fields::new(object, "add_column");
                Ok(Step::AddColumn {
                    header: f
                        .cell("header")?
                        .filter(|h| !h.is_empty())
                        .unwrap_or_else(|| CellValue::text("New Column")),
                    fill: f.cell("fill")?.unwrap_or_default(),
                    values: f.cells("values")?,
                })
            }
            "delete_column" => {
                let f = Fields::new(object, "delete_column");
                Ok(Step::DeleteColumn {
                    col: f.index("col")?,
                })
            }
            "rename_column" => {
                let f = Fields::new(object, "rename_column");
                let new_name = f
                    .cell_any(&["newName", "new_name"])?
                    .ok_or(StepError::MissingField {
                        action: "rename_column",
                        field: "newName",
                    })?;
                Ok(Step::RenameColumn {
                    col: f.index("col")?,
                    new_name,
                })
            }
            "sort" => {
                let f = Fields::new(object, "sort");
                let direction = match f.text("direction")? {
                    Some(d) if d.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                    _ => SortDirection::Asc,
                };
                Ok(Step::Sort {
                    col: f.index("col")?,
                    direction,
                    has_header: f.has_header()?,
                })
            }
            "filter_delete" => {
                let f = Fields::new(object, "filter_delete");
                let operator = match f.text("operator")?.as_deref() {
                    Some("equals") => FilterOperator::Equals,
                    Some("empty") => FilterOperator::Empty,
                    Some("not_empty") => FilterOperator::NotEmpty,
                    Some("contains") => FilterOperator::Contains,
                    Some(other) => {
                        return Err(StepError::InvalidValue {
                            field: "operator",
                            value: format!("'{}'", other),
                        })
                    }
                    None => {
                        return Err(StepError::MissingField {
                            action: "filter_delete",
                            field: "operator",
                        })
                    }
                };
                let value = f.cell("value")?;
                if operator == FilterOperator::Contains && value.is_none() {
                    return Err(StepError::MissingField {
                        action: "filter_delete",
                        field: "value",
                    });
                }
                Ok(Step::FilterDelete {
                    col: f.index("col")?,
                    operator,
                    value: value.map(|v| v.as_text()).unwrap_or_default(),
                    has_header: f.has_header()?,
                })
            }
            "replace_all" => {
                let f = Fields::new(object, "replace_all");
                let target = match f.signed("col")? {
                    None | Some(-1) => ColumnTarget::All,
                    Some(col) if col >= 0 => ColumnTarget::Index(col as usize),
                    Some(col) => {
                        return Err(StepError::InvalidValue {
                            field: "col",
                            value: col.to_string(),
                        })
                    }
                };
                let transform = match f.text("transform")? {
                    Some(t) if t.eq_ignore_ascii_case("uppercase") => Some(CaseTransform::Uppercase),
                    Some(t) if t.eq_ignore_ascii_case("lowercase") => Some(CaseTransform::Lowercase),
                    _ => None,
                };
                Ok(Step::ReplaceAll {
                    target,
                    find: f.cell("find")?.map(|v| v.as_text()),
                    replace: f.cell("replace")?.map(|v| v.as_text()).unwrap_or_default(),
                    transform,
                })
            }
            "multiply_column" => {
                let f = Fields::new(object, "multiply_column");
                Ok(Step::MultiplyColumn {
                    col: f.index("col")?,
                    factor: f.number("factor")?,
                })
            }
            other => Err(StepError::UnknownAction(other.to_string())),
        }
    }
}

/// Typed accessors over a step object
struct Fields<'a> {
    object: &'a Map<String, Value>,
    action: &'static str,
}

impl<'a> Fields<'a> {
    fn new(object: &'a Map<String, Value>, action: &'static str) -> Self {
        Self { object, action }
    }

    /// Look a field up, treating JSON null as absent
    fn get(&self, field: &str) -> Option<&'a Value> {
        self.object.get(field).filter(|v| !v.is_null())
    }

    fn missing(&self, field: &'static str) -> StepError {
        StepError::MissingField {
            action: self.action,
            field,
        }
    }

    /// Optional signed integer; accepts integral numbers and numeric strings
    fn signed(&self, field: &'static str) -> Result<Option<i64>, StepError> {
        let Some(value) = self.get(field) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed.map(Some).ok_or(StepError::WrongType {
            field,
            expected: "an integer",
        })
    }

    /// Required zero-based index
    fn index(&self, field: &'static str) -> Result<usize, StepError> {
        let value = self.signed(field)?.ok_or_else(|| self.missing(field))?;
        usize::try_from(value).map_err(|_| StepError::InvalidValue {
            field,
            value: value.to_string(),
        })
    }

    /// Required finite number; accepts numeric strings
    fn number(&self, field: &'static str) -> Result<f64, StepError> {
        let value = self.get(field).ok_or_else(|| self.missing(field))?;
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(n) if n.is_finite() => Ok(n),
            Some(n) => Err(StepError::InvalidValue {
                field,
                value: n.to_string(),
            }),
            None => Err(StepError::WrongType {
                field,
                expected: "a number",
            }),
        }
    }

    fn text(&self, field: &'static str) -> Result<Option<String>, StepError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(StepError::WrongType {
                field,
                expected: "a string",
            }),
        }
    }

    /// Optional scalar cell value
    fn cell(&self, field: &'static str) -> Result<Option<CellValue>, StepError> {
        self.get(field).map(|v| scalar(field, v)).transpose()
    }

    fn cell_any(&self, fields: &[&'static str]) -> Result<Option<CellValue>, StepError> {
        for &field in fields {
            if let Some(value) = self.cell(field)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Optional array of scalar cell values
    fn cells(&self, field: &'static str) -> Result<Option<Vec<CellValue>>, StepError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| scalar(field, v))
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(_) => Err(StepError::WrongType {
                field,
                expected: "an array",
            }),
        }
    }

    /// `"end"`, an index, or absent (end)
    fn position(&self, field: &'static str) -> Result<RowPosition, StepError> {
        match self.get(field) {
            None => Ok(RowPosition::End),
            Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("end") => Ok(RowPosition::End),
            Some(_) => self.index(field).map(RowPosition::Index),
        }
    }

    /// `hasHeader`, defaulting to true
    fn has_header(&self) -> Result<bool, StepError> {
        match self.get("hasHeader").or_else(|| self.get("has_header")) {
            None => Ok(true),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(StepError::WrongType {
                field: "hasHeader",
                expected: "a boolean",
            }),
        }
    }
}

fn scalar(field: &'static str, value: &Value) -> Result<CellValue, StepError> {
    match value {
        Value::Null => Ok(CellValue::Empty),
        Value::String(s) => Ok(CellValue::text(s.as_str())),
        Value::Number(n) => n.as_f64().map(CellValue::Number).ok_or(StepError::WrongType {
            field,
            expected: "a finite number",
        }),
        Value::Bool(b) => Ok(CellValue::text(if *b { "TRUE" } else { "FALSE" })),
        Value::Array(_) | Value::Object(_) => Err(StepError::WrongType {
            field,
            expected: "a string or number",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_set_cell() {
        let step = Step::from_json(&json!({"action": "set_cell", "row": 2, "col": "1", "value": 5})).unwrap();
        assert_eq!(
            step,
            Step::SetCell {
                row: 2,
                col: 1,
                value: CellValue::Number(5.0)
            }
        );
    }

    #[test]
    fn test_decode_defaults() {
        let step = Step::from_json(&json!({"action": "add_column", "description": "x"})).unwrap();
        assert_eq!(
            step,
            Step::AddColumn {
                header: CellValue::text("New Column"),
                fill: CellValue::Empty,
                values: None
            }
        );

        let step = Step::from_json(&json!({"action": "sort", "col": 0})).unwrap();
        assert_eq!(
            step,
            Step::Sort {
                col: 0,
                direction: SortDirection::Asc,
                has_header: true
            }
        );

        let step = Step::from_json(&json!({"action": "add_row", "position": "end"})).unwrap();
        assert_eq!(
            step,
            Step::AddRow {
                position: RowPosition::End,
                values: None
            }
        );
    }

    #[test]
    fn test_decode_replace_all_targets() {
        let all = Step::from_json(&json!({"action": "replace_all", "col": -1, "find": "a", "replace": "b"})).unwrap();
        assert!(matches!(all, Step::ReplaceAll { target: ColumnTarget::All, .. }));

        let bad = Step::from_json(&json!({"action": "replace_all", "col": -3}));
        assert!(matches!(bad, Err(StepError::InvalidValue { field: "col", .. })));

        let upper = Step::from_json(&json!({"action": "replace_all", "col": 2, "transform": "uppercase"})).unwrap();
        assert_eq!(
            upper,
            Step::ReplaceAll {
                target: ColumnTarget::Index(2),
                find: None,
                replace: String::new(),
                transform: Some(CaseTransform::Uppercase)
            }
        );
    }

    #[test]
    fn test_malformed_steps() {
        assert_eq!(Step::from_json(&json!("delete_row")), Err(StepError::NotAnObject));
        assert_eq!(Step::from_json(&json!({"row": 1})), Err(StepError::MissingAction));
        assert_eq!(
            Step::from_json(&json!({"action": "merge_cells"})),
            Err(StepError::UnknownAction("merge_cells".to_string()))
        );
        assert_eq!(
            Step::from_json(&json!({"action": "delete_row"})),
            Err(StepError::MissingField {
                action: "delete_row",
                field: "row"
            })
        );
        assert!(matches!(
            Step::from_json(&json!({"action": "delete_row", "row": -1})),
            Err(StepError::InvalidValue { field: "row", .. })
        ));
        assert!(matches!(
            Step::from_json(&json!({"action": "delete_row", "row": 1.5})),
            Err(StepError::WrongType { field: "row", .. })
        ));
        assert!(matches!(
            Step::from_json(&json!({"action": "multiply_column", "col": 1, "factor": "lots"})),
            Err(StepError::WrongType { field: "factor", .. })
        ));
        assert!(matches!(
            Step::from_json(&json!({"action": "filter_delete", "col": 1, "operator": "regex"})),
            Err(StepError::InvalidValue { field: "operator", .. })
        ));
        assert!(matches!(
            Step::from_json(&json!({"action": "filter_delete", "col": 1, "operator": "contains"})),
            Err(StepError::MissingField { field: "value", .. })
        ));
    }

    #[test]
    fn test_error_messages_are_readable() {
        let err = Step::from_json(&json!({"action": "rename_column", "col": 0})).unwrap_err();
        assert_eq!(err.to_string(), "rename_column: missing required field 'newName'");
    }
}
