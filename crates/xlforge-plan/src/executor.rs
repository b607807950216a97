use serde::Serialize;
use serde_json::Value;
use std::fmt;
use xlforge_core::Grid;
use xlforge_history::HistoryManager;

use crate::interpreter::apply_step;
use crate::plan::Plan;
use crate::step::Step;

/// A step that was skipped
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepFailure {
    /// Zero-based position in the plan
    pub index: usize,
    /// Raw action name, when the step had one
    pub action: Option<String>,
    pub message: String,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            Some(action) => write!(f, "Step {} ({}): {}", self.index + 1, action, self.message),
            None => write!(f, "Step {}: {}", self.index + 1, self.message),
        }
    }
}

/// Result of running steps against a grid
#[derive(Debug, Clone, PartialEq)]
pub struct PlanOutcome {
    pub grid: Grid,
    pub applied: usize,
    pub failures: Vec<StepFailure>,
}

/// What the caller shows after a plan was committed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    pub summary: String,
    pub total: usize,
    pub applied: usize,
    pub failures: Vec<StepFailure>,
    /// The grid changed between prompt and apply
    pub stale: bool,
}

/// Run steps in order, threading the grid through each one.
///
/// A failing step is skipped: the grid stays as it was before that step and
/// execution continues with the next one.
pub fn execute_steps(grid: &Grid, steps: &[Value]) -> PlanOutcome {
    let mut current = grid.clone();
    let mut applied = 0;
    let mut failures = Vec::new();

    for (index, raw) in steps.iter().enumerate() {
        match Step::from_json(raw).and_then(|step| apply_step(&current, &step)) {
            Ok(next) => {
                current = next;
                applied += 1;
            }
            Err(err) => {
                let action = raw.get("action").and_then(Value::as_str).map(str::to_string);
                tracing::warn!(step = index, action = ?action, error = %err, "Skipping plan step");
                failures.push(StepFailure {
                    index,
                    action,
                    message: err.to_string(),
                });
            }
        }
    }

    PlanOutcome {
        grid: current,
        applied,
        failures,
    }
}

/// Execute a plan against `current` and commit the result as one undo unit.
///
/// The grid as it was before the plan is recorded once, whatever the number
/// of steps that succeeded.
pub fn apply_plan(current: &mut Grid, history: &mut HistoryManager, plan: &Plan) -> PlanReport {
    let outcome = execute_steps(current, &plan.steps);
    let before = std::mem::replace(current, outcome.grid);

    let label = if plan.summary.trim().is_empty() {
        "Apply plan".to_string()
    } else {
        format!("Apply plan: {}", plan.summary.trim())
    };
    history.record(before, label);

    tracing::info!(
        total = plan.steps.len(),
        applied = outcome.applied,
        failed = outcome.failures.len(),
        "Applied plan"
    );

    PlanReport {
        summary: plan.summary.clone(),
        total: plan.steps.len(),
        applied: outcome.applied,
        failures: outcome.failures,
        stale: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use xlforge_core::CellValue;

    fn five_rows() -> Grid {
        Grid::from_strs(&[
            &["Name", "Qty"],
            &["a", "1"],
            &["b", "2"],
            &["c", "3"],
            &["d", "4"],
        ])
    }

    #[test]
    fn test_malformed_step_is_isolated() {
        let steps = vec![
            json!({"action": "add_column", "header": "Status", "fill": "Pending"}),
            json!({"action": "delete_row", "row": 999}),
            json!({"action": "delete_row", "row": 1}),
            json!({"action": "multiply_column", "col": 1, "factor": 2}),
        ];
        let outcome = execute_steps(&five_rows(), &steps);

        assert_eq!(outcome.applied, 3);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].index, 1);
        assert_eq!(outcome.failures[0].action.as_deref(), Some("delete_row"));
        assert_eq!(outcome.grid.shape().rows, 4);
        assert_eq!(outcome.grid.shape().cols, 3);
        assert_eq!(outcome.grid.get(1, 1), Some(&CellValue::Number(4.0)));
        assert_eq!(outcome.grid.get(1, 2), Some(&CellValue::text("Pending")));
    }

    #[test]
    fn test_steps_past_sheet_limit_fail_alone() {
        let steps = vec![
            json!({"action": "set_cell", "row": 1_000_000_000_000i64, "col": 0, "value": "x"}),
            json!({"action": "rename_column", "col": 1_000_000_000_000i64, "newName": "X"}),
            json!({"action": "rename_column", "col": 0, "newName": "Item"}),
        ];
        let outcome = execute_steps(&five_rows(), &steps);

        assert_eq!(outcome.applied, 1);
        let failed: Vec<usize> = outcome.failures.iter().map(|f| f.index).collect();
        assert_eq!(failed, vec![0, 1]);
        assert_eq!(outcome.grid.shape().rows, 5);
        assert_eq!(outcome.grid.shape().cols, 2);
        assert_eq!(outcome.grid.get(0, 0), Some(&CellValue::text("Item")));
    }

    #[test]
    fn test_steps_see_previous_output() {
        let steps = vec![
            json!({"action": "add_row", "values": ["e", "5"]}),
            json!({"action": "sort", "col": 0, "direction": "desc"}),
        ];
        let outcome = execute_steps(&five_rows(), &steps);
        assert_eq!(outcome.grid.get(1, 0), Some(&CellValue::text("e")));
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_unknown_and_non_object_steps_reported() {
        let steps = vec![json!({"action": "format_cells"}), json!("oops"), json!({"col": 1})];
        let outcome = execute_steps(&five_rows(), &steps);

        assert_eq!(outcome.applied, 0);
        assert_eq!(outcome.grid, five_rows());
        let messages: Vec<String> = outcome.failures.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "Step 1 (format_cells): unknown action 'format_cells'",
                "Step 2: step is not a JSON object",
                "Step 3: step has no action",
            ]
        );
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut grid = Grid::from_strs(&[&["Name", "Age"], &["Bob", "30"]]);
        let mut history = HistoryManager::new(10);
        let plan = Plan::new(
            vec![
                json!({"action": "add_column", "header": "Status", "fill": "Pending"}),
                json!({"action": "rename_column", "col": 0, "newName": "ID"}),
            ],
            "Add status and rename",
        );

        let report = apply_plan(&mut grid, &mut history, &plan);

        assert_eq!(
            grid,
            Grid::from_strs(&[&["ID", "Age", "Status"], &["Bob", "30", "Pending"]])
        );
        assert_eq!(report.applied, 2);
        assert_eq!(report.total, 2);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_plan_is_single_undo_unit() {
        let original = five_rows();
        let mut grid = original.clone();
        let mut history = HistoryManager::new(10);
        let plan = Plan::new(
            vec![
                json!({"action": "delete_row", "row": 1}),
                json!({"action": "delete_row", "row": 1}),
                json!({"action": "set_cell", "row": 0, "col": 0, "value": "Item"}),
            ],
            "",
        );

        apply_plan(&mut grid, &mut history, &plan);
        let applied = grid.clone();
        assert_eq!(history.undo_count(), 1);
        assert_eq!(history.undo_description(), Some("Apply plan"));

        assert!(history.undo(&mut grid));
        assert_eq!(grid, original);
        assert!(history.redo(&mut grid));
        assert_eq!(grid, applied);
    }

    #[test]
    fn test_all_failed_plan_still_recorded() {
        let mut grid = five_rows();
        let mut history = HistoryManager::new(10);
        let plan = Plan::new(vec![json!({"action": "nope"})], "noop");

        let report = apply_plan(&mut grid, &mut history, &plan);
        assert_eq!(report.applied, 0);
        assert_eq!(history.undo_count(), 1);
        assert_eq!(grid, five_rows());
    }
}
