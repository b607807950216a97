use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A complete AI response for one instruction.
///
/// Steps stay as raw JSON until execution; each one is decoded on its own so
/// a malformed step cannot poison the rest of the plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub steps: Vec<Value>,
    #[serde(default)]
    pub summary: String,
}

impl Plan {
    pub fn new(steps: Vec<Value>, summary: impl Into<String>) -> Self {
        Self {
            steps,
            summary: summary.into(),
        }
    }

    /// Human-readable step descriptions supplied by the model, for review UIs
    pub fn descriptions(&self) -> Vec<String> {
        self.steps
            .iter()
            .map(|step| {
                step.get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| step.get("action").and_then(Value::as_str).map(str::to_string))
                    .unwrap_or_else(|| "(unrecognized step)".to_string())
            })
            .collect()
    }
}
