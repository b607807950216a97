use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::error::PlanParseError;
use crate::plan::Plan;

fn fence_pattern() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"```[A-Za-z]*").ok())
        .as_ref()
}

/// Concatenate the text blocks of a provider messages response
pub fn response_text(response: &Value) -> String {
    response
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Extract a plan from raw model output.
///
/// Code-fence markup is stripped; if the remainder still does not parse, the
/// outermost `{...}` span is tried.
pub fn parse_plan_response(raw: &str) -> Result<Plan, PlanParseError> {
    let stripped = match fence_pattern() {
        Some(fence) => fence.replace_all(raw, "").into_owned(),
        None => raw.to_string(),
    };
    let text = stripped.trim();

    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(PlanParseError::NoJson);
    };

    match serde_json::from_str::<Plan>(text) {
        Ok(plan) => Ok(plan),
        Err(err) if start < end => {
            tracing::debug!("Plan response needs trimming: {}", err);
            Ok(serde_json::from_str(&text[start..=end])?)
        }
        Err(err) => Err(err.into()),
    }
}
