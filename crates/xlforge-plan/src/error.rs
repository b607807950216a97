use thiserror::Error;
use xlforge_core::XlforgeError;

/// Why a single plan step could not be applied
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error("step is not a JSON object")]
    NotAnObject,

    #[error("step has no action")]
    MissingAction,

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("{action}: missing required field '{field}'")]
    MissingField {
        action: &'static str,
        field: &'static str,
    },

    #[error("field '{field}' should be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field '{field}' has invalid value {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error(transparent)]
    Grid(#[from] XlforgeError),
}

/// The AI response could not be turned into a plan
#[derive(Debug, Error)]
pub enum PlanParseError {
    #[error("response contains no JSON object")]
    NoJson,

    #[error("response is not a valid plan: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
