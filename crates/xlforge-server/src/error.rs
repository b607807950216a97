use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use xlforge_plan::PlanParseError;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Could not read Excel file: {0}")]
    Read(String),

    #[error("Could not save file: {0}")]
    Save(String),

    #[error("ANTHROPIC_API_KEY is not set on the server")]
    AiNotConfigured,

    #[error("AI request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("AI provider returned {status}")]
    UpstreamStatus { status: StatusCode, body: serde_json::Value },

    #[error("Could not read a plan from the AI response: {0}")]
    Plan(#[from] PlanParseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Read(msg) | AppError::Save(msg) => {
                tracing::error!("Workbook file error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::AiNotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(e) => {
                tracing::error!("AI request error: {:?}", e);
                StatusCode::BAD_GATEWAY
            }
            AppError::UpstreamStatus { status, body } => {
                tracing::error!("AI provider error {}: {}", status, body);
                return (*status, Json(body.clone())).into_response();
            }
            AppError::Plan(e) => {
                tracing::warn!("Unusable AI response: {}", e);
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
