use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use xlforge_core::Grid;
use xlforge_plan::Plan;

use crate::ai::AiClient;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub instruction: String,
    /// Active sheet as the editor currently shows it
    #[serde(default)]
    pub rows: Grid,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    #[serde(flatten)]
    pub plan: Plan,
    pub descriptions: Vec<String>,
}

fn client(state: &AppState) -> Result<Arc<AiClient>, AppError> {
    state.ai.clone().ok_or(AppError::AiNotConfigured)
}

/// Pass a messages request through to the provider with the server key
async fn proxy_messages(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let ai = client(&state)?;
    let (status, body) = ai.forward(&body).await?;
    Ok((status, Json(body)))
}

/// Turn an instruction into a reviewable plan for the given rows
async fn create_plan(
    State(state): State<AppState>,
    Json(req): Json<PlanRequest>,
) -> Result<Json<PlanResponse>, AppError> {
    let instruction = req.instruction.trim();
    if instruction.is_empty() {
        return Err(AppError::BadRequest("Instruction is empty".to_string()));
    }
    let ai = client(&state)?;

    let plan = ai.plan(&req.rows, instruction).await?;
    Ok(Json(PlanResponse {
        descriptions: plan.descriptions(),
        plan,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/claude", post(proxy_messages))
        .route("/plan", post(create_plan))
}
