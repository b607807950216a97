use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use xlforge_core::{Grid, WorkbookPayload};

use crate::error::AppError;
use crate::store::{FileMeta, StoreError};
use crate::AppState;

/// Workbook contents plus file metadata
#[derive(Debug, Serialize)]
pub struct FileResponse {
    #[serde(flatten)]
    pub payload: WorkbookPayload,
    #[serde(flatten)]
    pub meta: FileMeta,
}

/// Save body. Both fields are optional so a missing one is a 400, not a
/// rejection from the extractor.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub sheet_names: Option<Vec<String>>,
    pub sheets: Option<HashMap<String, Grid>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub success: bool,
    pub message: &'static str,
    pub last_modified: DateTime<Utc>,
    pub file_size: u64,
}

/// Return every sheet of the hosted workbook
async fn get_file(State(state): State<AppState>) -> Result<Json<FileResponse>, AppError> {
    let store = state.store.clone();
    let (payload, meta) = tokio::task::spawn_blocking(move || store.load())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Read(e.to_string()))?;

    Ok(Json(FileResponse { payload, meta }))
}

/// Write the edited workbook back to disk
async fn save_file(
    State(state): State<AppState>,
    body: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<Json<SaveResponse>, AppError> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let (Some(sheet_names), Some(sheets)) = (req.sheet_names, req.sheets) else {
        return Err(AppError::BadRequest(
            "Missing sheets or sheetNames in request body".to_string(),
        ));
    };
    let payload = WorkbookPayload { sheet_names, sheets };

    let store = state.store.clone();
    let meta = tokio::task::spawn_blocking(move || store.save(payload))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| match e {
            StoreError::Invalid(err) => AppError::BadRequest(err.to_string()),
            other => AppError::Save(other.to_string()),
        })?;

    Ok(Json(SaveResponse {
        success: true,
        message: "File saved successfully",
        last_modified: meta.last_modified,
        file_size: meta.file_size,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/file", get(get_file))
        .route("/save", post(save_file))
}
