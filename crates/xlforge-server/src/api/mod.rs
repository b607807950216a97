mod ai;
mod file;
mod health;

use axum::Router;

use crate::AppState;

/// Create the API router
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(file::router())
        .merge(ai::router())
}
