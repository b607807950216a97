pub mod ai;
pub mod api;
pub mod config;
pub mod error;
pub mod store;

use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::ai::AiClient;
use crate::config::Config;
use crate::store::WorkbookStore;

/// JSON bodies carry whole workbooks
pub const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<WorkbookStore>,
    pub ai: Option<Arc<AiClient>>,
}

/// Build the application with all layers
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api::router())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the server with the given configuration
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let store = Arc::new(WorkbookStore::new(
        &config.data_dir,
        &config.excel_file,
        config.max_backups,
    ));
    store.ensure_exists()?;

    let ai = AiClient::from_config(&config.ai)?.map(Arc::new);
    if ai.is_none() {
        tracing::warn!("ANTHROPIC_API_KEY is not set; AI endpoints are disabled");
    }

    let state = AppState { store, ai };
    let app = app(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("XL-Forge server listening on {}", addr);
    tracing::info!("Excel file: {}", config.file_path().display());

    axum::serve(listener, app).await?;

    Ok(())
}
