// GET handlers: gpustat, version

use axum::{extract::State, response::IntoResponse};

use super::AppState;

/// GET /version — returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /gpustat — this host's snapshot, or `{"error": ...}`; always 200 so peers can read the reason.
pub(super) async fn gpustat_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(state.collector.collect().await)
}
