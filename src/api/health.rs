use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::api::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Ready once the cache database answers. A server running without a cache is
/// always ready.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let Some(cache) = state.orchestrator.loader().cache() else {
        return (StatusCode::OK, Json(json!({"status": "ready", "cache": "disabled"})));
    };
    match sqlx::query("SELECT 1").execute(cache.pool()).await {
        Ok(_) => (StatusCode::OK, Json(json!({"status": "ready", "cache": "ok"}))),
        Err(e) => {
            tracing::warn!(error = %e, "Cache database not ready");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unavailable", "cache": e.to_string()})),
            )
        }
    }
}
