//! Health probes

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "alerting_enabled": state.config.alerting.enabled,
    }))
}

/// GET /health/live
pub async fn live() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Ready once the database answers; also reports whether a scheduled
/// alert pass is currently running.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_ok = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();
    let pass_running = state.scheduler.is_running().await;

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "database": db_ok,
            "alert_pass_running": pass_running,
        })),
    )
}
