//! HTTP API
//!
//! JSON endpoints under `/api/v1` plus health probes. Routing only; the
//! handlers live in their resource modules.

pub mod alerting;
pub mod health;
pub mod providers;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

/// Build the full application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .route("/api/v1/alerting/evaluate", post(alerting::evaluate))
        .route(
            "/api/v1/alerting/test-notification",
            post(alerting::test_notification),
        )
        .route("/api/v1/alerting/history", get(alerting::history))
        .route("/api/v1/providers/{id}/targets", get(providers::targets))
        .route("/api/v1/providers/{id}/runs", get(providers::runs))
        .route("/api/v1/providers/{id}/summary", get(providers::summary))
        .route("/api/v1/providers/{id}/log", get(providers::log))
        .with_state(state)
}
