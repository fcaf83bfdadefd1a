//! Alerting endpoints
//!
//! On-demand evaluation, channel testing and notification history.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{AlertRepository, NotificationHistoryRepository};
use crate::models::{
    NotificationEvent, PassSummary, TestNotificationRequest, TestNotificationResponse,
};
use crate::utils::{AppError, AppResult};
use crate::AppState;

const DEFAULT_HISTORY_LIMIT: u32 = 50;
const MAX_HISTORY_LIMIT: u32 = 500;

/// POST /api/v1/alerting/evaluate
///
/// Runs a full evaluation pass immediately. If a scheduled pass is in
/// flight, this waits for it instead of overlapping.
pub async fn evaluate(State(state): State<AppState>) -> AppResult<Json<PassSummary>> {
    let summary = state.engine.evaluate_all().await?;
    Ok(Json(summary))
}

/// POST /api/v1/alerting/test-notification
///
/// Dispatches a synthetic notification through the supplied channels.
/// Nothing is recorded in history and the dedup window is not consulted.
pub async fn test_notification(
    State(state): State<AppState>,
    Json(request): Json<TestNotificationRequest>,
) -> AppResult<Json<TestNotificationResponse>> {
    if request.channels.is_empty() {
        return Err(AppError::BadRequest(
            "at least one channel must be provided".to_string(),
        ));
    }

    let outcome = state
        .engine
        .dispatcher()
        .send_test(&request.channels, request.title, request.message)
        .await;

    Ok(Json(TestNotificationResponse {
        success: outcome.any_delivered(),
        outcome,
    }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
    pub alert_id: Option<Uuid>,
}

/// GET /api/v1/alerting/history
pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<NotificationEvent>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);

    let repo = NotificationHistoryRepository::new(&state.db);
    let events = match query.alert_id {
        Some(alert_id) => {
            AlertRepository::new(&state.db)
                .get_by_id(alert_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("alert {} not found", alert_id)))?;
            repo.recent_for_alert(alert_id, limit).await?
        }
        None => repo.recent(limit).await?,
    };

    Ok(Json(events))
}
