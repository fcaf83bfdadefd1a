//! Provider browsing endpoints
//!
//! Read-only views over one integration's CI system: target listing,
//! recent runs, per-target summary statistics and run logs. Targets may
//! contain slashes (Jenkins folder paths), so they travel as query
//! parameters rather than path segments.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::IntegrationRepository;
use crate::models::{RunRecord, TargetSummary};
use crate::services::providers::{client_for, ProviderClient};
use crate::utils::{AppError, AppResult};
use crate::AppState;

const DEFAULT_RUN_LIMIT: u32 = 20;
const MAX_RUN_LIMIT: u32 = 100;

async fn client_for_integration(
    state: &AppState,
    id: Uuid,
) -> AppResult<Box<dyn ProviderClient>> {
    let repo = IntegrationRepository::new(&state.db);
    let integration = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("integration {} not found", id)))?;

    if !integration.is_active {
        return Err(AppError::BadRequest(format!(
            "integration '{}' is inactive",
            integration.name
        )));
    }

    client_for(&integration)
}

/// GET /api/v1/providers/{id}/targets
pub async fn targets(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<String>>> {
    let client = client_for_integration(&state, id).await?;
    Ok(Json(client.list_targets().await?))
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    pub target: Option<String>,
    pub limit: Option<u32>,
}

/// GET /api/v1/providers/{id}/runs
pub async fn runs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<RunsQuery>,
) -> AppResult<Json<Vec<RunRecord>>> {
    let limit = query.limit.unwrap_or(DEFAULT_RUN_LIMIT).min(MAX_RUN_LIMIT);
    let client = client_for_integration(&state, id).await?;
    Ok(Json(client.recent_runs(limit, query.target.as_deref()).await?))
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub target: String,
}

/// GET /api/v1/providers/{id}/summary?target=...
pub async fn summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SummaryQuery>,
) -> AppResult<Json<TargetSummary>> {
    let client = client_for_integration(&state, id).await?;
    Ok(Json(client.target_summary(&query.target).await?))
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub target: String,
    pub run: i64,
}

/// GET /api/v1/providers/{id}/log?target=...&run=...
pub async fn log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<LogQuery>,
) -> AppResult<String> {
    let client = client_for_integration(&state, id).await?;
    client.log_text(&query.target, query.run).await
}
