//! Repository for provider integration access
//!
//! Integrations are returned with connection parameters fully resolved.
//! The engine never persists or mutates them.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{ProviderIntegration, ProviderKind};

/// Row returned from the provider_integrations table
#[derive(Debug, sqlx::FromRow)]
struct IntegrationRow {
    id: String,
    name: String,
    kind: String,
    endpoint: String,
    username: Option<String>,
    token: Option<String>,
    is_active: bool,
}

/// Repository for provider integration operations
pub struct IntegrationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> IntegrationRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get all active integrations
    pub async fn get_active(&self) -> Result<Vec<ProviderIntegration>> {
        let rows = sqlx::query_as::<_, IntegrationRow>(
            r#"
            SELECT id, name, kind, endpoint, username, token, is_active
            FROM provider_integrations
            WHERE is_active = TRUE
            ORDER BY name
            "#,
        )
        .fetch_all(self.pool)
        .await
        .context("Failed to fetch active integrations")?;

        Ok(rows.into_iter().filter_map(row_to_integration).collect())
    }

    /// Get active integrations of one provider kind
    pub async fn get_active_by_kind(&self, kind: ProviderKind) -> Result<Vec<ProviderIntegration>> {
        let rows = sqlx::query_as::<_, IntegrationRow>(
            r#"
            SELECT id, name, kind, endpoint, username, token, is_active
            FROM provider_integrations
            WHERE is_active = TRUE AND kind = ?
            ORDER BY name
            "#,
        )
        .bind(kind.as_str())
        .fetch_all(self.pool)
        .await
        .context("Failed to fetch integrations by kind")?;

        Ok(rows.into_iter().filter_map(row_to_integration).collect())
    }

    /// Get an integration by ID (active or not)
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<ProviderIntegration>> {
        let row = sqlx::query_as::<_, IntegrationRow>(
            r#"
            SELECT id, name, kind, endpoint, username, token, is_active
            FROM provider_integrations
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to fetch integration")?;

        Ok(row.and_then(row_to_integration))
    }
}

fn row_to_integration(row: IntegrationRow) -> Option<ProviderIntegration> {
    let kind = match ProviderKind::from_str(&row.kind) {
        Some(k) => k,
        None => {
            tracing::warn!(integration = %row.name, kind = %row.kind, "Unknown provider kind, skipping");
            return None;
        }
    };

    Some(ProviderIntegration {
        id: Uuid::parse_str(&row.id).unwrap_or_default(),
        name: row.name,
        kind,
        endpoint: row.endpoint,
        username: row.username,
        token: row.token,
        is_active: row.is_active,
    })
}
