//! Repository for alert definition access
//!
//! The alert engine only reads alert definitions; creation and editing
//! belong to the dashboard's management surface.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{AlertChannels, AlertConditions, AlertDefinition, AlertType};

/// Row returned from the alerts table
#[derive(Debug, sqlx::FromRow)]
struct AlertRow {
    id: String,
    name: String,
    alert_type: String,
    conditions: String,
    channels: String,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

/// Repository for alert definition operations
pub struct AlertRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AlertRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get all active alert definitions
    pub async fn get_active(&self) -> Result<Vec<AlertDefinition>> {
        let rows = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT id, name, alert_type, conditions, channels, is_active, created_at, updated_at
            FROM alerts
            WHERE is_active = TRUE
            ORDER BY name
            "#,
        )
        .fetch_all(self.pool)
        .await
        .context("Failed to fetch active alerts")?;

        Ok(rows.into_iter().filter_map(row_to_alert).collect())
    }

    /// Get an alert definition by ID
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<AlertDefinition>> {
        let row = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT id, name, alert_type, conditions, channels, is_active, created_at, updated_at
            FROM alerts
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to fetch alert")?;

        Ok(row.and_then(row_to_alert))
    }
}

/// Decode a row into an alert definition
///
/// Rows whose JSON columns fail to decode are dropped with a log rather
/// than failing the whole pass.
fn row_to_alert(row: AlertRow) -> Option<AlertDefinition> {
    let conditions: AlertConditions = match serde_json::from_str(&row.conditions) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(alert = %row.name, "Skipping alert with invalid conditions: {}", e);
            return None;
        }
    };
    let channels: AlertChannels = serde_json::from_str(&row.channels).unwrap_or_default();

    Some(AlertDefinition {
        id: Uuid::parse_str(&row.id).unwrap_or_default(),
        name: row.name,
        alert_type: AlertType::from_str(&row.alert_type).unwrap_or_default(),
        conditions,
        channels,
        is_active: row.is_active,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    })
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite CURRENT_TIMESTAMP format
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}
