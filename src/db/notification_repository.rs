//! Repository for the notification event log
//!
//! The log is append-only: the engine claims an event atomically before
//! dispatch (which is also the dedup gate), finalizes it exactly once to a
//! terminal status, and never deletes or rewrites anything else.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{NotificationCandidate, NotificationEvent, NotificationStatus};

/// Row returned from the notification_events table
#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: String,
    alert_id: String,
    status: String,
    title: String,
    message: String,
    target: Option<String>,
    run_number: Option<i64>,
    link: Option<String>,
    error: Option<String>,
    created_at: String,
}

/// Repository for notification history operations
pub struct NotificationHistoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> NotificationHistoryRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Atomically claim a notification slot for a candidate
    ///
    /// Inserts a pending event unless an event with the same
    /// `(alert_id, message)` fingerprint was recorded within the lookback
    /// window and is pending or sent. The check and the insert are one
    /// statement, so a concurrent manual trigger and scheduled tick cannot
    /// both claim the same fingerprint.
    ///
    /// Returns the claimed event ID, or `None` when suppressed.
    pub async fn claim_if_absent(
        &self,
        alert_id: Uuid,
        candidate: &NotificationCandidate,
        window_minutes: i64,
    ) -> Result<Option<Uuid>> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let since = now - Duration::minutes(window_minutes);

        let result = sqlx::query(
            r#"
            INSERT INTO notification_events
                (id, alert_id, status, title, message, target, run_number, link, created_at)
            SELECT ?, ?, 'pending', ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM notification_events
                WHERE alert_id = ?
                  AND message = ?
                  AND status IN ('pending', 'sent')
                  AND created_at >= ?
            )
            "#,
        )
        .bind(id.to_string())
        .bind(alert_id.to_string())
        .bind(&candidate.title)
        .bind(&candidate.message)
        .bind(&candidate.target)
        .bind(candidate.run_number)
        .bind(&candidate.link)
        .bind(now.to_rfc3339())
        .bind(alert_id.to_string())
        .bind(&candidate.message)
        .bind(since.to_rfc3339())
        .execute(self.pool)
        .await
        .context("Failed to claim notification event")?;

        if result.rows_affected() > 0 {
            Ok(Some(id))
        } else {
            Ok(None)
        }
    }

    /// Finalize a claimed event to a terminal status
    ///
    /// Only pending events can be finalized; terminal events stay immutable.
    pub async fn finalize(
        &self,
        id: Uuid,
        status: NotificationStatus,
        error: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE notification_events
            SET status = ?, error = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(status.as_str())
        .bind(error)
        .bind(id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to finalize notification event")?;

        Ok(())
    }

    /// Get the most recent notification events, newest first
    pub async fn recent(&self, limit: u32) -> Result<Vec<NotificationEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, alert_id, status, title, message, target, run_number, link, error, created_at
            FROM notification_events
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await
        .context("Failed to fetch notification events")?;

        Ok(rows.into_iter().map(row_to_event).collect())
    }

    /// Get events recorded for one alert, newest first
    pub async fn recent_for_alert(
        &self,
        alert_id: Uuid,
        limit: u32,
    ) -> Result<Vec<NotificationEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, alert_id, status, title, message, target, run_number, link, error, created_at
            FROM notification_events
            WHERE alert_id = ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(alert_id.to_string())
        .bind(limit)
        .fetch_all(self.pool)
        .await
        .context("Failed to fetch notification events for alert")?;

        Ok(rows.into_iter().map(row_to_event).collect())
    }
}

fn row_to_event(row: EventRow) -> NotificationEvent {
    NotificationEvent {
        id: Uuid::parse_str(&row.id).unwrap_or_default(),
        alert_id: Uuid::parse_str(&row.alert_id).unwrap_or_default(),
        status: NotificationStatus::from_str(&row.status).unwrap_or(NotificationStatus::Failed),
        title: row.title,
        message: row.message,
        target: row.target,
        run_number: row.run_number,
        link: row.link,
        error: row.error,
        created_at: DateTime::parse_from_rfc3339(&row.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    }
}
