//! Alert evaluation engine
//!
//! Runs evaluation passes over the active alert definitions: resolves each
//! alert's provider integrations, polls the latest run per target, matches
//! it against the alert's condition and hands matched candidates to the
//! dispatcher. The notification history repository is the dedup gate, so a
//! scheduled tick and a manual trigger can never double-send.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::AlertingConfig;
use crate::db::{
    AlertRepository, DbPool, IntegrationRepository, NotificationHistoryRepository,
};
use crate::models::{
    AlertDefinition, AlertEvent, AlertPassResult, NotificationCandidate, NotificationStatus,
    PassSummary, ProviderIntegration, RunOutcome, RunRecord,
};
use crate::services::dispatcher::NotificationDispatcher;
use crate::services::providers::client_for;
use crate::utils::{AppError, AppResult};

/// The alert evaluation and dispatch engine
///
/// Cheap to clone; all state is shared. The pass lock serializes
/// evaluation passes regardless of who triggers them.
#[derive(Clone)]
pub struct AlertEngine {
    pool: DbPool,
    config: AlertingConfig,
    dispatcher: Arc<NotificationDispatcher>,
    pass_lock: Arc<Mutex<()>>,
}

impl AlertEngine {
    pub fn new(
        pool: DbPool,
        config: AlertingConfig,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            pool,
            config,
            dispatcher,
            pass_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// Run a full evaluation pass, waiting for any pass in flight to finish
    pub async fn evaluate_all(&self) -> AppResult<PassSummary> {
        let _guard = self.pass_lock.lock().await;
        self.run_pass().await
    }

    /// Run a pass unless one is already in flight
    ///
    /// Used by the scheduler: an overlapping tick is skipped, not queued.
    pub async fn try_evaluate_all(&self) -> AppResult<Option<PassSummary>> {
        let Ok(_guard) = self.pass_lock.try_lock() else {
            return Ok(None);
        };
        Ok(Some(self.run_pass().await?))
    }

    async fn run_pass(&self) -> AppResult<PassSummary> {
        let started_at = Utc::now();
        let alerts = AlertRepository::new(&self.pool).get_active().await?;
        tracing::info!(alerts = alerts.len(), "Starting alert evaluation pass");

        let mut results = Vec::with_capacity(alerts.len());
        let mut notifications_sent = 0usize;

        // Alerts are evaluated sequentially; one alert's failure is
        // recorded in its result and never aborts the pass.
        for alert in &alerts {
            let result = match self.evaluate_alert(alert).await {
                Ok((matched, notified)) => {
                    notifications_sent += notified;
                    AlertPassResult {
                        alert_id: alert.id,
                        name: alert.name.clone(),
                        matched,
                        notified,
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::error!(alert = %alert.name, "Alert evaluation failed: {:#}", e);
                    AlertPassResult {
                        alert_id: alert.id,
                        name: alert.name.clone(),
                        matched: 0,
                        notified: 0,
                        error: Some(format!("{:#}", e)),
                    }
                }
            };
            results.push(result);
        }

        let summary = PassSummary {
            started_at,
            finished_at: Utc::now(),
            alerts_evaluated: alerts.len(),
            notifications_sent,
            results,
        };
        tracing::info!(
            alerts = summary.alerts_evaluated,
            sent = summary.notifications_sent,
            "Alert evaluation pass finished"
        );
        Ok(summary)
    }

    /// Evaluate one alert; returns (matched, notified) counts
    async fn evaluate_alert(&self, alert: &AlertDefinition) -> Result<(usize, usize)> {
        if alert.channels.is_empty() {
            tracing::warn!(alert = %alert.name, "Alert has no channels configured, skipping");
            return Ok((0, 0));
        }

        let integrations = self.resolve_integrations(alert).await?;
        if integrations.is_empty() {
            tracing::warn!(alert = %alert.name, "No active integration matches this alert");
            return Ok((0, 0));
        }

        let now = Utc::now();
        let since = now - Duration::minutes(alert.conditions.recent_minutes.max(1));

        let mut matched = 0usize;
        let mut notified = 0usize;

        for integration in &integrations {
            // A broken or unreachable integration yields no matches from
            // that provider; the others are still evaluated.
            match self
                .evaluate_against_integration(alert, integration, since)
                .await
            {
                Ok(candidates) => {
                    matched += candidates.len();
                    for candidate in candidates {
                        if self.claim_and_dispatch(alert, &candidate).await? {
                            notified += 1;
                        }
                    }
                }
                Err(AppError::NotConfigured(msg)) | Err(AppError::Upstream(msg)) => {
                    tracing::warn!(
                        alert = %alert.name,
                        integration = %integration.name,
                        "Skipping integration: {}",
                        msg
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok((matched, notified))
    }

    /// Select which integrations an alert evaluates against
    async fn resolve_integrations(
        &self,
        alert: &AlertDefinition,
    ) -> Result<Vec<ProviderIntegration>> {
        let repo = IntegrationRepository::new(&self.pool);

        if let Some(id) = alert.conditions.integration_id {
            return Ok(match repo.get_by_id(id).await? {
                Some(integration) if integration.is_active => vec![integration],
                Some(_) => {
                    tracing::warn!(alert = %alert.name, integration_id = %id, "Pinned integration is inactive");
                    Vec::new()
                }
                None => {
                    tracing::warn!(alert = %alert.name, integration_id = %id, "Pinned integration not found");
                    Vec::new()
                }
            });
        }

        if let Some(kind) = alert.conditions.provider {
            return repo.get_active_by_kind(kind).await;
        }

        repo.get_active().await
    }

    async fn evaluate_against_integration(
        &self,
        alert: &AlertDefinition,
        integration: &ProviderIntegration,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<NotificationCandidate>> {
        let client = client_for(integration)?;

        let targets = match alert.conditions.target {
            Some(ref target) => vec![target.clone()],
            None => client.list_targets().await?,
        };

        let mut candidates = Vec::new();
        for target in &targets {
            let Some(run) = client.latest_run(target).await? else {
                continue;
            };
            if run_matches(&run, alert.conditions.event, since) {
                candidates.push(candidate_for(alert, &run));
            }
        }
        Ok(candidates)
    }

    /// Claim the dedup slot and dispatch; returns true when dispatched
    async fn claim_and_dispatch(
        &self,
        alert: &AlertDefinition,
        candidate: &NotificationCandidate,
    ) -> Result<bool> {
        let history = NotificationHistoryRepository::new(&self.pool);
        let window = dedup_window(alert, &self.config);

        let Some(event_id) = history.claim_if_absent(alert.id, candidate, window).await? else {
            tracing::debug!(alert = %alert.name, message = %candidate.message, "Notification suppressed by dedup window");
            return Ok(false);
        };

        let outcome = self.dispatcher.dispatch(&alert.channels, candidate).await;
        let status = if outcome.any_delivered() {
            NotificationStatus::Sent
        } else {
            NotificationStatus::Failed
        };
        let error = outcome
            .error_summary()
            .or_else(|| match status {
                NotificationStatus::Failed => Some("no channel attempted delivery".to_string()),
                _ => None,
            });

        self.finalize_event(event_id, status, error.as_deref()).await;
        Ok(status == NotificationStatus::Sent)
    }

    /// History finalization failures are logged, never propagated; the
    /// notification itself already went out (or failed) by this point.
    async fn finalize_event(
        &self,
        event_id: Uuid,
        status: NotificationStatus,
        error: Option<&str>,
    ) {
        let history = NotificationHistoryRepository::new(&self.pool);
        if let Err(e) = history.finalize(event_id, status, error).await {
            tracing::error!(event_id = %event_id, "Failed to finalize notification event: {:#}", e);
        }
    }
}

/// Dedup lookback for an alert: its own window, or the configured fallback
fn dedup_window(alert: &AlertDefinition, config: &AlertingConfig) -> i64 {
    if alert.conditions.recent_minutes > 0 {
        alert.conditions.recent_minutes
    } else {
        config.dedup_window_minutes
    }
}

/// Whether a run satisfies an alert's event condition within the window
fn run_matches(run: &RunRecord, event: AlertEvent, since: DateTime<Utc>) -> bool {
    if !run.is_completed() {
        return false;
    }
    let Some(timestamp) = run.effective_timestamp() else {
        return false;
    };
    if timestamp < since {
        return false;
    }

    match event {
        AlertEvent::Failure => run.outcome == Some(RunOutcome::Failure),
        AlertEvent::Success => run.outcome == Some(RunOutcome::Success),
        AlertEvent::Completed => run.outcome.is_some(),
    }
}

fn candidate_for(alert: &AlertDefinition, run: &RunRecord) -> NotificationCandidate {
    let outcome = run.outcome.unwrap_or(RunOutcome::Unknown);
    NotificationCandidate {
        title: format!("CI alert: {}", alert.name),
        message: format!("{} #{} {}", run.target, run.number, outcome.as_str()),
        target: Some(run.target.clone()),
        run_number: Some(run.number),
        link: run.url.clone(),
    }
}
