//! Background alert scheduler
//!
//! Ticks once a minute and runs an evaluation pass whenever the configured
//! cron expression fired within the last tick. Scheduler state is explicit:
//! a pass is either idle or running, and a tick that lands while a pass is
//! running is skipped rather than queued.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use cron::Schedule;
use tokio::sync::RwLock;

use crate::config::AlertingConfig;
use crate::services::evaluator::AlertEngine;

const TICK_SECS: u64 = 60;

/// Shared scheduler state, visible to health endpoints
#[derive(Clone, Default)]
pub struct AlertSchedulerState {
    running: Arc<RwLock<bool>>,
}

impl AlertSchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a scheduled pass is currently running
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    async fn set_running(&self, value: bool) {
        *self.running.write().await = value;
    }
}

/// Validate a cron expression without building a scheduler
pub fn validate_cron_expression(expression: &str) -> Result<(), String> {
    Schedule::from_str(expression)
        .map(|_| ())
        .map_err(|e| format!("invalid cron expression '{}': {}", expression, e))
}

/// Spawn the background evaluation loop
///
/// Returns the shared state handle. The loop runs until the process exits.
pub fn start_alert_scheduler(engine: AlertEngine, config: &AlertingConfig) -> AlertSchedulerState {
    let state = AlertSchedulerState::new();

    let schedule = match Schedule::from_str(&config.schedule) {
        Ok(s) => s,
        Err(e) => {
            // Config validation checks this at startup; a broken expression
            // here means env overrides bypassed it.
            tracing::error!(schedule = %config.schedule, "Alert scheduler disabled: {}", e);
            return state;
        }
    };

    tracing::info!(schedule = %config.schedule, "Alert scheduler started");

    let loop_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(TICK_SECS));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            if !is_due(&schedule) {
                continue;
            }

            loop_state.set_running(true).await;
            match engine.try_evaluate_all().await {
                Ok(Some(summary)) => {
                    tracing::debug!(
                        alerts = summary.alerts_evaluated,
                        sent = summary.notifications_sent,
                        "Scheduled alert pass complete"
                    );
                }
                Ok(None) => {
                    tracing::warn!("Skipping scheduled alert pass, previous pass still running");
                }
                Err(e) => {
                    tracing::error!("Scheduled alert pass failed: {}", e);
                }
            }
            loop_state.set_running(false).await;
        }
    });

    state
}

/// Whether the schedule fired within the last tick interval
fn is_due(schedule: &Schedule) -> bool {
    let now = Utc::now();
    schedule
        .after(&(now - Duration::seconds(TICK_SECS as i64)))
        .next()
        .map(|fire_time| fire_time <= now)
        .unwrap_or(false)
}
