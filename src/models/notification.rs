//! Notification models
//!
//! A notification event is written exactly once per dispatch attempt and is
//! never deleted by the engine. The `(alert_id, message)` pair is the dedup
//! fingerprint; the message deterministically encodes target name, run
//! number and outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a notification event
///
/// `Pending` exists only between the atomic dedup claim and the end of the
/// dispatch attempt; it is finalized exactly once to a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(NotificationStatus::Pending),
            "sent" => Some(NotificationStatus::Sent),
            "failed" => Some(NotificationStatus::Failed),
            _ => None,
        }
    }
}

/// A recorded notification, used for audit and as the dedup source of truth
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: Uuid,
    pub alert_id: Uuid,
    pub status: NotificationStatus,
    pub title: String,
    pub message: String,
    pub target: Option<String>,
    pub run_number: Option<i64>,
    pub link: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A matched condition waiting to be dispatched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationCandidate {
    pub title: String,
    /// Deterministic text: target name + run number + outcome. Doubles as
    /// the dedup fingerprint.
    pub message: String,
    pub target: Option<String>,
    pub run_number: Option<i64>,
    /// Context link back to the run in the external system
    pub link: Option<String>,
}

/// Outcome of one channel's delivery attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelOutcome {
    /// Payload was accepted by the transport
    Delivered,
    /// Channel not configured or nothing to send; not an error
    Skipped,
    /// Transport rejected or failed the delivery
    Failed(String),
}

impl ChannelOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, ChannelOutcome::Delivered)
    }
}

/// Combined result of dispatching one candidate across all channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub email: ChannelOutcome,
    pub webhook: ChannelOutcome,
}

impl DispatchOutcome {
    /// At least one channel actually delivered
    pub fn any_delivered(&self) -> bool {
        self.email.is_delivered() || self.webhook.is_delivered()
    }

    /// Every channel that was attempted failed (skips don't count)
    pub fn all_failed(&self) -> bool {
        let attempted = [&self.email, &self.webhook]
            .into_iter()
            .filter(|o| !matches!(o, ChannelOutcome::Skipped))
            .collect::<Vec<_>>();
        !attempted.is_empty() && attempted.iter().all(|o| matches!(o, ChannelOutcome::Failed(_)))
    }

    /// Collapse failures into a single error string for the history record
    pub fn error_summary(&self) -> Option<String> {
        let mut errors = Vec::new();
        if let ChannelOutcome::Failed(ref e) = self.email {
            errors.push(format!("email: {}", e));
        }
        if let ChannelOutcome::Failed(ref e) = self.webhook {
            errors.push(format!("webhook: {}", e));
        }
        if errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        }
    }
}

/// Per-alert result within an evaluation pass summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPassResult {
    pub alert_id: Uuid,
    pub name: String,
    /// How many candidate notifications matched this pass
    pub matched: usize,
    /// How many were actually dispatched (not suppressed by dedup)
    pub notified: usize,
    /// Evaluation error, if the alert as a whole failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of one full evaluation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub alerts_evaluated: usize,
    pub notifications_sent: usize,
    pub results: Vec<AlertPassResult>,
}

/// Request body for the test-notification endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestNotificationRequest {
    pub channels: crate::models::alert::AlertChannels,
    pub title: Option<String>,
    pub message: Option<String>,
}

/// Response for the test-notification endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestNotificationResponse {
    pub success: bool,
    pub outcome: DispatchOutcome,
}
