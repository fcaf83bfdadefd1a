//! Alert definition models
//!
//! An alert definition is a persisted rule describing the condition under
//! which, and the channels through which, a notification should fire. The
//! alert engine treats these as read-only; they are created and edited by
//! the dashboard's management surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::provider::ProviderKind;

/// Category tag for an alert definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    BuildFailure,
    BuildSuccess,
    BuildCompleted,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::BuildFailure => "build_failure",
            AlertType::BuildSuccess => "build_success",
            AlertType::BuildCompleted => "build_completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "build_failure" => Some(AlertType::BuildFailure),
            "build_success" => Some(AlertType::BuildSuccess),
            "build_completed" => Some(AlertType::BuildCompleted),
            _ => None,
        }
    }
}

impl Default for AlertType {
    fn default() -> Self {
        AlertType::BuildFailure
    }
}

/// Which run outcome an alert condition matches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertEvent {
    /// A terminal failing outcome
    Failure,
    /// A terminal successful outcome
    Success,
    /// Any terminal outcome
    Completed,
}

impl AlertEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertEvent::Failure => "FAILURE",
            AlertEvent::Success => "SUCCESS",
            AlertEvent::Completed => "COMPLETED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "FAILURE" => Some(AlertEvent::Failure),
            "SUCCESS" => Some(AlertEvent::Success),
            "COMPLETED" => Some(AlertEvent::Completed),
            _ => None,
        }
    }
}

/// Structured conditions of an alert definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConditions {
    /// Run event the alert fires on
    pub event: AlertEvent,
    /// Time window in minutes; runs older than this are ignored so stale
    /// history is not re-surfaced on every pass. Also the dedup lookback.
    #[serde(default = "default_recent_minutes")]
    pub recent_minutes: i64,
    /// Restrict evaluation to one provider kind; when unset, every
    /// configured provider kind is evaluated independently
    #[serde(default)]
    pub provider: Option<ProviderKind>,
    /// Restrict evaluation to one specific integration
    #[serde(default)]
    pub integration_id: Option<Uuid>,
    /// Restrict evaluation to a single target (job or workflow name)
    #[serde(default)]
    pub target: Option<String>,
}

fn default_recent_minutes() -> i64 {
    60
}

/// Email delivery channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailChannel {
    pub to: Vec<String>,
}

/// Chat webhook delivery channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookChannel {
    pub url: String,
}

/// Delivery channels of an alert definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertChannels {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailChannel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookChannel>,
}

impl AlertChannels {
    /// True when no channel is configured at all
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.webhook.is_none()
    }
}

/// A persisted alert definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertDefinition {
    pub id: Uuid,
    pub name: String,
    pub alert_type: AlertType,
    pub conditions: AlertConditions,
    pub channels: AlertChannels,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
