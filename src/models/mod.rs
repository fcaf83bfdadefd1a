//! Data models
//!
//! This module defines the data structures shared across the dashboard:
//! alert definitions, provider integrations, normalized run data and
//! notification events.

pub mod alert;
pub mod notification;
pub mod provider;

pub use alert::{
    AlertChannels, AlertConditions, AlertDefinition, AlertEvent, AlertType, EmailChannel,
    WebhookChannel,
};
pub use notification::{
    AlertPassResult, ChannelOutcome, DispatchOutcome, NotificationCandidate, NotificationEvent,
    NotificationStatus, PassSummary, TestNotificationRequest, TestNotificationResponse,
};
pub use provider::{
    ProviderIntegration, ProviderKind, RunOutcome, RunRecord, RunStatus, TargetSummary,
};
