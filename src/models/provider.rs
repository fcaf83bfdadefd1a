//! CI provider models
//!
//! Normalized run and target data shared by all provider clients, plus the
//! integration record describing one configured connection to an external
//! CI system. Run records are fetched fresh every evaluation pass and never
//! persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported CI provider kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Jenkins,
    GithubActions,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Jenkins => "jenkins",
            ProviderKind::GithubActions => "github_actions",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "jenkins" => Some(ProviderKind::Jenkins),
            "github_actions" => Some(ProviderKind::GithubActions),
            _ => None,
        }
    }
}

/// A configured connection to one instance of an external CI system
///
/// Connection parameters arrive fully resolved (credentials decrypted by
/// the integration store). Clients treat the record as an immutable value
/// object constructed once per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderIntegration {
    pub id: Uuid,
    pub name: String,
    pub kind: ProviderKind,
    /// Base URL of the provider (Jenkins root or GitHub repo API base)
    pub endpoint: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    pub is_active: bool,
}

/// Whether a run has finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
        }
    }
}

/// Terminal outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    Failure,
    Cancelled,
    Unknown,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Success => "success",
            RunOutcome::Failure => "failure",
            RunOutcome::Cancelled => "cancelled",
            RunOutcome::Unknown => "unknown",
        }
    }
}

/// A single run/build of a target, normalized across providers
///
/// Ephemeral: fetched per pass, never cached across passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Target (job or workflow) this run belongs to
    pub target: String,
    /// Run/build number
    pub number: i64,
    pub status: RunStatus,
    /// Terminal outcome; only meaningful when status is completed
    pub outcome: Option<RunOutcome>,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Duration in seconds, derived from timestamps when the provider does
    /// not supply it directly
    pub duration_secs: Option<i64>,
    /// Link to the run in the external system
    pub url: Option<String>,
}

impl RunRecord {
    /// The timestamp used for time-window filtering: start time when
    /// known, otherwise the last update time.
    pub fn effective_timestamp(&self) -> Option<DateTime<Utc>> {
        self.started_at.or(self.updated_at)
    }

    /// True once the run has reached a terminal state
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Per-target summary statistics over recent completed runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSummary {
    pub target: String,
    /// Outcome of the most recent run, completed or not
    pub last_status: Option<String>,
    /// Percentage of successes over the sampled completed runs, rounded
    pub success_rate: Option<i64>,
    /// Mean duration in seconds over the sampled completed runs, rounded
    pub avg_duration_secs: Option<i64>,
    /// How many completed runs the statistics were computed from
    pub sampled_runs: usize,
}
