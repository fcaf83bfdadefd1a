//! CI provider clients
//!
//! Each client adapts one external CI system to the capability set the
//! alert engine evaluates against: target listing, latest-run lookup,
//! bounded recent-run listing, per-target summary statistics and log
//! retrieval. Clients are constructed per call from a resolved
//! `ProviderIntegration` and never mutate it.

pub mod github;
pub mod jenkins;

pub use github::GithubActionsClient;
pub use jenkins::JenkinsClient;

use async_trait::async_trait;

use crate::models::{
    ProviderIntegration, ProviderKind, RunOutcome, RunRecord, TargetSummary,
};
use crate::utils::{AppError, AppResult};

/// Capability set of a CI provider adapter
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Which provider kind this client speaks to
    fn kind(&self) -> ProviderKind;

    /// List all monitorable targets (jobs or workflows), flattened
    async fn list_targets(&self) -> AppResult<Vec<String>>;

    /// Latest run/build for one target, if any exists yet
    async fn latest_run(&self, target: &str) -> AppResult<Option<RunRecord>>;

    /// Recent runs, newest first, bounded by `limit`; optionally filtered
    /// to one target
    async fn recent_runs(&self, limit: u32, target: Option<&str>) -> AppResult<Vec<RunRecord>>;

    /// Summary statistics for one target over its recent completed runs
    async fn target_summary(&self, target: &str) -> AppResult<TargetSummary>;

    /// Plain-text log of one run
    async fn log_text(&self, target: &str, run_number: i64) -> AppResult<String>;
}

/// Build a client for an integration, dispatching on its declared kind
pub fn client_for(integration: &ProviderIntegration) -> AppResult<Box<dyn ProviderClient>> {
    match integration.kind {
        ProviderKind::Jenkins => Ok(Box::new(JenkinsClient::new(integration)?)),
        ProviderKind::GithubActions => Ok(Box::new(GithubActionsClient::new(integration)?)),
    }
}

/// Validate that an integration carries a usable endpoint
pub(crate) fn require_endpoint(integration: &ProviderIntegration) -> AppResult<&str> {
    let endpoint = integration.endpoint.trim();
    if endpoint.is_empty() {
        return Err(AppError::NotConfigured(format!(
            "integration '{}' has no endpoint",
            integration.name
        )));
    }
    Ok(endpoint)
}

/// Compute summary statistics over a run list
///
/// Samples up to the 10 most recent completed runs: success rate is the
/// rounded percentage of successes over the sample, average duration is
/// the rounded mean of the sampled durations. The last status reflects
/// the newest run whether or not it completed.
pub(crate) fn summarize_runs(target: &str, runs: &[RunRecord]) -> TargetSummary {
    const SAMPLE_CAP: usize = 10;

    let last_status = runs.first().map(|run| {
        if run.is_completed() {
            run.outcome.unwrap_or(RunOutcome::Unknown).as_str().to_string()
        } else {
            run.status.as_str().to_string()
        }
    });

    let completed: Vec<&RunRecord> = runs
        .iter()
        .filter(|r| r.is_completed())
        .take(SAMPLE_CAP)
        .collect();

    if completed.is_empty() {
        return TargetSummary {
            target: target.to_string(),
            last_status,
            success_rate: None,
            avg_duration_secs: None,
            sampled_runs: 0,
        };
    }

    let successes = completed
        .iter()
        .filter(|r| r.outcome == Some(RunOutcome::Success))
        .count();
    let success_rate = (100.0 * successes as f64 / completed.len() as f64).round() as i64;

    let durations: Vec<i64> = completed.iter().filter_map(|r| r.duration_secs).collect();
    let avg_duration_secs = if durations.is_empty() {
        None
    } else {
        Some((durations.iter().sum::<i64>() as f64 / durations.len() as f64).round() as i64)
    };

    TargetSummary {
        target: target.to_string(),
        last_status,
        success_rate: Some(success_rate),
        avg_duration_secs,
        sampled_runs: completed.len(),
    }
}
